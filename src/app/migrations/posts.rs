use crate::adapters::mysql::MySqlEntity;
use crate::core::transform::{id_text, lenient_string, lenient_vec, require, resolve_alias, timestamp_or_epoch};
use crate::domain::model::{CanonicalRecord, NaturalKey};
use crate::domain::ports::Migration;
use crate::utils::error::TransformError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnection;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyPost {
    #[serde(rename = "_id")]
    pub id: Option<Bson>,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(deserialize_with = "lenient_string")]
    pub author: String,
    #[serde(rename = "imageUrl", deserialize_with = "lenient_string")]
    pub image_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub image: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub hearts: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<Bson>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub image_url: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl CanonicalRecord for Post {
    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new("id", self.id.clone())
    }
}

#[async_trait]
impl MySqlEntity for Post {
    const TABLE: &'static str = "posts";
    const KEY_COLUMN: &'static str = "id";

    async fn insert(&self, conn: &mut MySqlConnection) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, title, content, author, image_url, image, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.title)
        .bind(&self.content)
        .bind(&self.author)
        .bind(&self.image_url)
        .bind(&self.image)
        .bind(self.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostMigration;

impl Migration for PostMigration {
    type Legacy = LegacyPost;
    type Canonical = Post;

    fn name(&self) -> &'static str {
        "posts"
    }

    fn transform(&self, legacy: LegacyPost) -> Result<Post, TransformError> {
        let raw_id = id_text(legacy.id.as_ref());
        let id = require("id", &[("_id", &raw_id)])?.to_string();

        Ok(Post {
            image_url: resolve_alias(&legacy.image_url, &legacy.image).to_string(),
            created_at: timestamp_or_epoch(legacy.created_at.as_ref()),
            id,
            title: legacy.title,
            content: legacy.content,
            author: legacy.author,
            image: legacy.image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc, oid::ObjectId};

    fn decode(document: bson::Document) -> LegacyPost {
        bson::from_document(document).unwrap()
    }

    #[test]
    fn test_post_with_object_id() {
        let oid = ObjectId::new();
        let created = bson::DateTime::from_millis(1_650_000_000_000);
        let post = PostMigration
            .transform(decode(doc! {
                "_id": oid,
                "title": "Hello",
                "content": "First post",
                "author": "u1",
                "imageUrl": "https://cdn.example.com/a.png",
                "hearts": ["u2", "u3"],
                "createdAt": created,
            }))
            .unwrap();

        assert_eq!(post.id, oid.to_hex());
        assert_eq!(post.image_url, "https://cdn.example.com/a.png");
        assert_eq!(post.image, "");
        assert_eq!(post.created_at.timestamp_millis(), 1_650_000_000_000);
    }

    #[test]
    fn test_image_url_falls_back_to_image() {
        let post = PostMigration
            .transform(decode(doc! { "_id": "p1", "image": "legacy.png" }))
            .unwrap();
        assert_eq!(post.image_url, "legacy.png");
        assert_eq!(post.image, "legacy.png");
        assert_eq!(post.created_at.timestamp(), 0);
    }

    #[test]
    fn test_post_without_id_fails() {
        let err = PostMigration
            .transform(decode(doc! { "title": "orphan" }))
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingField { field: "id", .. }));
    }
}
