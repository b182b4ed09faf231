use crate::adapters::mysql::MySqlEntity;
use crate::core::transform::{lenient_string, lenient_vec, require};
use crate::domain::model::{CanonicalRecord, NaturalKey};
use crate::domain::ports::Migration;
use crate::utils::error::TransformError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnection;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyBlogPost {
    #[serde(deserialize_with = "lenient_string")]
    pub slug: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(rename = "authorname", deserialize_with = "lenient_string")]
    pub author_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub overview: String,
    #[serde(rename = "authoravatar", deserialize_with = "lenient_string")]
    pub author_avatar: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub content: Vec<LegacyEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub body: String,
}

/// 一篇部落格文章；每個內容段落寫成 `blog_entries` 的一列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blog {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub author_name: String,
    pub overview: String,
    pub author_avatar: String,
    pub entries: Vec<String>,
}

impl CanonicalRecord for Blog {
    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new("slug", self.slug.clone())
    }
}

#[async_trait]
impl MySqlEntity for Blog {
    const TABLE: &'static str = "blogs";
    const KEY_COLUMN: &'static str = "slug";

    async fn insert(&self, conn: &mut MySqlConnection) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO blogs (slug, title, date, author_name, overview, author_avatar) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.slug)
        .bind(&self.title)
        .bind(&self.date)
        .bind(&self.author_name)
        .bind(&self.overview)
        .bind(&self.author_avatar)
        .execute(&mut *conn)
        .await?;

        for body in &self.entries {
            sqlx::query("INSERT INTO blog_entries (blog_slug, body) VALUES (?, ?)")
                .bind(&self.slug)
                .bind(body)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlogMigration;

impl Migration for BlogMigration {
    type Legacy = LegacyBlogPost;
    type Canonical = Blog;

    fn name(&self) -> &'static str {
        "blogs"
    }

    fn transform(&self, legacy: LegacyBlogPost) -> Result<Blog, TransformError> {
        let slug = require("slug", &[("slug", &legacy.slug)])?.to_string();

        Ok(Blog {
            slug,
            title: legacy.title,
            date: legacy.date,
            author_name: legacy.author_name,
            overview: legacy.overview,
            author_avatar: legacy.author_avatar,
            entries: legacy.content.into_iter().map(|entry| entry.body).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    #[test]
    fn test_blog_keeps_entry_order() {
        let legacy: LegacyBlogPost = bson::from_document(doc! {
            "slug": "launch",
            "title": "We launched",
            "authorname": "Team",
            "content": [ { "body": "first" }, { "body": "second" } ],
        })
        .unwrap();

        let blog = BlogMigration.transform(legacy).unwrap();
        assert_eq!(blog.natural_key(), NaturalKey::new("slug", "launch"));
        assert_eq!(blog.author_name, "Team");
        assert_eq!(blog.entries, vec!["first", "second"]);
    }

    #[test]
    fn test_blog_with_null_content_has_no_entries() {
        let legacy: LegacyBlogPost = bson::from_document(doc! {
            "slug": "empty",
            "content": bson::Bson::Null,
        })
        .unwrap();
        assert!(BlogMigration.transform(legacy).unwrap().entries.is_empty());
    }

    #[test]
    fn test_slug_is_trimmed() {
        let legacy: LegacyBlogPost = bson::from_document(doc! { "slug": " launch " }).unwrap();
        let blog = BlogMigration.transform(legacy).unwrap();
        assert_eq!(blog.natural_key(), NaturalKey::new("slug", "launch"));
    }

    #[test]
    fn test_blog_without_slug_fails() {
        let legacy: LegacyBlogPost = bson::from_document(doc! { "title": "draft" }).unwrap();
        let err = BlogMigration.transform(legacy).unwrap_err();
        assert!(matches!(err, TransformError::MissingField { field: "slug", .. }));
    }
}
