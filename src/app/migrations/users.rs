use crate::adapters::mysql::MySqlEntity;
use crate::core::transform::{
    id_text, lenient_bool, lenient_string, lenient_vec, require, resolve_alias, timestamp_or_epoch, OneOrMany,
    WholeNumber,
};
use crate::domain::model::{CanonicalRecord, NaturalKey};
use crate::domain::ports::Migration;
use crate::utils::error::TransformError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnection;

/// 顯示名稱與旗標欄位曾以全小寫與 camelCase 兩種名稱寫入，
/// 同一份文件可能兩者並存，所以分開解碼再合併；旗標任一拼法為 true 即為 true
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyUser {
    #[serde(rename = "_id")]
    pub id: Option<Bson>,
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(rename = "displayname", deserialize_with = "lenient_string")]
    pub display_name: String,
    #[serde(rename = "displayName", deserialize_with = "lenient_string")]
    pub alt_display_name: String,
    pub userid: OneOrMany<WholeNumber>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(rename = "createdAt")]
    pub created_at: Option<Bson>,
    #[serde(rename = "profilePicture", deserialize_with = "lenient_string")]
    pub profile_picture: String,
    #[serde(rename = "profileBanner", deserialize_with = "lenient_string")]
    pub profile_banner: String,
    #[serde(deserialize_with = "lenient_string")]
    pub bio: String,
    #[serde(rename = "isVerified", deserialize_with = "lenient_bool")]
    pub is_verified: bool,
    #[serde(rename = "isverified", deserialize_with = "lenient_bool")]
    pub is_verified_lower: bool,
    #[serde(rename = "isOrganisation", deserialize_with = "lenient_bool")]
    pub is_organisation: bool,
    #[serde(rename = "isorganisation", deserialize_with = "lenient_bool")]
    pub is_organisation_lower: bool,
    #[serde(rename = "isDeveloper", deserialize_with = "lenient_bool")]
    pub is_developer: bool,
    #[serde(rename = "isdeveloper", deserialize_with = "lenient_bool")]
    pub is_developer_lower: bool,
    #[serde(rename = "isPartner", deserialize_with = "lenient_bool")]
    pub is_partner: bool,
    #[serde(rename = "ispartner", deserialize_with = "lenient_bool")]
    pub is_partner_lower: bool,
    #[serde(rename = "isOwner", deserialize_with = "lenient_bool")]
    pub is_owner: bool,
    #[serde(rename = "isowner", deserialize_with = "lenient_bool")]
    pub is_owner_lower: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub links: Vec<String>,
}

/// 密碼欄位是舊系統的雜湊值，不輸出到序列化結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub user_id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub profile_picture: String,
    pub profile_banner: String,
    pub bio: String,
    pub is_verified: bool,
    pub is_organisation: bool,
    pub is_developer: bool,
    pub is_partner: bool,
    pub is_owner: bool,
    #[serde(skip)]
    pub password: String,
}

impl CanonicalRecord for User {
    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new("email", self.email.clone())
    }
}

#[async_trait]
impl MySqlEntity for User {
    const TABLE: &'static str = "users";
    const KEY_COLUMN: &'static str = "email";

    async fn insert(&self, conn: &mut MySqlConnection) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, display_name, user_id, email, created_at, \
             profile_picture, profile_banner, bio, is_verified, is_organisation, is_developer, \
             is_partner, is_owner, password) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.username)
        .bind(&self.display_name)
        .bind(self.user_id)
        .bind(&self.email)
        .bind(self.created_at)
        .bind(&self.profile_picture)
        .bind(&self.profile_banner)
        .bind(&self.bio)
        .bind(self.is_verified)
        .bind(self.is_organisation)
        .bind(self.is_developer)
        .bind(self.is_partner)
        .bind(self.is_owner)
        .bind(&self.password)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserMigration;

impl Migration for UserMigration {
    type Legacy = LegacyUser;
    type Canonical = User;

    fn name(&self) -> &'static str {
        "users"
    }

    fn transform(&self, legacy: LegacyUser) -> Result<User, TransformError> {
        let raw_id = id_text(legacy.id.as_ref());
        let id = require("id", &[("_id", &raw_id)])?.to_string();
        let email = require("email", &[("email", &legacy.email)])?.to_string();

        Ok(User {
            id,
            display_name: resolve_alias(&legacy.display_name, &legacy.alt_display_name).to_string(),
            username: legacy.username,
            user_id: legacy.userid.resolve().into(),
            email,
            created_at: timestamp_or_epoch(legacy.created_at.as_ref()),
            profile_picture: legacy.profile_picture,
            profile_banner: legacy.profile_banner,
            bio: legacy.bio,
            is_verified: legacy.is_verified || legacy.is_verified_lower,
            is_organisation: legacy.is_organisation || legacy.is_organisation_lower,
            is_developer: legacy.is_developer || legacy.is_developer_lower,
            is_partner: legacy.is_partner || legacy.is_partner_lower,
            is_owner: legacy.is_owner || legacy.is_owner_lower,
            password: legacy.password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};

    fn decode(document: bson::Document) -> LegacyUser {
        bson::from_document(document).unwrap()
    }

    #[test]
    fn test_user_keyed_by_email() {
        let user = UserMigration
            .transform(decode(doc! {
                "_id": "u1",
                "username": "alice",
                "displayname": "Alice",
                "userid": 17,
                "email": " alice@example.com ",
                "isVerified": true,
                "password": "$2a$10$hash",
            }))
            .unwrap();

        assert_eq!(user.natural_key(), NaturalKey::new("email", "alice@example.com"));
        assert_eq!(user.user_id, 17);
        assert_eq!(user.display_name, "Alice");
        assert!(user.is_verified);
        assert!(!user.is_owner);
    }

    #[test]
    fn test_lowercase_flag_names_are_accepted() {
        let user = UserMigration
            .transform(decode(doc! {
                "_id": "u2",
                "email": "bob@example.com",
                "isowner": true,
                "displayName": "Bob",
                "userid": [99],
            }))
            .unwrap();
        assert!(user.is_owner);
        assert_eq!(user.display_name, "Bob");
        assert_eq!(user.user_id, 99);
    }

    #[test]
    fn test_whole_double_user_id() {
        let user = UserMigration
            .transform(decode(doc! { "_id": "u5", "email": "d@example.com", "userid": 17.0 }))
            .unwrap();
        assert_eq!(user.user_id, 17);

        let user = UserMigration
            .transform(decode(doc! { "_id": "u6", "email": "e@example.com", "userid": [17.0] }))
            .unwrap();
        assert_eq!(user.user_id, 17);
    }

    #[test]
    fn test_both_spellings_in_one_document() {
        let legacy: LegacyUser = bson::from_document(doc! {
            "_id": "u7",
            "email": "f@example.com",
            "isVerified": true,
            "isverified": true,
            "isOwner": false,
            "isowner": true,
            "displayname": "Frank",
            "displayName": "frank_old",
        })
        .unwrap();

        let user = UserMigration.transform(legacy).unwrap();
        assert!(user.is_verified);
        assert!(user.is_owner);
        assert!(!user.is_partner);
        assert_eq!(user.display_name, "Frank");
    }

    #[test]
    fn test_id_and_email_are_trimmed() {
        let user = UserMigration
            .transform(decode(doc! { "_id": " u8 ", "email": "g@example.com\n" }))
            .unwrap();
        assert_eq!(user.id, "u8");
        assert_eq!(user.natural_key(), NaturalKey::new("email", "g@example.com"));
    }

    #[test]
    fn test_user_without_email_fails() {
        let err = UserMigration
            .transform(decode(doc! { "_id": "u3", "username": "ghost" }))
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingField { field: "email", .. }));
    }

    #[test]
    fn test_password_not_serialized() {
        let user = UserMigration
            .transform(decode(doc! { "_id": "u4", "email": "c@example.com", "password": "x" }))
            .unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(user.password, "x");
    }
}
