//! 舊版機器人目錄 (`bots`) 轉成新版結構 (`transformedbots`)。

use crate::core::transform::{lenient_string, lenient_vec, require, OneOrMany, WholeNumber};
use crate::domain::model::{CanonicalRecord, NaturalKey};
use crate::domain::ports::Migration;
use crate::utils::error::TransformError;
use serde::{Deserialize, Serialize};

/// 舊集合的文件格式。`botID` 與 `BotID` 是同一欄位的兩個歷史名稱。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyBot {
    #[serde(rename = "ownerID", deserialize_with = "lenient_string")]
    pub owner_id: String,
    #[serde(rename = "ownerName", deserialize_with = "lenient_string")]
    pub owner_name: String,
    #[serde(rename = "botID", deserialize_with = "lenient_string")]
    pub bot_id: String,
    #[serde(rename = "BotID", deserialize_with = "lenient_string")]
    pub alt_bot_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub discrim: String,
    #[serde(deserialize_with = "lenient_string")]
    pub avatar: String,
    #[serde(deserialize_with = "lenient_string")]
    pub prefix: String,
    #[serde(deserialize_with = "lenient_string")]
    pub invite: String,
    #[serde(rename = "longDesc", deserialize_with = "lenient_string")]
    pub long_desc: String,
    #[serde(rename = "shortDesc", deserialize_with = "lenient_string")]
    pub short_desc: String,
    #[serde(deserialize_with = "lenient_vec")]
    pub tags: Vec<String>,
    pub uptimerate: OneOrMany<WholeNumber>,
    #[serde(deserialize_with = "lenient_vec")]
    pub coowners: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub premium: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(deserialize_with = "lenient_string")]
    pub website: String,
    #[serde(deserialize_with = "lenient_string")]
    pub github: String,
    #[serde(deserialize_with = "lenient_string")]
    pub support: String,
    #[serde(deserialize_with = "lenient_string")]
    pub certificate: String,
    pub votes: OneOrMany<WholeNumber>,
    #[serde(deserialize_with = "lenient_string")]
    pub token: String,
}

/// 新集合的文件格式，欄位全部存在
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bot {
    pub id: String,
    pub name: String,
    pub discriminator: String,
    pub website: String,
    pub github: String,
    pub avatar: String,
    pub tags: Vec<String>,
    pub votes: i64,
    pub reviews: Vec<String>,
    pub shortdesc: String,
    pub staff: String,
    pub prefix: String,
    pub longdesc: String,
    pub token: String,
    pub support: String,
    #[serde(rename = "owneravatar")]
    pub owner_avatar: String,
    #[serde(rename = "ownername")]
    pub owner_name: String,
    pub analytics: String,
    pub publicity: String,
    pub featured: bool,
    pub approved: bool,
    pub reviewing: bool,
}

impl CanonicalRecord for Bot {
    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new("id", self.id.clone())
    }
}

/// 舊資料沒有的欄位使用的固定值
pub const DEFAULT_PUBLICITY: &str = "public";

#[derive(Debug, Clone, Copy, Default)]
pub struct BotMigration;

impl Migration for BotMigration {
    type Legacy = LegacyBot;
    type Canonical = Bot;

    fn name(&self) -> &'static str {
        "bots"
    }

    fn transform(&self, legacy: LegacyBot) -> Result<Bot, TransformError> {
        let id = require("id", &[("botID", &legacy.bot_id), ("BotID", &legacy.alt_bot_id)])?.to_string();
        require("username", &[("username", &legacy.username)])?;
        require("discrim", &[("discrim", &legacy.discrim)])?;

        Ok(Bot {
            id,
            name: legacy.username,
            discriminator: legacy.discrim,
            website: legacy.website,
            github: legacy.github,
            avatar: legacy.avatar,
            tags: legacy.tags,
            votes: legacy.votes.resolve().into(),
            reviews: Vec::new(),
            shortdesc: legacy.short_desc,
            staff: String::new(),
            prefix: legacy.prefix,
            longdesc: legacy.long_desc,
            // 舊 token 不搬移，需由擁有者重新產生
            token: String::new(),
            support: legacy.support,
            owner_avatar: String::new(),
            owner_name: legacy.owner_name,
            analytics: String::new(),
            publicity: DEFAULT_PUBLICITY.to_string(),
            featured: false,
            approved: true,
            reviewing: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc, Document};

    fn decode(document: Document) -> LegacyBot {
        bson::from_document(document).unwrap()
    }

    fn base() -> Document {
        doc! {
            "botID": "1001",
            "username": "helper",
            "discrim": "0420",
            "ownerName": "alice",
            "tags": ["moderation", "fun"],
            "votes": 12,
            "token": "secret-token",
        }
    }

    #[test]
    fn test_transform_fills_defaults() {
        let bot = BotMigration.transform(decode(base())).unwrap();

        assert_eq!(bot.id, "1001");
        assert_eq!(bot.name, "helper");
        assert_eq!(bot.discriminator, "0420");
        assert_eq!(bot.owner_name, "alice");
        assert_eq!(bot.tags, vec!["moderation", "fun"]);
        assert_eq!(bot.votes, 12);
        assert!(bot.reviews.is_empty());
        assert_eq!(bot.token, "");
        assert_eq!(bot.publicity, "public");
        assert!(bot.approved);
        assert!(!bot.featured);
        assert!(!bot.reviewing);
    }

    #[test]
    fn test_alias_used_when_primary_empty() {
        let mut document = base();
        document.insert("botID", "");
        document.insert("BotID", "2002");

        let bot = BotMigration.transform(decode(document)).unwrap();
        assert_eq!(bot.id, "2002");
        assert_eq!(bot.natural_key(), NaturalKey::new("id", "2002"));
    }

    #[test]
    fn test_primary_wins_over_alias() {
        let mut document = base();
        document.insert("BotID", "2002");

        let bot = BotMigration.transform(decode(document)).unwrap();
        assert_eq!(bot.id, "1001");
    }

    #[test]
    fn test_id_is_trimmed() {
        let mut document = base();
        document.insert("botID", " 1001 ");
        let bot = BotMigration.transform(decode(document)).unwrap();
        assert_eq!(bot.natural_key(), NaturalKey::new("id", "1001"));
    }

    #[test]
    fn test_missing_all_id_aliases_fails() {
        let mut document = base();
        document.remove("botID");

        let err = BotMigration.transform(decode(document)).unwrap_err();
        assert_eq!(
            err,
            TransformError::MissingField {
                field: "id",
                aliases: vec!["botID", "BotID"],
            }
        );
    }

    #[test]
    fn test_missing_username_or_discrim_fails() {
        let mut document = base();
        document.insert("username", "   ");
        assert!(BotMigration.transform(decode(document)).is_err());

        let mut document = base();
        document.insert("discrim", bson::Bson::Null);
        assert!(BotMigration.transform(decode(document)).is_err());
    }

    #[test]
    fn test_votes_in_list_form() {
        let mut document = base();
        document.insert("votes", vec![7]);
        assert_eq!(BotMigration.transform(decode(document)).unwrap().votes, 7);

        let mut document = base();
        document.insert("votes", Vec::<i32>::new());
        assert_eq!(BotMigration.transform(decode(document)).unwrap().votes, 0);
    }

    #[test]
    fn test_wrong_typed_string_field_is_decode_error() {
        let mut document = base();
        document.insert("username", 42);
        assert!(bson::from_document::<LegacyBot>(document).is_err());
    }

    #[test]
    fn test_canonical_field_names() {
        let bot = BotMigration.transform(decode(base())).unwrap();
        let document = bson::to_document(&bot).unwrap();
        assert!(document.contains_key("owneravatar"));
        assert!(document.contains_key("ownername"));
        assert!(document.contains_key("shortdesc"));
        assert_eq!(document.get_str("publicity").unwrap(), "public");
    }
}
