use crate::adapters::mysql::MySqlEntity;
use crate::core::transform::{lenient_string, require};
use crate::domain::model::{CanonicalRecord, NaturalKey};
use crate::domain::ports::Migration;
use crate::utils::error::TransformError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnection;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LegacyPartner {
    #[serde(deserialize_with = "lenient_string")]
    pub banner: String,
    #[serde(deserialize_with = "lenient_string")]
    pub logo: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub link: String,
}

/// partners 資料表沒有 id 欄位，以 title 作為自然鍵
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partner {
    pub banner: String,
    pub logo: String,
    pub title: String,
    pub text: String,
    pub link: String,
}

impl CanonicalRecord for Partner {
    fn natural_key(&self) -> NaturalKey {
        NaturalKey::new("title", self.title.clone())
    }
}

#[async_trait]
impl MySqlEntity for Partner {
    const TABLE: &'static str = "partners";
    const KEY_COLUMN: &'static str = "title";

    async fn insert(&self, conn: &mut MySqlConnection) -> sqlx::Result<()> {
        sqlx::query("INSERT INTO partners (banner, logo, title, text, link) VALUES (?, ?, ?, ?, ?)")
            .bind(&self.banner)
            .bind(&self.logo)
            .bind(&self.title)
            .bind(&self.text)
            .bind(&self.link)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PartnerMigration;

impl Migration for PartnerMigration {
    type Legacy = LegacyPartner;
    type Canonical = Partner;

    fn name(&self) -> &'static str {
        "partners"
    }

    fn transform(&self, legacy: LegacyPartner) -> Result<Partner, TransformError> {
        let title = require("title", &[("title", &legacy.title)])?.to_string();

        Ok(Partner {
            banner: legacy.banner,
            logo: legacy.logo,
            title,
            text: legacy.text,
            link: legacy.link,
        })
    }
}
