use crate::domain::model::{CanonicalRecord, NaturalKey};
use crate::domain::ports::Destination;
use crate::utils::error::{MigrateError, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnection, MySqlPool, MySqlPoolOptions};
use std::marker::PhantomData;
use std::time::Duration;

/// 可以寫入 MySQL 的標準記錄。
///
/// `insert` 在交易內執行，巢狀子資料列（例如部落格內容段落）與主資料列一起提交。
#[async_trait]
pub trait MySqlEntity: CanonicalRecord {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;

    async fn insert(&self, conn: &mut MySqlConnection) -> sqlx::Result<()>;
}

#[derive(Clone, Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// 建立連線池；資料表需事先建立（見 `schema/mysql.sql`）
    pub async fn connect(uri: &str, timeout: Duration, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(timeout)
            .connect(uri)
            .await
            .map_err(|e| MigrateError::connection("mysql", e))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| MigrateError::connection("mysql", e))?;

        tracing::info!("🔌 Connected to MySQL");
        Ok(Self { pool })
    }

    pub fn destination<R: MySqlEntity>(&self) -> MySqlDestination<R> {
        MySqlDestination {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct MySqlDestination<R> {
    pool: MySqlPool,
    _record: PhantomData<fn(R)>,
}

fn exists_query(table: &str, key_column: &str) -> String {
    format!("SELECT 1 FROM {} WHERE {} = ? LIMIT 1", table, key_column)
}

#[async_trait]
impl<R: MySqlEntity> Destination<R> for MySqlDestination<R> {
    async fn exists(&self, key: &NaturalKey) -> Result<bool> {
        let sql = exists_query(R::TABLE, R::KEY_COLUMN);
        let row = sqlx::query(&sql)
            .bind(&key.value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn write(&self, record: &R) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        record.insert(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exists_query_uses_placeholder() {
        assert_eq!(
            exists_query("users", "email"),
            "SELECT 1 FROM users WHERE email = ? LIMIT 1"
        );
    }
}
