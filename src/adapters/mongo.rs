use crate::domain::model::{CanonicalRecord, NaturalKey, RawRecord};
use crate::domain::ports::{Destination, RecordSource};
use crate::utils::error::{MigrateError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Cursor};
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;

/// 已驗證可連線的 MongoDB client，由呼叫端注入協調器
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// 連線並 ping；失敗時回傳 `ConnectionError`
    pub async fn connect(label: &str, uri: &str, timeout: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| MigrateError::connection(label, e))?;
        options.app_name = Some("doc-migrate".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(|e| MigrateError::connection(label, e))?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MigrateError::connection(label, e))?;

        tracing::info!("🔌 Connected to MongoDB ({})", label);
        Ok(Self { client })
    }

    /// 對整個集合開啟游標
    pub async fn open_source(&self, database: &str, collection: &str) -> Result<MongoSource> {
        let cursor = self
            .client
            .database(database)
            .collection::<Document>(collection)
            .find(doc! {})
            .await?;
        tracing::debug!("Opened cursor on {}.{}", database, collection);
        Ok(MongoSource {
            cursor,
            position: 0,
        })
    }

    pub fn destination<R>(&self, database: &str, collection: &str) -> MongoDestination<R>
    where
        R: CanonicalRecord + Serialize,
    {
        MongoDestination {
            collection: self.client.database(database).collection::<Document>(collection),
            _record: PhantomData,
        }
    }
}

/// 持有唯一的來源游標；drop 時游標即被關閉
pub struct MongoSource {
    cursor: Cursor<Document>,
    position: usize,
}

#[async_trait]
impl RecordSource for MongoSource {
    async fn next_record(&mut self) -> Option<Result<RawRecord>> {
        let item = self.cursor.next().await?;
        self.position += 1;
        Some(
            item.map(|document| RawRecord::new(self.position, document))
                .map_err(|e| MigrateError::SourceError {
                    message: e.to_string(),
                }),
        )
    }
}

pub struct MongoDestination<R> {
    collection: Collection<Document>,
    _record: PhantomData<fn(R)>,
}

#[async_trait]
impl<R> Destination<R> for MongoDestination<R>
where
    R: CanonicalRecord + Serialize,
{
    async fn exists(&self, key: &NaturalKey) -> Result<bool> {
        let mut filter = Document::new();
        filter.insert(key.field, key.value.as_str());
        let found = self
            .collection
            .find_one(filter)
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(found.is_some())
    }

    async fn write(&self, record: &R) -> Result<()> {
        let document = mongodb::bson::to_document(record).map_err(|e| MigrateError::WriteRejected {
            key: record.natural_key().to_string(),
            message: format!("could not encode record: {}", e),
        })?;
        self.collection.insert_one(document).await?;
        Ok(())
    }
}
