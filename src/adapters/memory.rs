//! 記憶體內的來源與目的地。`--dry-run` 用它代替真正的目的地，測試也用它。

use crate::domain::model::{CanonicalRecord, NaturalKey, RawRecord};
use crate::domain::ports::{Destination, RecordSource};
use crate::utils::error::{MigrateError, Result};
use async_trait::async_trait;
use mongodb::bson::Document;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemorySource {
    items: VecDeque<std::result::Result<Document, String>>,
    position: usize,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self::from_results(documents.into_iter().map(Ok).collect())
    }

    /// `Err` 項目模擬來源層的單筆讀取錯誤
    pub fn from_results(items: Vec<std::result::Result<Document, String>>) -> Self {
        Self {
            items: items.into(),
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn next_record(&mut self) -> Option<Result<RawRecord>> {
        let item = self.items.pop_front()?;
        self.position += 1;
        Some(match item {
            Ok(document) => Ok(RawRecord::new(self.position, document)),
            Err(message) => Err(MigrateError::SourceError { message }),
        })
    }
}

/// 以自然鍵為唯一約束的記憶體目的地
#[derive(Debug)]
pub struct MemoryDestination<R> {
    state: Mutex<MemoryState<R>>,
}

#[derive(Debug)]
struct MemoryState<R> {
    keys: HashSet<NaturalKey>,
    records: Vec<R>,
}

impl<R> Default for MemoryDestination<R> {
    fn default() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                keys: HashSet::new(),
                records: Vec::new(),
            }),
        }
    }
}

impl<R: CanonicalRecord + Clone> MemoryDestination<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn records(&self) -> Vec<R> {
        self.state.lock().await.records.clone()
    }

    pub async fn get(&self, key: &NaturalKey) -> Option<R> {
        let state = self.state.lock().await;
        state
            .records
            .iter()
            .find(|record| &record.natural_key() == key)
            .cloned()
    }
}

#[async_trait]
impl<R: CanonicalRecord + Clone> Destination<R> for MemoryDestination<R> {
    async fn exists(&self, key: &NaturalKey) -> Result<bool> {
        Ok(self.state.lock().await.keys.contains(key))
    }

    async fn write(&self, record: &R) -> Result<()> {
        let key = record.natural_key();
        let mut state = self.state.lock().await;
        if !state.keys.insert(key.clone()) {
            return Err(MigrateError::WriteRejected {
                key: key.to_string(),
                message: "duplicate natural key".to_string(),
            });
        }
        state.records.push(record.clone());
        Ok(())
    }
}
