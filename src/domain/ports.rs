use crate::domain::model::{CanonicalRecord, NaturalKey, RawRecord};
use crate::utils::error::{Result, TransformError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// 只能向前讀取的來源游標。`None` 表示來源已耗盡。
///
/// 單筆解碼失敗回傳 `Some(Err(_))`，呼叫端可以繼續讀下一筆。
#[async_trait]
pub trait RecordSource: Send {
    async fn next_record(&mut self) -> Option<Result<RawRecord>>;
}

#[async_trait]
pub trait Destination<R: CanonicalRecord>: Send + Sync + 'static {
    /// 目的地是否已有相同自然鍵的記錄
    async fn exists(&self, key: &NaturalKey) -> Result<bool>;

    async fn write(&self, record: &R) -> Result<()>;
}

/// 單一實體的遷移定義：舊格式、標準格式與兩者之間的轉換
pub trait Migration: Send + Sync + 'static {
    type Legacy: DeserializeOwned + Send;
    type Canonical: CanonicalRecord;

    fn name(&self) -> &'static str;

    fn transform(&self, legacy: Self::Legacy) -> std::result::Result<Self::Canonical, TransformError>;
}

pub trait ConfigProvider: Send + Sync {
    fn concurrency(&self) -> usize;
    fn run_timeout(&self) -> Option<Duration>;
    fn strict(&self) -> bool;
    fn max_consecutive_source_errors(&self) -> usize;
}
