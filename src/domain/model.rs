use mongodb::bson::{Bson, Document};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// 來源集合中的一筆原始文件
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub identity: String,
    pub document: Document,
}

impl RawRecord {
    /// `_id` 缺失或無法轉成文字時，以串流中的位置作為識別
    pub fn new(position: usize, document: Document) -> Self {
        let identity = document
            .get("_id")
            .and_then(bson_to_text)
            .unwrap_or_else(|| format!("#{}", position));
        Self { identity, document }
    }
}

/// ObjectId、字串與整數都可以當作識別或自然鍵
pub fn bson_to_text(value: &Bson) -> Option<String> {
    match value {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub field: &'static str,
    pub value: String,
}

impl NaturalKey {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// 轉換完成、交給 Destination Writer 的固定格式記錄
pub trait CanonicalRecord: Send + Sync + 'static {
    fn natural_key(&self) -> NaturalKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Migrated,
    SkippedExisting,
    DecodeError,
    TransformError,
    WriteError,
}

impl OutcomeKind {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            OutcomeKind::DecodeError | OutcomeKind::TransformError | OutcomeKind::WriteError
        )
    }
}

/// 每筆 RawRecord 恰好產生一個 Outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub identity: String,
    pub key: Option<String>,
    pub detail: Option<String>,
}

impl Outcome {
    pub fn migrated(identity: String, key: &NaturalKey) -> Self {
        Self {
            kind: OutcomeKind::Migrated,
            identity,
            key: Some(key.to_string()),
            detail: None,
        }
    }

    pub fn skipped(identity: String, key: &NaturalKey) -> Self {
        Self {
            kind: OutcomeKind::SkippedExisting,
            identity,
            key: Some(key.to_string()),
            detail: None,
        }
    }

    pub fn decode_error(identity: String, detail: impl ToString) -> Self {
        Self {
            kind: OutcomeKind::DecodeError,
            identity,
            key: None,
            detail: Some(detail.to_string()),
        }
    }

    pub fn transform_error(identity: String, detail: impl ToString) -> Self {
        Self {
            kind: OutcomeKind::TransformError,
            identity,
            key: None,
            detail: Some(detail.to_string()),
        }
    }

    pub fn write_error(identity: String, key: Option<&NaturalKey>, detail: impl ToString) -> Self {
        Self {
            kind: OutcomeKind::WriteError,
            identity,
            key: key.map(|k| k.to_string()),
            detail: Some(detail.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Draining,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "Idle",
            RunState::Running => "Running",
            RunState::Draining => "Draining",
            RunState::Done => "Done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub migration: String,
    pub migrated: usize,
    pub skipped_existing: usize,
    pub decode_errors: usize,
    pub transform_errors: usize,
    pub write_errors: usize,
    pub processed: usize,
    #[serde(rename = "elapsed_seconds", serialize_with = "duration_as_secs")]
    pub elapsed: Duration,
    pub deadline_hit: bool,
    pub source_aborted: bool,
}

fn duration_as_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

impl RunSummary {
    pub fn new(migration: impl Into<String>) -> Self {
        Self {
            migration: migration.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Migrated => self.migrated += 1,
            OutcomeKind::SkippedExisting => self.skipped_existing += 1,
            OutcomeKind::DecodeError => self.decode_errors += 1,
            OutcomeKind::TransformError => self.transform_errors += 1,
            OutcomeKind::WriteError => self.write_errors += 1,
        }
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Migrated => self.migrated,
            OutcomeKind::SkippedExisting => self.skipped_existing,
            OutcomeKind::DecodeError => self.decode_errors,
            OutcomeKind::TransformError => self.transform_errors,
            OutcomeKind::WriteError => self.write_errors,
        }
    }

    /// 所有 Outcome 的總數，必須等於來源吐出的記錄數
    pub fn total_outcomes(&self) -> usize {
        self.migrated
            + self.skipped_existing
            + self.decode_errors
            + self.transform_errors
            + self.write_errors
    }

    pub fn failures(&self) -> usize {
        self.decode_errors + self.transform_errors + self.write_errors
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    /// 預設允許部分成功；strict 模式下任何單筆失敗都讓行程以非零結束
    pub fn exit_code(&self, strict: bool) -> i32 {
        if strict && self.has_failures() {
            1
        } else {
            0
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Conversion done. Processed {} documents in {:.3} seconds.",
            self.processed,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn test_raw_record_identity_prefers_object_id() {
        let oid = ObjectId::new();
        let record = RawRecord::new(3, doc! { "_id": oid, "username": "bot" });
        assert_eq!(record.identity, oid.to_hex());

        let record = RawRecord::new(3, doc! { "_id": "abc" });
        assert_eq!(record.identity, "abc");

        let record = RawRecord::new(3, doc! { "username": "bot" });
        assert_eq!(record.identity, "#3");
    }

    #[test]
    fn test_summary_counts_and_exit_code() {
        let mut summary = RunSummary::new("bots");
        summary.record(OutcomeKind::Migrated);
        summary.record(OutcomeKind::SkippedExisting);
        assert_eq!(summary.total_outcomes(), 2);
        assert!(!summary.has_failures());
        assert_eq!(summary.exit_code(true), 0);

        summary.record(OutcomeKind::WriteError);
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.exit_code(false), 0);
        assert_eq!(summary.exit_code(true), 1);
    }

    #[test]
    fn test_summary_line_format() {
        let summary = RunSummary {
            processed: 12,
            elapsed: Duration::from_millis(1500),
            ..RunSummary::new("bots")
        };
        assert_eq!(
            summary.summary_line(),
            "Conversion done. Processed 12 documents in 1.500 seconds."
        );
    }

    #[test]
    fn test_summary_serializes_elapsed_as_seconds() {
        let summary = RunSummary {
            elapsed: Duration::from_secs(2),
            ..RunSummary::new("posts")
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed_seconds"], 2.0);
        assert_eq!(json["migration"], "posts");
    }
}
