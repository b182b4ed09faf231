//! 舊資料格式的共用轉換工具。
//!
//! 來源集合的 schema 經過多次演變：同一欄位有兩個歷史名稱、欄位可能缺失、
//! 欄位型別也可能不同（例如 `votes` 可能是數字，也可能是包含數字的陣列）。
//! 這裡的工具讓各個遷移的 `transform` 保持為單純的函式。

use crate::domain::model::bson_to_text;
use crate::utils::error::TransformError;
use chrono::{DateTime, Utc};
use mongodb::bson::Bson;
use serde::de::{self, IgnoredAny, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// 優先使用主要名稱，主要名稱為空時才退回別名
pub fn resolve_alias<'a>(primary: &'a str, alias: &'a str) -> &'a str {
    if is_blank(primary) {
        alias
    } else {
        primary
    }
}

/// 依序檢查候選欄位，回傳第一個非空值（去除前後空白）；全部為空則失敗
pub fn require<'a>(
    field: &'static str,
    candidates: &[(&'static str, &'a str)],
) -> Result<&'a str, TransformError> {
    candidates
        .iter()
        .map(|(_, value)| *value)
        .find(|value| !is_blank(value))
        .map(str::trim)
        .ok_or_else(|| TransformError::MissingField {
            field,
            aliases: candidates.iter().map(|(name, _)| *name).collect(),
        })
}

/// 純量或陣列的欄位，在反序列化邊界就決定是哪一種
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<Element<T>>),
    Other(IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Element<T> {
    Typed(T),
    Other(IgnoredAny),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T: Clone + Default> OneOrMany<T> {
    /// 純量直接使用；陣列取第一個型別相符的首元素；其他情況為零值
    pub fn resolve(&self) -> T {
        match self {
            OneOrMany::One(value) => value.clone(),
            OneOrMany::Many(items) => match items.first() {
                Some(Element::Typed(value)) => value.clone(),
                _ => T::default(),
            },
            OneOrMany::Other(_) => T::default(),
        }
    }
}

/// 整數欄位；JavaScript 寫入的文件常把整數存成沒有小數部分的 Double
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WholeNumber(pub i64);

impl From<WholeNumber> for i64 {
    fn from(value: WholeNumber) -> Self {
        value.0
    }
}

impl<'de> Deserialize<'de> for WholeNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct WholeNumberVisitor;

        impl Visitor<'_> for WholeNumberVisitor {
            type Value = WholeNumber;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer or a float with no fractional part")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<WholeNumber, E> {
                Ok(WholeNumber(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<WholeNumber, E> {
                i64::try_from(value)
                    .map(WholeNumber)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<WholeNumber, E> {
                // i64::MAX as f64 是 2^63，本身已超出範圍
                if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
                    Ok(WholeNumber(value as i64))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(value), &self))
                }
            }
        }

        deserializer.deserialize_any(WholeNumberVisitor)
    }
}

/// `null` 與缺失都視為空字串；其他型別仍然是解碼錯誤
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `_id` 可能是 ObjectId 或字串
pub fn id_text(value: Option<&Bson>) -> String {
    value.and_then(bson_to_text).unwrap_or_default()
}

/// BSON 日期或 RFC 3339 字串；無法辨識時使用 Unix epoch
pub fn timestamp_or_epoch(value: Option<&Bson>) -> DateTime<Utc> {
    let parsed = match value {
        Some(Bson::DateTime(dt)) => DateTime::from_timestamp_millis(dt.timestamp_millis()),
        Some(Bson::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    };
    parsed.unwrap_or_default()
}
