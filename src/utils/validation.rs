use crate::utils::error::{MigrateError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 驗證連線字串的 scheme。
///
/// MongoDB 的多主機 URI (`mongodb://a:1,b:2/`) 不是合法的 URL，
/// 所以只有非 MongoDB 的 URI 才交給 `url` 完整解析。
pub fn validate_connection_uri(field_name: &str, uri: &str, allowed_schemes: &[&str]) -> Result<()> {
    if uri.trim().is_empty() {
        return Err(MigrateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: String::new(),
            reason: "Connection URI cannot be empty".to_string(),
        });
    }

    let Some((scheme, rest)) = uri.split_once("://") else {
        return Err(MigrateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: redact(uri),
            reason: "Connection URI must look like scheme://host".to_string(),
        });
    };

    if !allowed_schemes.contains(&scheme) {
        return Err(MigrateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: redact(uri),
            reason: format!(
                "Unsupported scheme: {}. Allowed schemes: {}",
                scheme,
                allowed_schemes.join(", ")
            ),
        });
    }

    if rest.is_empty() {
        return Err(MigrateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: redact(uri),
            reason: "Connection URI has no host".to_string(),
        });
    }

    if !scheme.starts_with("mongodb") {
        if let Err(e) = Url::parse(uri) {
            return Err(MigrateError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: redact(uri),
                reason: format!("Invalid URI format: {}", e),
            });
        }
    }

    Ok(())
}

/// 錯誤訊息中不能帶出帳號密碼
pub fn redact(uri: &str) -> String {
    match (uri.split_once("://"), uri.rfind('@')) {
        (Some((scheme, _)), Some(at)) => format!("{}://***{}", scheme, &uri[at..]),
        _ => uri.to_string(),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(MigrateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MigrateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(MigrateError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
