use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Could not connect to {store}: {message}")]
    ConnectionError { store: String, message: String },

    #[error("MongoDB error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("Document decode error: {0}")]
    DecodeError(#[from] mongodb::bson::de::Error),

    #[error("Source read error: {message}")]
    SourceError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Write rejected for {key}: {message}")]
    WriteRejected { key: String, message: String },
}

/// 單筆記錄的驗證失敗，只影響該筆記錄
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("required field '{field}' is empty (checked: {})", .aliases.join(", "))]
    MissingField {
        field: &'static str,
        aliases: Vec<&'static str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Configuration,
    Data,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MigrateError {
    pub fn connection(store: impl Into<String>, message: impl ToString) -> Self {
        MigrateError::ConnectionError {
            store: store.into(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MigrateError::ConnectionError { .. } => ErrorCategory::Connection,
            MigrateError::ConfigError { .. }
            | MigrateError::MissingConfigError { .. }
            | MigrateError::InvalidConfigValueError { .. }
            | MigrateError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            MigrateError::DecodeError(_)
            | MigrateError::SourceError { .. }
            | MigrateError::SerializationError(_) => ErrorCategory::Data,
            MigrateError::MongoError(_)
            | MigrateError::SqlError(_)
            | MigrateError::WriteRejected { .. } => ErrorCategory::Storage,
            MigrateError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Connection | ErrorCategory::System => ErrorSeverity::Critical,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::Low,
        }
    }

    /// 可重試的錯誤：只有儲存層錯誤在重新執行後可能成功
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Storage
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Connection => {
                "Check MONGODB_URI / MYSQL_URI and that the database is reachable"
            }
            ErrorCategory::Configuration => {
                "Review the TOML config file and environment variables"
            }
            ErrorCategory::Data => "Inspect the offending document in the source collection",
            ErrorCategory::Storage => {
                "Re-run the migration; already migrated records are skipped"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MigrateError::ConnectionError { store, .. } => {
                format!("Unable to reach the {} store", store)
            }
            MigrateError::MissingConfigError { field } => {
                format!("Required setting '{}' is not set", field)
            }
            MigrateError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
