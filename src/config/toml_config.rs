use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MigrateError, Result};
use crate::utils::validation::{
    validate_connection_uri, validate_non_empty_string, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "migrate.toml";

const MONGO_SCHEMES: &[&str] = &["mongodb", "mongodb+srv"];
const MYSQL_SCHEMES: &[&str] = &["mysql"];

/// 遷移工具的完整配置；每個區段都可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub run: RunConfig,
    pub bots: BotsConfig,
    pub social: SocialConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub uri: String,
    pub connect_timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            connect_timeout_seconds: 10,
        }
    }
}

/// 空字串代表未設定；目的端連線只在需要時才驗證
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    pub mongodb_uri: String,
    pub mysql_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub concurrency: usize,
    pub timeout_seconds: Option<u64>,
    pub strict: bool,
    pub max_consecutive_source_errors: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            timeout_seconds: None,
            strict: false,
            max_consecutive_source_errors: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotsConfig {
    pub database: String,
    pub source_collection: String,
    pub target_collection: String,
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            database: "myFirstDatabase".to_string(),
            source_collection: "bots".to_string(),
            target_collection: "transformedbots".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub database: String,
    pub posts_collection: String,
    pub users_collection: String,
    pub partners_collection: String,
    pub blogs_collection: String,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            database: "SocialFlux".to_string(),
            posts_collection: "posts".to_string(),
            users_collection: "users".to_string(),
            partners_collection: "partners".to_string(),
            blogs_collection: "blogs".to_string(),
        }
    }
}

impl MigrationConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MigrateError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MigrateError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 指定的檔案必須存在；未指定時才嘗試預設檔名，兩者皆無則使用預設值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${MONGODB_URI})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MigrateError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 檔案中沒有設定的連線字串由環境變數補上
    pub fn apply_env(&mut self) {
        fill_from_env(&mut self.source.uri, "MONGODB_URI");
        fill_from_env(&mut self.destination.mongodb_uri, "DEST_MONGODB_URI");
        fill_from_env(&mut self.destination.mysql_uri, "MYSQL_URI");
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.source.connect_timeout_seconds)
    }

    /// 文件目的端預設與來源同一個叢集
    pub fn destination_mongodb_uri(&self) -> &str {
        if self.destination.mongodb_uri.trim().is_empty() {
            &self.source.uri
        } else {
            &self.destination.mongodb_uri
        }
    }

    /// MySQL 只有 social 系列遷移需要
    pub fn require_mysql_uri(&self) -> Result<&str> {
        if self.destination.mysql_uri.trim().is_empty() {
            return Err(MigrateError::MissingConfigError {
                field: "destination.mysql_uri (or MYSQL_URI)".to_string(),
            });
        }
        Ok(&self.destination.mysql_uri)
    }
}

fn fill_from_env(target: &mut String, var: &str) {
    if target.trim().is_empty() {
        if let Ok(value) = std::env::var(var) {
            *target = value;
        }
    }
}

impl ConfigProvider for MigrationConfig {
    fn concurrency(&self) -> usize {
        self.run.concurrency
    }

    fn run_timeout(&self) -> Option<Duration> {
        self.run.timeout_seconds.map(Duration::from_secs)
    }

    fn strict(&self) -> bool {
        self.run.strict
    }

    fn max_consecutive_source_errors(&self) -> usize {
        self.run.max_consecutive_source_errors
    }
}

impl Validate for MigrationConfig {
    fn validate(&self) -> Result<()> {
        if self.source.uri.trim().is_empty() {
            return Err(MigrateError::MissingConfigError {
                field: "source.uri (or MONGODB_URI)".to_string(),
            });
        }
        validate_connection_uri("source.uri", &self.source.uri, MONGO_SCHEMES)?;

        if !self.destination.mongodb_uri.trim().is_empty() {
            validate_connection_uri("destination.mongodb_uri", &self.destination.mongodb_uri, MONGO_SCHEMES)?;
        }
        if !self.destination.mysql_uri.trim().is_empty() {
            validate_connection_uri("destination.mysql_uri", &self.destination.mysql_uri, MYSQL_SCHEMES)?;
        }

        validate_range("source.connect_timeout_seconds", self.source.connect_timeout_seconds, 1, 300)?;
        validate_positive_number("run.concurrency", self.run.concurrency, 1)?;
        validate_positive_number(
            "run.max_consecutive_source_errors",
            self.run.max_consecutive_source_errors,
            1,
        )?;
        if let Some(timeout) = self.run.timeout_seconds {
            validate_range("run.timeout_seconds", timeout, 1, 7 * 24 * 3600)?;
        }

        validate_non_empty_string("bots.database", &self.bots.database)?;
        validate_non_empty_string("bots.source_collection", &self.bots.source_collection)?;
        validate_non_empty_string("bots.target_collection", &self.bots.target_collection)?;
        validate_non_empty_string("social.database", &self.social.database)?;

        Ok(())
    }
}
