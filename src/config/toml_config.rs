use crate::adapters::pacer::{FixedDelayPacer, NoPacer, TokenBucketPacer};
use crate::core::bootstrap::{ApiHosts, DEFAULT_GLOBAL_HOST, DEFAULT_TOKEN_URL};
use crate::domain::ports::Pacer;
use crate::utils::error::{CentralError, Result};
use crate::utils::validation::{
    validate_column_letters, validate_non_empty_string, validate_path, validate_range,
    validate_url, Validate,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
    pub pacing: PacingConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub token_url: String,
    pub global_host: String,
    pub tenant_name: String,
    pub page_size: u32,
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            global_host: DEFAULT_GLOBAL_HOST.to_string(),
            tenant_name: "My Company".to_string(),
            page_size: 500,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub path: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: "credentials.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStrategy {
    None,
    Fixed,
    TokenBucket,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub strategy: PacingStrategy,
    pub delay_ms: u64,
    pub requests_per_second: u32,
    pub burst: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            strategy: PacingStrategy::Fixed,
            delay_ms: 200,
            requests_per_second: 5,
            burst: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub roster_path: String,
    pub group_column: String,
    pub name_column: String,
    pub groups: Vec<String>,
    pub enable: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            roster_path: "roster.csv".to_string(),
            group_column: "D".to_string(),
            name_column: "B".to_string(),
            groups: Vec::new(),
            enable: false,
        }
    }
}

/// 依設定建立的 Pacer
pub enum ConfiguredPacer {
    None(NoPacer),
    Fixed(FixedDelayPacer),
    TokenBucket(TokenBucketPacer),
}

#[async_trait]
impl Pacer for ConfiguredPacer {
    async fn pace(&self) {
        match self {
            ConfiguredPacer::None(pacer) => pacer.pace().await,
            ConfiguredPacer::Fixed(pacer) => pacer.pace().await,
            ConfiguredPacer::TokenBucket(pacer) => pacer.pace().await,
        }
    }

    fn observe(&self, retry_after: Option<Duration>) {
        match self {
            ConfiguredPacer::None(pacer) => pacer.observe(retry_after),
            ConfiguredPacer::Fixed(pacer) => pacer.observe(retry_after),
            ConfiguredPacer::TokenBucket(pacer) => pacer.observe(retry_after),
        }
    }
}

impl PacingConfig {
    pub fn build(&self) -> Result<ConfiguredPacer> {
        Ok(match self.strategy {
            PacingStrategy::None => ConfiguredPacer::None(NoPacer),
            PacingStrategy::Fixed => {
                ConfiguredPacer::Fixed(FixedDelayPacer::new(Duration::from_millis(self.delay_ms)))
            }
            PacingStrategy::TokenBucket => ConfiguredPacer::TokenBucket(TokenBucketPacer::new(
                self.requests_per_second,
                self.burst,
            )?),
        })
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CentralError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(
                "⚠️ Config file '{}' not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CentralError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TENANT_NAME})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CentralError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn api_hosts(&self) -> ApiHosts {
        ApiHosts::new(&self.api.token_url, &self.api.global_host)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.token_url", &self.api.token_url)?;
        validate_url("api.global_host", &self.api.global_host)?;
        validate_non_empty_string("api.tenant_name", &self.api.tenant_name)?;
        validate_range("api.page_size", self.api.page_size, 1, 1000)?;
        if let Some(timeout) = self.api.timeout_seconds {
            validate_range("api.timeout_seconds", timeout, 1, 600)?;
        }

        validate_path("credentials.path", &self.credentials.path)?;

        validate_range("pacing.delay_ms", self.pacing.delay_ms, 0, 60_000)?;
        if self.pacing.strategy == PacingStrategy::TokenBucket {
            validate_range("pacing.requests_per_second", self.pacing.requests_per_second, 1, 1000)?;
            validate_range("pacing.burst", self.pacing.burst, 1, 1000)?;
        }

        validate_path("sweep.roster_path", &self.sweep.roster_path)?;
        validate_column_letters("sweep.group_column", &self.sweep.group_column)?;
        validate_column_letters("sweep.name_column", &self.sweep.name_column)?;

        Ok(())
    }
}
