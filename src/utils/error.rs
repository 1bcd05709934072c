use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// 單次 HTTP 往返失敗
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned status {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    },

    #[error("Response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unexpected response shape from {url}: {message}")]
    Shape { url: String, message: String },
}

/// 建立 Session 時的失敗，一律視為致命錯誤
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Bootstrap step '{stage}' failed: {source}")]
    Request {
        stage: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Token endpoint did not return an access_token")]
    MissingAccessToken,

    #[error("Identity endpoint did not return an organization id")]
    MissingOrganizationId,

    #[error("No tenant named '{tenant_name}' is visible to this organization")]
    TenantNotFound { tenant_name: String },

    #[error("Tenant '{tenant_name}' has no '{field}' field")]
    MissingTenantField {
        tenant_name: String,
        field: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum UserLookupError {
    #[error("No user with exchange login '{username}'")]
    NotFound { username: String },

    #[error("{count} users match exchange login '{username}', expected exactly one")]
    Ambiguous { username: String, count: usize },

    #[error("User search for '{username}' failed: {source}")]
    Request {
        username: String,
        #[source]
        source: TransportError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TamperOperation {
    Get,
    Set,
}

impl fmt::Display for TamperOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TamperOperation::Get => write!(f, "get"),
            TamperOperation::Set => write!(f, "set"),
        }
    }
}

#[derive(Error, Debug)]
#[error("Tamper protection {operation} failed for endpoint {endpoint_id}: {source}")]
pub struct TamperOperationError {
    pub endpoint_id: String,
    pub operation: TamperOperation,
    #[source]
    pub source: TransportError,
}

#[derive(Error, Debug)]
pub enum CentralError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    UserLookup(#[from] UserLookupError),

    #[error(transparent)]
    TamperOperation(#[from] TamperOperationError),

    #[error("Sweep finished with {failed} of {matched} matched endpoints failing")]
    SweepIncomplete { failed: usize, matched: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Lookup,
    Operation,
    Configuration,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CentralError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CentralError::Transport(_) => ErrorCategory::Network,
            CentralError::Bootstrap(_) => ErrorCategory::Authentication,
            CentralError::UserLookup(_) => ErrorCategory::Lookup,
            CentralError::TamperOperation(_) | CentralError::SweepIncomplete { .. } => {
                ErrorCategory::Operation
            }
            CentralError::ConfigError { .. }
            | CentralError::InvalidConfigValueError { .. }
            | CentralError::MissingConfigError { .. } => ErrorCategory::Configuration,
            CentralError::IoError(_)
            | CentralError::CsvError(_)
            | CentralError::SerializationError(_) => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CentralError::UserLookup(UserLookupError::Request { .. }) => ErrorSeverity::Medium,
            CentralError::UserLookup(_) => ErrorSeverity::Low,
            CentralError::Transport(_)
            | CentralError::TamperOperation(_)
            | CentralError::SweepIncomplete { .. } => ErrorSeverity::Medium,
            CentralError::Bootstrap(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 程序結束碼，任何錯誤都不會回傳 0
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CentralError::Transport(_) => format!("Could not talk to the Central API: {}", self),
            CentralError::Bootstrap(_) => format!("Could not open a Central session: {}", self),
            CentralError::UserLookup(_) => format!("User lookup failed: {}", self),
            CentralError::TamperOperation(_) => format!("Tamper protection change failed: {}", self),
            CentralError::SweepIncomplete { .. } => format!("Sweep incomplete: {}", self),
            CentralError::IoError(_) | CentralError::CsvError(_) => {
                format!("Could not read input file: {}", self)
            }
            CentralError::SerializationError(_) => format!("Malformed JSON input: {}", self),
            CentralError::ConfigError { .. }
            | CentralError::InvalidConfigValueError { .. }
            | CentralError::MissingConfigError { .. } => {
                format!("Configuration problem: {}", self)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CentralError::Transport(TransportError::Status { status: 429, .. }) => {
                "The API is rate limiting requests; raise pacing.delay_ms or lower pacing.requests_per_second"
            }
            CentralError::Transport(_) => "Check network connectivity and the configured API hosts",
            CentralError::Bootstrap(BootstrapError::TenantNotFound { .. }) => {
                "Check api.tenant_name against the tenant names listed in Central"
            }
            CentralError::Bootstrap(_) => "Check CLIENT_ID/CLIENT_SECRET and that the API credential is still valid",
            CentralError::UserLookup(UserLookupError::Ambiguous { .. }) => {
                "Use the full exchange login so that exactly one user matches"
            }
            CentralError::UserLookup(_) => "Check the spelling of the exchange login",
            CentralError::TamperOperation(_) => "Verify the endpoint id still exists in the tenant",
            CentralError::SweepIncomplete { .. } => {
                "Review the failed endpoints above and rerun the sweep; endpoints already updated are unaffected"
            }
            CentralError::IoError(_) | CentralError::CsvError(_) => {
                "Make sure the file exists and is readable"
            }
            CentralError::SerializationError(_) => "Make sure the file contains valid JSON",
            _ => "Review the configuration file",
        }
    }
}

pub type Result<T> = std::result::Result<T, CentralError>;
