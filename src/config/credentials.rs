use crate::utils::error::{CentralError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// `credentials.json`：`{"CLIENT_ID": "...", "CLIENT_SECRET": "..."}`
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "CLIENT_ID")]
    pub client_id: String,
    #[serde(rename = "CLIENT_SECRET")]
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| CentralError::ConfigError {
            message: format!(
                "Cannot read credentials file '{}': {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let credentials: Credentials = serde_json::from_str(content)?;
        credentials.validate()?;
        Ok(credentials)
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("CLIENT_ID", &self.client_id)?;
        validate_non_empty_string("CLIENT_SECRET", &self.client_secret)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
