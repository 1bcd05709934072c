use crate::config::credentials::Credentials;
use crate::domain::model::Session;
use crate::domain::ports::{RequestBody, Transport};
use crate::utils::error::BootstrapError;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Method;
use serde_json::Value;

pub const DEFAULT_TOKEN_URL: &str = "https://id.sophos.com/api/v2/oauth2/token";
pub const DEFAULT_GLOBAL_HOST: &str = "https://api.central.sophos.com";

const WHOAMI_PATH: &str = "/whoami/v1";
const TENANTS_PATH: &str = "/organization/v1/tenants";

/// Token 端點與全域 API 位址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiHosts {
    pub token_url: String,
    pub global_host: String,
}

impl ApiHosts {
    pub fn new(token_url: impl Into<String>, global_host: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            global_host: global_host.into(),
        }
    }

    fn global_url(&self, path: &str) -> String {
        format!("{}{}", self.global_host.trim_end_matches('/'), path)
    }
}

impl Default for ApiHosts {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_URL, DEFAULT_GLOBAL_HOST)
    }
}

fn string_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field)?.as_str().filter(|s| !s.is_empty())
}

/// 以 client credentials 換取 token，再解析組織與租戶。
///
/// 三個步驟依序執行，任何一步失敗都會中止整個流程。
pub async fn bootstrap<T: Transport + ?Sized>(
    transport: &T,
    hosts: &ApiHosts,
    credentials: &Credentials,
    tenant_name: &str,
) -> Result<Session, BootstrapError> {
    // 1. JWT token
    let form = vec![
        ("grant_type".to_string(), "client_credentials".to_string()),
        ("client_id".to_string(), credentials.client_id.clone()),
        ("client_secret".to_string(), credentials.client_secret.clone()),
        ("scope".to_string(), "token".to_string()),
    ];
    let token_response = transport
        .request(
            Method::POST,
            &hosts.token_url,
            &[(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            )],
            Some(RequestBody::Form(form)),
        )
        .await
        .map_err(|source| BootstrapError::Request {
            stage: "token",
            source,
        })?
        .body;

    let token = string_field(&token_response, "access_token")
        .ok_or(BootstrapError::MissingAccessToken)?;
    let access_token = format!("Bearer {}", token);
    let token_expires_at = token_response
        .get("expires_in")
        .and_then(Value::as_i64)
        .and_then(ChronoDuration::try_seconds)
        .map(|lifetime| Utc::now() + lifetime);
    tracing::info!("🔑 Access token acquired");
    if let Some(expires_at) = token_expires_at {
        tracing::debug!("🔑 Token expires at {}", expires_at);
    }

    // 2. 組織 ID
    let whoami = transport
        .request(
            Method::GET,
            &hosts.global_url(WHOAMI_PATH),
            &[("Authorization".to_string(), access_token.clone())],
            None,
        )
        .await
        .map_err(|source| BootstrapError::Request {
            stage: "whoami",
            source,
        })?
        .body;

    let organization_id = string_field(&whoami, "id")
        .ok_or(BootstrapError::MissingOrganizationId)?
        .to_string();
    tracing::info!("🏢 Organization ID: {}", organization_id);

    // 3. 租戶 ID 與區域 API 位址
    let tenants = transport
        .request(
            Method::GET,
            &hosts.global_url(TENANTS_PATH),
            &[
                ("X-Organization-ID".to_string(), organization_id.clone()),
                ("Authorization".to_string(), access_token.clone()),
            ],
            None,
        )
        .await
        .map_err(|source| BootstrapError::Request {
            stage: "tenants",
            source,
        })?
        .body;

    // 同名租戶以清單中最後一筆為準
    let tenant = tenants
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .rev()
                .find(|item| item.get("name").and_then(Value::as_str) == Some(tenant_name))
        })
        .ok_or_else(|| BootstrapError::TenantNotFound {
            tenant_name: tenant_name.to_string(),
        })?;

    let missing = |field: &'static str| BootstrapError::MissingTenantField {
        tenant_name: tenant_name.to_string(),
        field,
    };
    let tenant_id = string_field(tenant, "id").ok_or_else(|| missing("id"))?.to_string();
    let regional_api_host = string_field(tenant, "apiHost")
        .ok_or_else(|| missing("apiHost"))?
        .to_string();
    tracing::info!("🏠 Tenant ID: {} ({})", tenant_id, regional_api_host);

    Ok(Session {
        client_id: credentials.client_id.clone(),
        client_secret: credentials.client_secret.clone(),
        access_token,
        organization_id,
        tenant_id,
        regional_api_host,
        token_expires_at,
    })
}
