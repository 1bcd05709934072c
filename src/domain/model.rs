use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::utils::error::{CentralError, Result};
use std::fmt;

/// 一次執行期間的 Central 連線資訊，由 bootstrap 建立後不再改動
#[derive(Clone)]
pub struct Session {
    pub client_id: String,
    pub client_secret: String,
    /// 已含 `Bearer ` 前綴，可直接放進 Authorization 標頭
    pub access_token: String,
    pub organization_id: String,
    pub tenant_id: String,
    pub regional_api_host: String,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn token_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|expires| now >= expires)
    }

    /// 區域 API 的請求標頭
    pub fn tenant_headers(&self) -> Vec<(String, String)> {
        vec![
            ("X-Tenant-ID".to_string(), self.tenant_id.clone()),
            ("Authorization".to_string(), self.access_token.clone()),
        ]
    }

    pub fn regional_url(&self, path: &str) -> String {
        format!("{}{}", self.regional_api_host.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .field("tenant_id", &self.tenant_id)
            .field("regional_api_host", &self.regional_api_host)
            .field("token_expires_at", &self.token_expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedPerson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub via_login: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    pub id: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub associated_person: Option<AssociatedPerson>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EndpointRecord {
    pub fn hostname_or_id(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.id)
    }

    pub fn via_login(&self) -> Option<&str> {
        self.associated_person.as_ref()?.via_login.as_deref()
    }

    pub fn person_name(&self) -> Option<&str> {
        self.associated_person.as_ref()?.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exchange_login: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 分頁回應 `{items, pages: {nextKey}}`，沒有 nextKey 表示最後一頁
#[derive(Debug, Clone, Deserialize)]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub pages: PageInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub next_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TamperStatus {
    pub enabled: bool,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TamperUpdate {
    pub enabled: bool,
    pub regenerate_password: bool,
}

impl TamperUpdate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            regenerate_password: false,
        }
    }
}

/// 有序的查詢參數
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// 已存在的 key 就地取代，否則附加在最後
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// 名冊中的一列資料，`row` 為試算表列號 (資料從第 2 列開始)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub row: usize,
    pub group: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub endpoint_id: String,
    pub hostname: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rows_matched: usize,
    pub endpoints_matched: usize,
    pub endpoints_updated: usize,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 有任何端點失敗時回傳錯誤，讓程序以非 0 結束
    pub fn ensure_clean(&self) -> Result<()> {
        if self.is_clean() {
            return Ok(());
        }
        Err(CentralError::SweepIncomplete {
            failed: self.failures.len(),
            matched: self.endpoints_matched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_set_replaces_in_place() {
        let mut query = Query::new().with("pageSize", 500).with("search", "alice");
        query.set("pageFromKey", "k1");
        query.set("pageFromKey", "k2");

        assert_eq!(
            query.pairs(),
            &[
                ("pageSize".to_string(), "500".to_string()),
                ("search".to_string(), "alice".to_string()),
                ("pageFromKey".to_string(), "k2".to_string()),
            ]
        );
        assert_eq!(query.get("pageFromKey"), Some("k2"));
    }

    #[test]
    fn test_endpoint_record_keeps_unknown_fields() {
        let record: EndpointRecord = serde_json::from_value(serde_json::json!({
            "id": "e1",
            "hostname": "LAPTOP-1",
            "type": "computer",
            "associatedPerson": {"name": "Alice", "viaLogin": "CORP\\alice", "id": "p1"}
        }))
        .unwrap();

        assert_eq!(record.via_login(), Some("CORP\\alice"));
        assert_eq!(record.person_name(), Some("Alice"));
        assert_eq!(record.extra.get("type").unwrap(), "computer");
    }

    #[test]
    fn test_page_envelope_without_pages_is_last_page() {
        let page: PageEnvelope<EndpointRecord> =
            serde_json::from_value(serde_json::json!({"items": [{"id": "a"}]})).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.pages.next_key.is_none());
    }

    #[test]
    fn test_report_with_failures_is_an_error() {
        let mut report = SweepReport {
            rows_matched: 2,
            endpoints_matched: 3,
            endpoints_updated: 2,
            failures: vec![],
        };
        assert!(report.ensure_clean().is_ok());

        report.failures.push(SweepFailure {
            endpoint_id: "e1".to_string(),
            hostname: "LAPTOP-1".to_string(),
            message: "Tamper protection get failed".to_string(),
        });
        match report.ensure_clean() {
            Err(err @ CentralError::SweepIncomplete { failed: 1, matched: 3 }) => {
                assert_eq!(err.exit_code(), 2);
            }
            other => panic!("expected SweepIncomplete, got {:?}", other),
        }
    }

    #[test]
    fn test_tamper_update_payload() {
        let body = serde_json::to_value(TamperUpdate::new(false)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"enabled": false, "regeneratePassword": false})
        );
    }

    #[test]
    fn test_session_debug_redacts_secrets() {
        let session = Session {
            client_id: "id".to_string(),
            client_secret: "very-secret".to_string(),
            access_token: "Bearer abc".to_string(),
            organization_id: "org".to_string(),
            tenant_id: "tenant".to_string(),
            regional_api_host: "https://api-eu01.central.sophos.com/".to_string(),
            token_expires_at: None,
        };
        let debug = format!("{:?}", session);
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("Bearer abc"));
        assert_eq!(
            session.regional_url("/endpoint/v1/endpoints"),
            "https://api-eu01.central.sophos.com/endpoint/v1/endpoints"
        );
    }
}
