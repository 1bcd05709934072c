#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tamper_toggle::domain::ports::{ApiResponse, RequestBody, Transport};
use tamper_toggle::utils::error::TransportError;
use tamper_toggle::Session;
use url::Url;

pub const REGION: &str = "https://api-eu01.central.sophos.com";

pub fn session() -> Session {
    Session {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        access_token: "Bearer test-token".to_string(),
        organization_id: "org-1".to_string(),
        tenant_id: "tenant-1".to_string(),
        regional_api_host: REGION.to_string(),
        token_expires_at: None,
    }
}

pub fn endpoint(id: &str, hostname: &str, name: &str, via_login: &str) -> Value {
    json!({
        "id": id,
        "hostname": hostname,
        "type": "computer",
        "associatedPerson": {"name": name, "viaLogin": via_login}
    })
}

pub fn user(id: &str, name: &str, exchange_login: &str) -> Value {
    json!({"id": id, "name": name, "exchangeLogin": exchange_login})
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RecordedRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// 記憶體內模擬的區域 API：端點分頁、使用者搜尋與 tamper protection 狀態
pub struct FakeCentral {
    endpoints: Vec<Value>,
    users: Vec<Value>,
    tamper: Mutex<HashMap<String, bool>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeCentral {
    pub fn new(endpoints: Vec<Value>, users: Vec<Value>) -> Self {
        let tamper = endpoints
            .iter()
            .filter_map(|e| e["id"].as_str())
            .map(|id| (id.to_string(), true))
            .collect();
        Self {
            endpoints,
            users,
            tamper: Mutex::new(tamper),
            failing: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 指定端點的 tamper protection 請求一律回 500
    pub fn failing_on(mut self, endpoint_id: &str) -> Self {
        self.failing.insert(endpoint_id.to_string());
        self
    }

    pub fn tamper_enabled(&self, endpoint_id: &str) -> Option<bool> {
        self.tamper.lock().unwrap().get(endpoint_id).copied()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    fn status_error(method: &Method, url: &str, status: u16) -> TransportError {
        TransportError::Status {
            method: method.to_string(),
            url: url.to_string(),
            status,
            body: String::new(),
            retry_after: None,
        }
    }

    fn list_endpoints(&self, query: &[(String, String)]) -> Value {
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };
        let filtered: Vec<&Value> = match get("search") {
            Some(term) => self
                .endpoints
                .iter()
                .filter(|e| {
                    e["associatedPerson"]["name"]
                        .as_str()
                        .is_some_and(|n| n.to_lowercase().contains(&term.to_lowercase()))
                })
                .collect(),
            None => self.endpoints.iter().collect(),
        };

        let page_size: usize = get("pageSize").and_then(|s| s.parse().ok()).unwrap_or(50);
        let offset: usize = get("pageFromKey")
            .and_then(|k| k.strip_prefix("key-").and_then(|n| n.parse().ok()))
            .unwrap_or(0);
        let items: Vec<&Value> = filtered.iter().skip(offset).take(page_size).copied().collect();
        let next = offset + page_size;

        if next < filtered.len() {
            json!({"items": items, "pages": {"fromKey": format!("key-{}", offset), "nextKey": format!("key-{}", next)}})
        } else {
            json!({"items": items, "pages": {"fromKey": format!("key-{}", offset)}})
        }
    }

    fn list_users(&self, query: &[(String, String)]) -> Value {
        let term = query
            .iter()
            .find(|(k, _)| k == "search")
            .map(|(_, v)| v.to_lowercase());
        let items: Vec<&Value> = self
            .users
            .iter()
            .filter(|u| match &term {
                Some(term) => u["exchangeLogin"]
                    .as_str()
                    .is_some_and(|l| l.to_lowercase().contains(term)),
                None => true,
            })
            .collect();
        json!({"items": items, "pages": {"current": 1, "total": 1}})
    }
}

#[async_trait]
impl Transport for FakeCentral {
    async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<RequestBody>,
    ) -> Result<ApiResponse, TransportError> {
        let parsed = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let path = parsed.path().to_string();
        let query: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();

        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query: query.clone(),
            headers: headers.to_vec(),
            body: body.clone(),
        });

        if path == "/endpoint/v1/endpoints" && method == Method::GET {
            return Ok(ApiResponse::new(self.list_endpoints(&query)));
        }
        if path == "/common/v1/directory/users" && method == Method::GET {
            return Ok(ApiResponse::new(self.list_users(&query)));
        }

        let endpoint_id = path
            .strip_prefix("/endpoint/v1/endpoints/")
            .and_then(|rest| rest.strip_suffix("/tamper-protection"))
            .ok_or_else(|| Self::status_error(&method, url, 404))?;

        if self.failing.contains(endpoint_id) {
            return Err(Self::status_error(&method, url, 500));
        }

        let mut tamper = self.tamper.lock().unwrap();
        let current = tamper
            .get_mut(endpoint_id)
            .ok_or_else(|| Self::status_error(&method, url, 404))?;

        if method == Method::POST {
            if let Some(RequestBody::Json(payload)) = &body {
                *current = payload["enabled"].as_bool().unwrap_or(*current);
            }
        }

        Ok(ApiResponse::new(json!({
            "enabled": *current,
            "password": "A1B2C3",
            "previousPasswords": []
        })))
    }
}
