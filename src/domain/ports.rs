use crate::domain::model::RosterRow;
use crate::utils::error::{Result, TransportError};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub body: Value,
    /// 回應中 `Retry-After` 標頭 (秒數)
    pub retry_after: Option<Duration>,
}

impl ApiResponse {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            retry_after: None,
        }
    }
}

/// 一次 HTTP 往返，回傳解析後的 JSON
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<RequestBody>,
    ) -> std::result::Result<ApiResponse, TransportError>;
}

/// 連續請求之間的節流
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pace(&self);

    /// 回報伺服器要求的等待時間，下一次 `pace` 會至少等這麼久
    fn observe(&self, _retry_after: Option<Duration>) {}
}

pub trait RosterSource: Send + Sync {
    fn rows(&self) -> Result<Vec<RosterRow>>;
}
