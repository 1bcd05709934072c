use crate::domain::ports::{ApiResponse, RequestBody, Transport};
use crate::utils::error::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method};
use std::time::Duration;

/// reqwest 實作的 Transport，不重試
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        body: Option<RequestBody>,
    ) -> Result<ApiResponse, TransportError> {
        let mut request = self.client.request(method.clone(), url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        request = match body {
            Some(RequestBody::Form(pairs)) => request.form(&pairs),
            Some(RequestBody::Json(value)) => request.json(&value),
            None => request,
        };

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!("📡 {} {}", method, url);

        let response = request.send().await.map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        tracing::debug!("📡 {} {} -> {}", method, url, status);

        let text = response.text().await.map_err(|source| TransportError::Network {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
                retry_after,
            });
        }

        let body = serde_json::from_str(&text).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })?;

        Ok(ApiResponse { body, retry_after })
    }
}
