use crate::core::pagination::{build_url, fetch_all_pages};
use crate::domain::model::{
    EndpointRecord, PageEnvelope, Query, Session, TamperStatus, TamperUpdate, UserRecord,
};
use crate::domain::ports::{Pacer, RequestBody, Transport};
use crate::utils::error::{TamperOperation, TamperOperationError, TransportError, UserLookupError};
use reqwest::Method;
use serde_json::Value;

pub const ENDPOINTS_PATH: &str = "/endpoint/v1/endpoints";
pub const USERS_PATH: &str = "/common/v1/directory/users";

pub fn tamper_protection_path(endpoint_id: &str) -> String {
    format!("{}/{}/tamper-protection", ENDPOINTS_PATH, endpoint_id)
}

/// 租戶層級的查詢與異動；Session 由呼叫端持有並以參考傳入
pub struct CentralApi<T: Transport, P: Pacer> {
    transport: T,
    pacer: P,
}

impl<T: Transport, P: Pacer> CentralApi<T, P> {
    pub fn new(transport: T, pacer: P) -> Self {
        Self { transport, pacer }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub async fn list_endpoints(
        &self,
        session: &Session,
        query: &Query,
    ) -> Result<Vec<EndpointRecord>, TransportError> {
        let endpoints = fetch_all_pages(
            &self.transport,
            &self.pacer,
            &session.regional_url(ENDPOINTS_PATH),
            &session.tenant_headers(),
            query,
        )
        .await?;
        tracing::debug!("💻 Found {} endpoints", endpoints.len());
        Ok(endpoints)
    }

    /// 只讀取第一頁
    pub async fn list_users(
        &self,
        session: &Session,
        query: &Query,
    ) -> Result<Vec<UserRecord>, TransportError> {
        let url = build_url(&session.regional_url(USERS_PATH), query)?;
        let response = self
            .transport
            .request(Method::GET, &url, &session.tenant_headers(), None)
            .await?;
        self.pacer.observe(response.retry_after);

        let page: PageEnvelope<UserRecord> =
            serde_json::from_value(response.body).map_err(|e| TransportError::Shape {
                url: url.clone(),
                message: format!("not a user list: {}", e),
            })?;
        tracing::debug!("👤 Found {} users", page.items.len());
        Ok(page.items)
    }

    /// 找出 exchange login 為 `username` 的使用者所登入過的端點。
    ///
    /// 以顯示名稱與 exchange login 各搜尋一次，只保留 viaLogin 含有 `username` 的項目；
    /// 兩次結果直接串接，可能重複。
    pub async fn endpoints_for_user(
        &self,
        session: &Session,
        username: &str,
    ) -> Result<Vec<EndpointRecord>, UserLookupError> {
        let request_error = |source| UserLookupError::Request {
            username: username.to_string(),
            source,
        };

        let users = self
            .list_users(
                session,
                &Query::new()
                    .with("search", username)
                    .with("searchFields", "exchangeLogin"),
            )
            .await
            .map_err(request_error)?;

        let user = match users.as_slice() {
            [user] => user,
            [] => {
                return Err(UserLookupError::NotFound {
                    username: username.to_string(),
                })
            }
            many => {
                return Err(UserLookupError::Ambiguous {
                    username: username.to_string(),
                    count: many.len(),
                })
            }
        };
        tracing::info!(
            "👤 Found user {} ({}, {})",
            user.exchange_login.as_deref().unwrap_or(username),
            user.id,
            user.name
        );

        let mut search_terms = vec![user.name.as_str()];
        if let Some(login) = user.exchange_login.as_deref() {
            search_terms.push(login);
        }

        let mut matched = Vec::new();
        for term in search_terms {
            let query = Query::new()
                .with("search", term)
                .with("searchFields", "associatedPersonName");
            let endpoints = self
                .list_endpoints(session, &query)
                .await
                .map_err(request_error)?;
            matched.extend(
                endpoints
                    .into_iter()
                    .filter(|endpoint| endpoint.via_login().is_some_and(|l| l.contains(username))),
            );
        }

        tracing::info!("💻 Found {} endpoints for user {}", matched.len(), username);
        Ok(matched)
    }

    pub async fn get_tamper_status(
        &self,
        session: &Session,
        endpoint_id: &str,
    ) -> Result<TamperStatus, TamperOperationError> {
        let failed = |source| TamperOperationError {
            endpoint_id: endpoint_id.to_string(),
            operation: TamperOperation::Get,
            source,
        };

        let url = session.regional_url(&tamper_protection_path(endpoint_id));
        let response = self
            .transport
            .request(Method::GET, &url, &session.tenant_headers(), None)
            .await
            .map_err(failed)?;
        self.pacer.observe(response.retry_after);

        serde_json::from_value(response.body).map_err(|e| {
            failed(TransportError::Shape {
                url,
                message: format!("not a tamper protection status: {}", e),
            })
        })
    }

    pub async fn set_tamper_status(
        &self,
        session: &Session,
        endpoint_id: &str,
        enabled: bool,
    ) -> Result<Value, TamperOperationError> {
        let failed = |source| TamperOperationError {
            endpoint_id: endpoint_id.to_string(),
            operation: TamperOperation::Set,
            source,
        };

        let url = session.regional_url(&tamper_protection_path(endpoint_id));
        let body = serde_json::to_value(TamperUpdate::new(enabled)).map_err(|source| {
            failed(TransportError::Decode {
                url: url.clone(),
                source,
            })
        })?;

        let response = self
            .transport
            .request(
                Method::POST,
                &url,
                &session.tenant_headers(),
                Some(RequestBody::Json(body)),
            )
            .await
            .map_err(failed)?;
        self.pacer.observe(response.retry_after);

        tracing::debug!("🛡️ Tamper protection on {} set to {}", endpoint_id, enabled);
        Ok(response.body)
    }
}
