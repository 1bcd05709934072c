use crate::domain::model::{PageEnvelope, Query};
use crate::domain::ports::{Pacer, Transport};
use crate::utils::error::TransportError;
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

/// 組出 `base_url?query`，query 為空時不加 `?`
pub fn build_url(base_url: &str, query: &Query) -> Result<String, TransportError> {
    let mut url = Url::parse(base_url).map_err(|source| TransportError::InvalidUrl {
        url: base_url.to_string(),
        source,
    })?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.pairs());
    }

    Ok(url.to_string())
}

fn decode_page<T: DeserializeOwned>(
    url: &str,
    body: serde_json::Value,
) -> Result<PageEnvelope<T>, TransportError> {
    serde_json::from_value(body).map_err(|e| TransportError::Shape {
        url: url.to_string(),
        message: format!("not a page envelope: {}", e),
    })
}

/// 依 `pages.nextKey` 逐頁抓取並串接 `items`。
///
/// 第 2..N 頁請求前呼叫 `pacer.pace()`，第一頁不等待。沒有循環偵測：
/// 假設後端每次回傳新的 key，或在最後一頁省略 nextKey。
pub async fn fetch_all_pages<T, Tr, P>(
    transport: &Tr,
    pacer: &P,
    base_url: &str,
    headers: &[(String, String)],
    query: &Query,
) -> Result<Vec<T>, TransportError>
where
    T: DeserializeOwned,
    Tr: Transport + ?Sized,
    P: Pacer + ?Sized,
{
    let mut query = query.clone();
    let mut items = Vec::new();
    let mut page_number = 1usize;

    loop {
        let url = build_url(base_url, &query)?;
        tracing::debug!("📄 Fetching page {}: {}", page_number, url);

        let response = transport.request(Method::GET, &url, headers, None).await?;
        pacer.observe(response.retry_after);

        let page: PageEnvelope<T> = decode_page(&url, response.body)?;
        items.extend(page.items);

        match page.pages.next_key {
            Some(next_key) => {
                query.set("pageFromKey", next_key);
                page_number += 1;
                pacer.pace().await;
            }
            None => break,
        }
    }

    tracing::debug!("📄 Collected {} items over {} page(s)", items.len(), page_number);
    Ok(items)
}
