use super::wire::QuoteRecord;
use crate::feed::{EngageError, EngagementRemote, FeedSource, FetchError, PageQuery};
use crate::model::{EngageKind, Quote, QuoteId};
use futures::StreamExt;
use std::time::Duration;
use url::Url;

const MAX_PAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB, pages carry base64 images

/// HTTP client for the quote API.
///
/// - `GET  {base}/api/zen/images?page=N&ids=1,2&l=EN` returns a JSON array of quote records
/// - `PUT  {base}/api/zen/{id}/like` and `/dislike` record an engagement
///
/// Failures are returned, never retried: every retry is user-initiated.
#[derive(Clone)]
pub struct QuoteApi {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl QuoteApi {
    pub fn new(client: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base_path, path));
        url
    }

    fn page_url(&self, query: &PageQuery) -> Url {
        let mut url = self.endpoint("api/zen/images");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page.max(1).to_string());
            if let Some(ids) = query.filter.to_query_value() {
                pairs.append_pair("ids", &ids);
            }
            pairs.append_pair("l", &query.language);
        }
        url
    }

    pub async fn fetch(&self, query: PageQuery) -> Result<Vec<Quote>, FetchError> {
        let url = self.page_url(&query);
        tracing::debug!(page = query.page, url = %url, "Fetching quote page");

        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_PAGE_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let records: Vec<QuoteRecord> =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
        tracing::debug!(page = query.page, count = records.len(), "Fetched quote page");
        Ok(records.into_iter().map(Quote::from).collect())
    }

    pub async fn send_engagement(&self, quote_id: QuoteId, kind: EngageKind) -> Result<(), EngageError> {
        let url = self.endpoint(&format!("api/zen/{}/{}", quote_id, kind.as_str()));
        tracing::debug!(quote_id, kind = %kind, "Sending engagement");

        let response = tokio::time::timeout(self.timeout, self.client.put(url).send())
            .await
            .map_err(|_| EngageError::Timeout)?
            .map_err(|e| EngageError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngageError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

impl FeedSource for QuoteApi {
    async fn fetch_page(&self, query: PageQuery) -> Result<Vec<Quote>, FetchError> {
        self.fetch(query).await
    }
}

impl EngagementRemote for QuoteApi {
    async fn engage(&self, quote_id: QuoteId, kind: EngageKind) -> Result<(), EngageError> {
        self.send_engagement(quote_id, kind).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::Network(e.to_string()))?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
