use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use propscope_core::analytics::{PageResult, ValueRow};

use crate::error::FetchError;
use crate::request::ValuesRequest;

/// Source of value pages. The HTTP implementation talks to a propscope
/// server; tests substitute in-memory fakes.
#[async_trait]
pub trait PageFetcher: Send + Sync + 'static {
    async fn fetch_page(&self, request: &ValuesRequest) -> Result<PageResult<ValueRow>, FetchError>;
}

/// Fetches pages from `GET /api/websites/{id}/event-data/values-paged`.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpPageFetcher {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
        })
    }

    fn values_url(&self, website_id: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "websites", website_id, "event-data", "values-paged"]);
        Ok(url)
    }
}

/// `error.message` of a JSON error body, or the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, request: &ValuesRequest) -> Result<PageResult<ValueRow>, FetchError> {
        let url = self.values_url(&request.query.website_id)?;
        let mut builder = self.client.get(url).query(&request.query_pairs());
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        tracing::debug!(
            website_id = %request.query.website_id,
            page = request.page,
            "fetching values page"
        );
        let resp = builder.send().await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if status.is_server_error() {
            return Err(FetchError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_url_appends_segments_to_base_path() {
        let fetcher = HttpPageFetcher::new("http://localhost:3000", None).expect("fetcher");
        assert_eq!(
            fetcher.values_url("site_1").expect("url").as_str(),
            "http://localhost:3000/api/websites/site_1/event-data/values-paged"
        );

        let prefixed = HttpPageFetcher::new("https://example.com/stats/", None).expect("fetcher");
        assert_eq!(
            prefixed.values_url("site 1").expect("url").as_str(),
            "https://example.com/stats/api/websites/site%201/event-data/values-paged"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpPageFetcher::new("not a url", None).is_err());
        assert!(HttpPageFetcher::new("mailto:ops@example.com", None).is_err());
    }

    #[test]
    fn error_message_prefers_json_message() {
        let body = r#"{"error":{"code":"validation_error","message":"page must be 1 or greater","field":null}}"#;
        assert_eq!(error_message(body), "page must be 1 or greater");
        assert_eq!(error_message("plain text"), "plain text");
    }
}
