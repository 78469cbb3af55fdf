//! Typed wrapper over the marketplace HTTP API.
//!
//! Every call resolves to an [`ApiResult`]; transport and decoding failures
//! are folded into a generic error string instead of surfacing as `Err`.

use crate::domain::{
    Listing, ListingChanges, ListingDraft, Message, MessageDraft, Pagination, StoredObject,
};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const NETWORK_ERROR: &str = "Network error";
pub const REQUEST_FAILED: &str = "Request failed";

/// `{data, error}` outcome of one API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub pagination: Option<Pagination>,
}

impl<T> ApiResult<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            pagination: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingParams {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl ListingParams {
    fn to_query(&self, cache_buster: i64) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            query.push(("category", category.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        query.push(("_t", cache_buster.to_string()));
        query
    }
}

/// Filters and window for [`ApiClient::get_messages`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageParams {
    pub listing_id: Option<String>,
    pub seller_email: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

impl MessageParams {
    pub fn for_listing(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: Some(listing_id.into()),
            ..Default::default()
        }
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(id) = self.listing_id.as_deref() {
            query.push(("listing_id", id.to_string()));
        }
        if let Some(email) = self.seller_email.as_deref() {
            query.push(("seller_email", email.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        query
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "api request failed");
                return ApiResult::failure(NETWORK_ERROR);
            }
        };
        let status = response.status();
        let envelope: Envelope<T> = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, %status, "api response could not be decoded");
                return ApiResult::failure(NETWORK_ERROR);
            }
        };
        if !status.is_success() || !envelope.success {
            return ApiResult::failure(envelope.error.unwrap_or_else(|| REQUEST_FAILED.to_string()));
        }
        ApiResult {
            data: envelope.data,
            error: None,
            pagination: envelope.pagination,
        }
    }

    /// Fetches one page of listings; a timestamp parameter defeats intermediate caches.
    pub async fn get_listings(&self, params: &ListingParams) -> ApiResult<Vec<Listing>> {
        let query = params.to_query(chrono::Utc::now().timestamp_millis());
        self.send(self.client.get(self.url("/listings")).query(&query))
            .await
    }

    pub async fn get_listing(&self, id: &str) -> ApiResult<Listing> {
        let query = [("_t", chrono::Utc::now().timestamp_millis().to_string())];
        self.send(
            self.client
                .get(self.url(&format!("/listings/{}", id)))
                .query(&query),
        )
        .await
    }

    pub async fn create_listing(&self, draft: &ListingDraft) -> ApiResult<Listing> {
        self.send(self.client.post(self.url("/listings")).json(draft))
            .await
    }

    pub async fn update_listing(&self, id: &str, changes: &ListingChanges) -> ApiResult<Listing> {
        self.send(
            self.client
                .put(self.url(&format!("/listings/{}", id)))
                .json(changes),
        )
        .await
    }

    pub async fn delete_listing(&self, id: &str) -> ApiResult<()> {
        self.send(self.client.delete(self.url(&format!("/listings/{}", id))))
            .await
    }

    /// The page window comes back in `pagination`.
    pub async fn get_messages(&self, params: &MessageParams) -> ApiResult<Vec<Message>> {
        self.send(self.client.get(self.url("/messages")).query(&params.to_query()))
            .await
    }

    pub async fn send_message(&self, draft: &MessageDraft) -> ApiResult<Message> {
        self.send(self.client.post(self.url("/messages")).json(draft))
            .await
    }

    pub async fn upload_image(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<StoredObject> {
        let part = match Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
        {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, content_type, "unusable content type for upload");
                return ApiResult::failure(REQUEST_FAILED);
            }
        };
        let form = Form::new().part("file", part);
        self.send(self.client.post(self.url("/upload")).multipart(form))
            .await
    }

    pub async fn delete_image(&self, file_name: &str) -> ApiResult<()> {
        self.send(
            self.client
                .delete(self.url("/upload"))
                .query(&[("fileName", file_name)]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_query_skips_empty_filters() {
        let params = ListingParams {
            category: Some("Vehicles".to_string()),
            search: Some("   ".to_string()),
            limit: Some(20),
            offset: None,
        };
        assert_eq!(
            params.to_query(42),
            vec![
                ("category", "Vehicles".to_string()),
                ("limit", "20".to_string()),
                ("_t", "42".to_string()),
            ]
        );
    }

    #[test]
    fn message_query_carries_the_window() {
        let params = MessageParams {
            limit: Some(2),
            offset: Some(4),
            ..MessageParams::for_listing("abc")
        };
        assert_eq!(
            params.to_query(),
            vec![
                ("listing_id", "abc".to_string()),
                ("limit", "2".to_string()),
                ("offset", "4".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) on loopback is not expected to accept HTTP.
        let client = ApiClient::new("http://127.0.0.1:9");
        let result = client.get_listing("abc").await;
        assert_eq!(result.error.as_deref(), Some(NETWORK_ERROR));
        assert!(result.data.is_none());
    }
}
