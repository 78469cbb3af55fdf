//! Client for the managed backend's REST query (`/rest/v1`) and object
//! storage (`/storage/v1`) APIs.

use super::{public_object_path, ListingQuery, MessageQuery, Store, StoreError, NO_ROWS_CODE};
use crate::domain::{Category, Listing, ListingPatch, Message, NewListing, NewMessage, Page, Price};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

const LISTINGS: &str = "listings";
const MESSAGES: &str = "messages";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const IMAGE_CACHE_SECONDS: u32 = 3600;

#[derive(Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, bucket: &str, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, name)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch_page<R, T>(
        &self,
        table: &str,
        params: Vec<(String, String)>,
    ) -> Result<Page<T>, StoreError>
    where
        R: DeserializeOwned,
        T: TryFrom<R, Error = StoreError>,
    {
        let resp = self
            .request(Method::GET, self.table_url(table))
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check(resp).await?;
        let total = parse_total(
            resp.headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok()),
        );
        let rows: Vec<R> = decode(resp).await?;
        let items = rows
            .into_iter()
            .map(T::try_from)
            .collect::<Result<Vec<T>, StoreError>>()?;
        Ok(Page { items, total })
    }

    async fn fetch_single<R, T>(&self, builder: RequestBuilder) -> Result<T, StoreError>
    where
        R: DeserializeOwned,
        T: TryFrom<R, Error = StoreError>,
    {
        let resp = builder.header(ACCEPT, SINGLE_OBJECT).send().await?;
        let row: R = decode(check(resp).await?).await?;
        T::try_from(row)
    }
}

/// Maps non-2xx responses to `StoreError`, recognising the no-rows code.
async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let code = body.code.or(body.error.clone());
    if code.as_deref() == Some(NO_ROWS_CODE) {
        return Err(StoreError::NotFound);
    }
    let message = body
        .message
        .or(body.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });
    Err(StoreError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

/// `Content-Range: 0-19/57` or `*/0`; the total after the slash, unless `*`.
fn parse_total(content_range: Option<&str>) -> Option<u64> {
    content_range?.rsplit_once('/')?.1.trim().parse().ok()
}

/// `or` filter matching the term anywhere in title or description, case-insensitively.
fn search_filter(term: &str) -> String {
    // LIKE escapes first, so `%` and `_` match literally, then quoting for the filter value.
    let pattern = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let escaped = pattern.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "(title.ilike.\"*{0}*\",description.ilike.\"*{0}*\")",
        escaped
    )
}

fn listing_params(query: &ListingQuery) -> Vec<(String, String)> {
    let mut params = vec![
        ("select".to_string(), "*".to_string()),
        ("order".to_string(), "created_at.desc".to_string()),
        ("offset".to_string(), query.page.offset.to_string()),
        ("limit".to_string(), query.page.limit.to_string()),
    ];
    if let Some(category) = query.category {
        params.push(("category".to_string(), format!("eq.{}", category.name())));
    }
    if let Some(term) = query.search.as_deref() {
        params.push(("or".to_string(), search_filter(term)));
    }
    params
}

fn message_params(query: &MessageQuery) -> Vec<(String, String)> {
    let mut params = vec![
        ("select".to_string(), "*".to_string()),
        ("order".to_string(), "created_at.desc".to_string()),
        ("offset".to_string(), query.page.offset.to_string()),
        ("limit".to_string(), query.page.limit.to_string()),
    ];
    if let Some(id) = query.listing_id.as_deref() {
        params.push(("listing_id".to_string(), format!("eq.{}", id)));
    }
    if let Some(email) = query.seller_email.as_deref() {
        params.push(("seller_email".to_string(), format!("eq.{}", email)));
    }
    params
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    /// Object storage reports its code here.
    #[serde(default)]
    error: Option<String>,
}

/// Row ids may be uuids or integers depending on the table definition.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected id, got {}", other))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
struct ListingRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    title: String,
    price: Amount,
    seller_email: String,
    #[serde(default)]
    description: Option<String>,
    category: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let amount = match row.price {
            Amount::Number(n) => Price::from_amount(n),
            Amount::Text(t) => Price::parse_decimal(t.trim().trim_start_matches('$')).ok(),
        };
        let price = amount
            .ok_or_else(|| StoreError::Decode(format!("listing {} has an invalid price", row.id)))?;
        let category = Category::parse(&row.category).ok_or_else(|| {
            StoreError::Decode(format!("listing {} has unknown category '{}'", row.id, row.category))
        })?;
        Ok(Listing {
            id: row.id,
            title: row.title,
            price,
            seller_email: row.seller_email,
            description: row.description.unwrap_or_default(),
            category,
            location: row
                .location
                .unwrap_or_else(|| crate::domain::listing::DEFAULT_LOCATION.to_string()),
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Serialize)]
struct ListingInsert<'a> {
    title: &'a str,
    /// Sent as a decimal string so the numeric column receives the exact value.
    price: String,
    seller_email: &'a str,
    description: &'a str,
    category: &'static str,
    location: &'a str,
    image_url: Option<&'a str>,
    created_at: DateTime<Utc>,
}

impl<'a> From<&'a NewListing> for ListingInsert<'a> {
    fn from(l: &'a NewListing) -> Self {
        Self {
            title: &l.title,
            price: l.price.decimal(),
            seller_email: &l.seller_email,
            description: &l.description,
            category: l.category.name(),
            location: &l.location,
            image_url: l.image_url.as_deref(),
            created_at: l.created_at,
        }
    }
}

fn patch_body(patch: &ListingPatch) -> serde_json::Map<String, JsonValue> {
    let mut body = serde_json::Map::new();
    if let Some(title) = &patch.title {
        body.insert("title".into(), title.clone().into());
    }
    if let Some(price) = patch.price {
        body.insert("price".into(), price.decimal().into());
    }
    if let Some(description) = &patch.description {
        body.insert("description".into(), description.clone().into());
    }
    if let Some(category) = patch.category {
        body.insert("category".into(), category.name().into());
    }
    if let Some(location) = &patch.location {
        body.insert("location".into(), location.clone().into());
    }
    if let Some(image_url) = &patch.image_url {
        body.insert(
            "image_url".into(),
            image_url.clone().map_or(JsonValue::Null, JsonValue::from),
        );
    }
    if let Some(updated_at) = patch.updated_at {
        body.insert("updated_at".into(), updated_at.to_rfc3339().into());
    }
    body
}

#[derive(Deserialize)]
struct MessageRow {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(deserialize_with = "id_string")]
    listing_id: String,
    #[serde(default)]
    buyer_name: Option<String>,
    buyer_email: String,
    message: String,
    seller_email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            id: row.id,
            listing_id: row.listing_id,
            buyer_name: row.buyer_name,
            buyer_email: row.buyer_email,
            message: row.message,
            seller_email: row.seller_email,
            created_at: row.created_at,
        })
    }
}

#[derive(Serialize)]
struct MessageInsert<'a> {
    listing_id: &'a str,
    buyer_name: Option<&'a str>,
    buyer_email: &'a str,
    message: &'a str,
    seller_email: &'a str,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl Store for SupabaseStore {
    async fn list_listings(&self, query: &ListingQuery) -> Result<Page<Listing>, StoreError> {
        self.fetch_page::<ListingRow, Listing>(LISTINGS, listing_params(query))
            .await
    }

    async fn get_listing(&self, id: &str) -> Result<Listing, StoreError> {
        let builder = self
            .request(Method::GET, self.table_url(LISTINGS))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);
        self.fetch_single::<ListingRow, Listing>(builder).await
    }

    async fn insert_listing(&self, listing: &NewListing) -> Result<Listing, StoreError> {
        let builder = self
            .request(Method::POST, self.table_url(LISTINGS))
            .header("Prefer", "return=representation")
            .json(&ListingInsert::from(listing));
        self.fetch_single::<ListingRow, Listing>(builder).await
    }

    async fn update_listing(&self, id: &str, patch: &ListingPatch) -> Result<Listing, StoreError> {
        let builder = self
            .request(Method::PATCH, self.table_url(LISTINGS))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&patch_body(patch));
        self.fetch_single::<ListingRow, Listing>(builder).await
    }

    async fn delete_listing(&self, id: &str) -> Result<(), StoreError> {
        let resp = self
            .request(Method::DELETE, self.table_url(LISTINGS))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    async fn list_messages(&self, query: &MessageQuery) -> Result<Page<Message>, StoreError> {
        self.fetch_page::<MessageRow, Message>(MESSAGES, message_params(query))
            .await
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message, StoreError> {
        let body = MessageInsert {
            listing_id: &message.listing_id,
            buyer_name: message.buyer_name.as_deref(),
            buyer_email: &message.buyer_email,
            message: &message.message,
            seller_email: &message.seller_email,
            created_at: message.created_at,
        };
        let builder = self
            .request(Method::POST, self.table_url(MESSAGES))
            .header("Prefer", "return=representation")
            .json(&body);
        self.fetch_single::<MessageRow, Message>(builder).await
    }

    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let resp = self
            .request(Method::POST, self.object_url(bucket, name))
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, format!("max-age={}", IMAGE_CACHE_SECONDS))
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    async fn remove_object(&self, bucket: &str, name: &str) -> Result<(), StoreError> {
        let resp = self
            .request(
                Method::DELETE,
                format!("{}/storage/v1/object/{}", self.base_url, bucket),
            )
            .json(&serde_json::json!({ "prefixes": [name] }))
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("{}{}", self.base_url, public_object_path(bucket, name))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let resp = self
            .request(Method::GET, self.table_url(LISTINGS))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }
}
