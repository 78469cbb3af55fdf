//! Client-side listing collection: the current page window, filter state and
//! incremental "load more".
//!
//! Each fetch is tagged with a generation and a cancellation token. Starting a
//! new replacing fetch cancels the previous one, and a result is applied only
//! while its generation is still current, so an older response can never
//! overwrite newer state.

use super::api::{ApiClient, ApiResult, ListingParams};
use crate::domain::listing::ALL_CATEGORIES;
use crate::domain::page::DEFAULT_LISTING_LIMIT;
use crate::domain::{Listing, ListingDraft};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Where the feed gets its listings from.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, params: &ListingParams) -> ApiResult<Vec<Listing>>;
    async fn create(&self, draft: &ListingDraft) -> ApiResult<Listing>;
}

#[async_trait]
impl ListingSource for ApiClient {
    async fn fetch(&self, params: &ListingParams) -> ApiResult<Vec<Listing>> {
        self.get_listings(params).await
    }

    async fn create(&self, draft: &ListingDraft) -> ApiResult<Listing> {
        self.create_listing(draft).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    pub listings: Vec<Listing>,
    pub category: String,
    pub search: String,
    pub loading: bool,
    pub error: Option<String>,
    /// Offset of the most recently loaded page.
    pub offset: u64,
    pub has_more: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            listings: Vec::new(),
            category: ALL_CATEGORIES.to_string(),
            search: String::new(),
            loading: false,
            error: None,
            offset: 0,
            has_more: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// Nothing was requested (already loading or no further pages).
    Skipped,
    /// Superseded by a newer fetch or cancelled; the result was discarded.
    Cancelled,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Replace,
    Append,
}

struct Inner {
    state: FeedState,
    generation: u64,
    token: CancellationToken,
    /// The list holds the first page of the current filters and later appends.
    loaded: bool,
}

pub struct ListingsFeed<S: ListingSource> {
    source: Arc<S>,
    page_size: u32,
    inner: Mutex<Inner>,
}

impl<S: ListingSource> ListingsFeed<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_page_size(source, DEFAULT_LISTING_LIMIT)
    }

    pub fn with_page_size(source: Arc<S>, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            inner: Mutex::new(Inner {
                state: FeedState::default(),
                generation: 0,
                token: CancellationToken::new(),
                loaded: false,
            }),
        }
    }

    pub async fn snapshot(&self) -> FeedState {
        self.inner.lock().await.state.clone()
    }

    pub async fn set_category(&self, category: &str) -> FetchOutcome {
        self.inner.lock().await.state.category = category.to_string();
        self.refresh().await
    }

    pub async fn set_search(&self, search: &str) -> FetchOutcome {
        self.inner.lock().await.state.search = search.to_string();
        self.refresh().await
    }

    /// Reloads from offset zero, replacing the list.
    pub async fn refresh(&self) -> FetchOutcome {
        let (generation, token, params) = {
            let mut inner = self.inner.lock().await;
            let (generation, token) = Self::begin(&mut inner);
            inner.loaded = false;
            let params = self.params(&inner.state, 0);
            (generation, token, params)
        };
        self.run(generation, token, params, Mode::Replace).await
    }

    /// Appends the next page, unless a fetch is in flight or no pages remain.
    /// With no first page loaded yet it loads that page instead.
    pub async fn load_more(&self) -> FetchOutcome {
        let (generation, token, params, mode) = {
            let mut inner = self.inner.lock().await;
            if inner.state.loading || (inner.loaded && !inner.state.has_more) {
                return FetchOutcome::Skipped;
            }
            let (next, mode) = if inner.loaded {
                (inner.state.offset.saturating_add(u64::from(self.page_size)), Mode::Append)
            } else {
                (0, Mode::Replace)
            };
            let (generation, token) = Self::begin(&mut inner);
            let params = self.params(&inner.state, next);
            (generation, token, params, mode)
        };
        self.run(generation, token, params, mode).await
    }

    /// Abandons any in-flight fetch.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        inner.token.cancel();
        inner.generation += 1;
        inner.state.loading = false;
    }

    /// Creates a listing and, on success, puts it at the front of the list.
    pub async fn create_listing(&self, draft: &ListingDraft) -> ApiResult<Listing> {
        let result = self.source.create(draft).await;
        if let Some(listing) = &result.data {
            self.inner
                .lock()
                .await
                .state
                .listings
                .insert(0, listing.clone());
        }
        result
    }

    fn begin(inner: &mut Inner) -> (u64, CancellationToken) {
        inner.token.cancel();
        inner.generation += 1;
        inner.token = CancellationToken::new();
        inner.state.loading = true;
        inner.state.error = None;
        (inner.generation, inner.token.clone())
    }

    fn params(&self, state: &FeedState, offset: u64) -> ListingParams {
        ListingParams {
            category: Some(state.category.clone()).filter(|c| !c.eq_ignore_ascii_case(ALL_CATEGORIES)),
            search: Some(state.search.clone()).filter(|s| !s.trim().is_empty()),
            limit: Some(self.page_size),
            offset: Some(offset),
        }
    }

    async fn run(
        &self,
        generation: u64,
        token: CancellationToken,
        params: ListingParams,
        mode: Mode,
    ) -> FetchOutcome {
        let result = tokio::select! {
            _ = token.cancelled() => return FetchOutcome::Cancelled,
            result = self.source.fetch(&params) => result,
        };

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return FetchOutcome::Cancelled;
        }
        let succeeded = result.error.is_none() && result.data.is_some();
        if succeeded {
            inner.loaded = true;
        }
        let state = &mut inner.state;
        state.loading = false;
        match result.data {
            Some(items) if succeeded => {
                let offset = params.offset.unwrap_or(0);
                state.has_more = match result.pagination {
                    Some(p) => p.has_more,
                    None => items.len() as u64 >= u64::from(self.page_size),
                };
                match mode {
                    Mode::Replace => state.listings = items,
                    Mode::Append => state.listings.extend(items),
                }
                state.offset = offset;
            }
            _ => {
                state.error = Some(result.error.unwrap_or_else(|| "Failed to fetch listings".to_string()));
            }
        }
        FetchOutcome::Applied
    }
}
