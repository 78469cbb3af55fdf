//! Consumer side of the HTTP API.

pub mod api;
pub mod feed;
pub mod images;

pub use api::{ApiClient, ApiResult, ListingParams, MessageParams};
pub use feed::{FeedState, FetchOutcome, ListingSource, ListingsFeed};
pub use images::ImageHosts;
