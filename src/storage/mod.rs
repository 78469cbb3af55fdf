//! Persistence seam over the managed backend.
//!
//! The backend owns every listing, message and image blob. `Store` is the
//! narrow set of table-query and object-storage operations the marketplace
//! needs; `SupabaseStore` speaks to the real service and `MemoryStore` is an
//! in-process stand-in with the same observable behaviour.

use crate::domain::{
    Category, Listing, ListingPatch, Message, NewListing, NewMessage, Page, PageRequest,
};
use async_trait::async_trait;

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

/// Error code the REST layer uses when a single-row query matched nothing.
pub const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Resource not found")]
    NotFound,

    /// The backend rejected the request; `message` is its own wording.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected store response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub category: Option<Category>,
    /// Case-insensitive substring matched against title or description.
    pub search: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageQuery {
    pub listing_id: Option<String>,
    pub seller_email: Option<String>,
    pub page: PageRequest,
}

/// Table-query and object-storage operations. Collections are returned newest first.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_listings(&self, query: &ListingQuery) -> Result<Page<Listing>, StoreError>;

    /// Fails with `StoreError::NotFound` when no row has this id.
    async fn get_listing(&self, id: &str) -> Result<Listing, StoreError>;

    async fn insert_listing(&self, listing: &NewListing) -> Result<Listing, StoreError>;

    async fn update_listing(&self, id: &str, patch: &ListingPatch) -> Result<Listing, StoreError>;

    /// Deleting an id that does not exist is not an error for the REST backend.
    async fn delete_listing(&self, id: &str) -> Result<(), StoreError>;

    async fn list_messages(&self, query: &MessageQuery) -> Result<Page<Message>, StoreError>;

    async fn insert_message(&self, message: &NewMessage) -> Result<Message, StoreError>;

    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn remove_object(&self, bucket: &str, name: &str) -> Result<(), StoreError>;

    fn public_url(&self, bucket: &str, name: &str) -> String;

    /// Cheap round-trip used by the health check.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub const PUBLIC_OBJECT_PREFIX: &str = "/storage/v1/object/public/";

/// Path under the store's base URL where public objects are served.
pub fn public_object_path(bucket: &str, name: &str) -> String {
    format!("{}{}/{}", PUBLIC_OBJECT_PREFIX, bucket, name)
}
