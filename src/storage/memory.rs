//! In-process store used by tests and local runs without a backend.
//!
//! Mirrors the REST backend's observable behaviour: newest-first ordering,
//! exact totals, the not-found signal on single-row reads, idempotent deletes
//! and no-upsert object uploads. A failure can be injected so callers can
//! exercise their upstream-error paths.

use super::{public_object_path, ListingQuery, MessageQuery, Store, StoreError};
use crate::domain::{Listing, ListingPatch, Message, NewListing, NewMessage, Page, PageRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct Inner {
    listings: Vec<Listing>,
    messages: Vec<Message>,
    objects: HashMap<(String, String), StoredBlob>,
    failure: Option<String>,
}

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    public_base: String,
}

impl MemoryStore {
    /// `public_base` is the origin that public object URLs are built on.
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Makes every subsequent operation fail with `message` until cleared.
    pub async fn fail_with(&self, message: impl Into<String>) {
        self.inner.write().await.failure = Some(message.into());
    }

    pub async fn clear_failure(&self) {
        self.inner.write().await.failure = None;
    }

    pub async fn object(&self, bucket: &str, name: &str) -> Option<StoredBlob> {
        self.inner
            .read()
            .await
            .objects
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn listing_count(&self) -> usize {
        self.inner.read().await.listings.len()
    }

    pub async fn message_count(&self) -> usize {
        self.inner.read().await.messages.len()
    }
}

fn injected(inner: &Inner) -> Result<(), StoreError> {
    match &inner.failure {
        Some(message) => Err(StoreError::Api {
            status: 500,
            code: Some("XX000".to_string()),
            message: message.clone(),
        }),
        None => Ok(()),
    }
}

/// Newest first; among equal timestamps the later insert comes first.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

fn window<T>(rows: Vec<T>, page: PageRequest) -> Page<T> {
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(page.offset.min(usize::MAX as u64) as usize)
        .take(page.limit as usize)
        .collect();
    Page {
        items,
        total: Some(total),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_listings(&self, query: &ListingQuery) -> Result<Page<Listing>, StoreError> {
        let inner = self.inner.read().await;
        injected(&inner)?;
        let matching: Vec<Listing> = newest_first(&inner.listings, |l| l.created_at)
            .into_iter()
            .filter(|l| query.category.map_or(true, |c| l.category == c))
            .filter(|l| query.search.as_deref().map_or(true, |s| l.matches_search(s)))
            .collect();
        Ok(window(matching, query.page))
    }

    async fn get_listing(&self, id: &str) -> Result<Listing, StoreError> {
        let inner = self.inner.read().await;
        injected(&inner)?;
        inner
            .listings
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_listing(&self, listing: &NewListing) -> Result<Listing, StoreError> {
        let mut inner = self.inner.write().await;
        injected(&inner)?;
        let row = Listing {
            id: uuid::Uuid::new_v4().to_string(),
            title: listing.title.clone(),
            price: listing.price,
            seller_email: listing.seller_email.clone(),
            description: listing.description.clone(),
            category: listing.category,
            location: listing.location.clone(),
            image_url: listing.image_url.clone(),
            created_at: listing.created_at,
            updated_at: None,
        };
        inner.listings.push(row.clone());
        Ok(row)
    }

    async fn update_listing(&self, id: &str, patch: &ListingPatch) -> Result<Listing, StoreError> {
        let mut inner = self.inner.write().await;
        injected(&inner)?;
        let row = inner
            .listings
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::NotFound)?;
        patch.apply(row);
        Ok(row.clone())
    }

    async fn delete_listing(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        injected(&inner)?;
        inner.listings.retain(|l| l.id != id);
        Ok(())
    }

    async fn list_messages(&self, query: &MessageQuery) -> Result<Page<Message>, StoreError> {
        let inner = self.inner.read().await;
        injected(&inner)?;
        let matching: Vec<Message> = newest_first(&inner.messages, |m| m.created_at)
            .into_iter()
            .filter(|m| query.listing_id.as_deref().map_or(true, |id| m.listing_id == id))
            .filter(|m| query.seller_email.as_deref().map_or(true, |e| m.seller_email == e))
            .collect();
        Ok(window(matching, query.page))
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Message, StoreError> {
        let mut inner = self.inner.write().await;
        injected(&inner)?;
        // Foreign key on listing_id, as the backend enforces it.
        if !inner.listings.iter().any(|l| l.id == message.listing_id) {
            return Err(StoreError::Api {
                status: 409,
                code: Some("23503".to_string()),
                message: "insert or update on table \"messages\" violates foreign key constraint"
                    .to_string(),
            });
        }
        let row = Message {
            id: uuid::Uuid::new_v4().to_string(),
            listing_id: message.listing_id.clone(),
            buyer_name: message.buyer_name.clone(),
            buyer_email: message.buyer_email.clone(),
            message: message.message.clone(),
            seller_email: message.seller_email.clone(),
            created_at: message.created_at,
        };
        inner.messages.push(row.clone());
        Ok(row)
    }

    async fn upload_object(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        injected(&inner)?;
        let key = (bucket.to_string(), name.to_string());
        if inner.objects.contains_key(&key) {
            return Err(StoreError::Api {
                status: 409,
                code: Some("Duplicate".to_string()),
                message: "The resource already exists".to_string(),
            });
        }
        inner.objects.insert(
            key,
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn remove_object(&self, bucket: &str, name: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        injected(&inner)?;
        inner.objects.remove(&(bucket.to_string(), name.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!("{}{}", self.public_base, public_object_path(bucket, name))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        injected(&*self.inner.read().await)
    }
}
