//! The marketplace service.
//!
//! Sits between the HTTP handlers and the backend store. It is responsible for:
//! 1.  Validating and normalising listing, message and upload input.
//! 2.  Translating valid input into `Store` calls.
//! 3.  Telling "not found" apart from other store failures.
//!
//! It holds no state of its own; the store owns every record.

use crate::domain::image::{self, ImageUpload, StoredObject};
use crate::domain::listing::{normalize_search, DEFAULT_LOCATION};
use crate::domain::message::compose_body;
use crate::domain::page::{DEFAULT_LISTING_LIMIT, DEFAULT_MESSAGE_LIMIT};
use crate::domain::validate::{is_valid_email, missing_fields, normalize_email, present};
use crate::domain::{
    Category, CategoryFilter, Listing, ListingChanges, ListingDraft, ListingPatch, Message,
    MessageDraft, NewListing, NewMessage, PageRequest, Pagination, Price, PriceError,
};
use crate::storage::{ListingQuery, MessageQuery, Store, StoreError};
use chrono::Utc;
use std::sync::Arc;

pub const DEFAULT_BUCKET: &str = "images";

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Missing required fields")]
    MissingFields(Vec<&'static str>),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid buyer email format")]
    InvalidBuyerEmail,

    #[error("Invalid seller email format")]
    InvalidSellerEmail,

    #[error("{0}")]
    InvalidPrice(PriceError),

    #[error("Invalid category")]
    InvalidCategory(String),

    #[error("Deprecated field '{field}'")]
    DeprecatedField {
        field: &'static str,
        replacement: &'static str,
    },

    #[error("Invalid JSON in request body")]
    InvalidJson(String),

    #[error("Either listing_id or seller_email is required")]
    MissingMessageFilter,

    #[error("Listing not found")]
    ListingNotFound,

    #[error("Seller email does not match listing")]
    SellerMismatch,

    #[error("No file provided")]
    NoFile,

    #[error("Invalid file type")]
    InvalidFileType(String),

    #[error("File too large")]
    FileTooLarge,

    #[error("Invalid form data")]
    InvalidForm(String),

    #[error("fileName parameter is required")]
    MissingFileName,

    /// Upstream failure; `action` names what was being attempted.
    #[error("{action}")]
    Store {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    fn store(action: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
        move |source| {
            tracing::error!(error = %source, "{}", action);
            ServiceError::Store { action, source }
        }
    }

    /// Human-readable elaboration, where one helps the caller fix the request.
    pub fn details(&self) -> Option<String> {
        match self {
            ServiceError::MissingFields(fields) => {
                Some(format!("Required fields: {}", fields.join(", ")))
            }
            ServiceError::InvalidCategory(got) => Some(format!(
                "Unknown category '{}'. Allowed categories: {}",
                got,
                Category::names().join(", ")
            )),
            ServiceError::DeprecatedField { replacement, .. } => {
                Some(format!("Use '{}' instead", replacement))
            }
            ServiceError::InvalidJson(detail) | ServiceError::InvalidForm(detail) => {
                Some(detail.clone())
            }
            ServiceError::InvalidFileType(got) => Some(format!(
                "Got '{}'. Allowed types: {}",
                got,
                image::ALLOWED_IMAGE_TYPES.join(", ")
            )),
            ServiceError::FileTooLarge => Some(format!(
                "Maximum file size is {}MB",
                image::max_size_mb()
            )),
            ServiceError::Store { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }
}

pub struct ListedPage<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

pub struct MarketplaceService {
    store: Arc<dyn Store>,
    bucket: String,
}

impl MarketplaceService {
    pub fn new(store: Arc<dyn Store>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Newest-first page of listings, optionally filtered by category and search term.
    pub async fn list_listings(
        &self,
        category: Option<&str>,
        search: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<ListedPage<Listing>, ServiceError> {
        let filter = CategoryFilter::parse(category)
            .ok_or_else(|| ServiceError::InvalidCategory(category.unwrap_or_default().to_string()))?;
        let page = PageRequest::from_params(limit, offset, DEFAULT_LISTING_LIMIT);
        let query = ListingQuery {
            category: filter.category(),
            search: search.and_then(normalize_search),
            page,
        };
        let result = self
            .store
            .list_listings(&query)
            .await
            .map_err(ServiceError::store("Failed to fetch listings"))?;
        Ok(ListedPage {
            pagination: Pagination::new(result.total, page),
            items: result.items,
        })
    }

    pub async fn get_listing(&self, id: &str) -> Result<Listing, ServiceError> {
        self.store.get_listing(id).await.map_err(|e| {
            if e.is_not_found() {
                ServiceError::ListingNotFound
            } else {
                ServiceError::store("Failed to fetch listing")(e)
            }
        })
    }

    pub async fn create_listing(&self, draft: ListingDraft) -> Result<Listing, ServiceError> {
        if draft.legacy_email.is_some() {
            return Err(ServiceError::DeprecatedField {
                field: "email",
                replacement: "seller_email",
            });
        }

        let missing = missing_fields(&[
            ("title", &draft.title),
            ("price", &draft.price),
            ("seller_email", &draft.seller_email),
            ("category", &draft.category),
        ]);
        if !missing.is_empty() {
            return Err(ServiceError::MissingFields(missing));
        }
        let (Some(title), Some(price), Some(email), Some(category)) = (
            present(&draft.title),
            present(&draft.price),
            present(&draft.seller_email),
            present(&draft.category),
        ) else {
            return Err(ServiceError::MissingFields(vec![]));
        };

        if !is_valid_email(email) {
            return Err(ServiceError::InvalidEmail);
        }
        let price = Price::parse(price).map_err(ServiceError::InvalidPrice)?;
        let category = parse_category(category)?;

        let listing = NewListing {
            title: title.to_string(),
            price,
            seller_email: normalize_email(email),
            description: present(&draft.description).unwrap_or_default().to_string(),
            category,
            location: present(&draft.location).unwrap_or(DEFAULT_LOCATION).to_string(),
            image_url: present(&draft.image_url).map(str::to_string),
            created_at: Utc::now(),
        };

        let created = self
            .store
            .insert_listing(&listing)
            .await
            .map_err(ServiceError::store("Failed to create listing"))?;
        tracing::info!(listing_id = %created.id, "listing created");
        Ok(created)
    }

    /// Applies the allow-listed fields of `changes` to an existing listing.
    pub async fn update_listing(
        &self,
        id: &str,
        changes: ListingChanges,
    ) -> Result<Listing, ServiceError> {
        self.get_listing(id).await?;

        let price = match changes.price.as_deref() {
            Some(raw) => Some(Price::parse(raw).map_err(ServiceError::InvalidPrice)?),
            None => None,
        };
        let category = match changes.category.as_deref() {
            Some(raw) => Some(parse_category(raw)?),
            None => None,
        };
        let title = changes.title.map(|t| t.trim().to_string());
        if title.as_deref().is_some_and(str::is_empty) {
            return Err(ServiceError::MissingFields(vec!["title"]));
        }
        let location = changes.location.map(|l| match l.trim() {
            "" => DEFAULT_LOCATION.to_string(),
            trimmed => trimmed.to_string(),
        });
        let patch = ListingPatch {
            title,
            price,
            description: changes.description.map(|d| d.trim().to_string()),
            category,
            location,
            image_url: changes.image_url,
            updated_at: Some(Utc::now()),
        };

        self.store.update_listing(id, &patch).await.map_err(|e| {
            if e.is_not_found() {
                ServiceError::ListingNotFound
            } else {
                ServiceError::store("Failed to update listing")(e)
            }
        })
    }

    pub async fn delete_listing(&self, id: &str) -> Result<(), ServiceError> {
        self.store.delete_listing(id).await.map_err(|e| {
            if e.is_not_found() {
                ServiceError::ListingNotFound
            } else {
                ServiceError::store("Failed to delete listing")(e)
            }
        })?;
        tracing::info!(listing_id = %id, "listing deleted");
        Ok(())
    }

    pub async fn list_messages(
        &self,
        listing_id: Option<&str>,
        seller_email: Option<&str>,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<ListedPage<Message>, ServiceError> {
        let listing_id = listing_id.map(str::trim).filter(|v| !v.is_empty());
        let seller_email = seller_email.map(str::trim).filter(|v| !v.is_empty());
        if listing_id.is_none() && seller_email.is_none() {
            return Err(ServiceError::MissingMessageFilter);
        }

        let page = PageRequest::from_params(limit, offset, DEFAULT_MESSAGE_LIMIT);
        let query = MessageQuery {
            listing_id: listing_id.map(str::to_string),
            seller_email: seller_email.map(normalize_email),
            page,
        };
        let result = self
            .store
            .list_messages(&query)
            .await
            .map_err(ServiceError::store("Failed to fetch messages"))?;
        Ok(ListedPage {
            pagination: Pagination::new(result.total, page),
            items: result.items,
        })
    }

    /// Sends a buyer's message about a listing. The supplied seller email must be
    /// the one recorded on the listing.
    pub async fn send_message(&self, draft: MessageDraft) -> Result<Message, ServiceError> {
        let missing = missing_fields(&[
            ("listing_id", &draft.listing_id),
            ("buyer_email", &draft.buyer_email),
            ("message", &draft.message),
            ("seller_email", &draft.seller_email),
        ]);
        if !missing.is_empty() {
            return Err(ServiceError::MissingFields(missing));
        }
        let (Some(listing_id), Some(buyer_email), Some(text), Some(seller_email)) = (
            present(&draft.listing_id),
            present(&draft.buyer_email),
            present(&draft.message),
            present(&draft.seller_email),
        ) else {
            return Err(ServiceError::MissingFields(vec![]));
        };

        if !is_valid_email(buyer_email) {
            return Err(ServiceError::InvalidBuyerEmail);
        }
        if !is_valid_email(seller_email) {
            return Err(ServiceError::InvalidSellerEmail);
        }

        // Read-then-write: the listing's seller email is not locked between the check and the insert.
        let listing = self.get_listing(listing_id).await?;
        let seller_email = normalize_email(seller_email);
        if listing.seller_email != seller_email {
            tracing::warn!(listing_id = %listing.id, "seller email mismatch on message send");
            return Err(ServiceError::SellerMismatch);
        }

        let buyer_name = present(&draft.buyer_name).map(str::to_string);
        let message = NewMessage {
            listing_id: listing.id,
            message: compose_body(buyer_name.as_deref(), text),
            buyer_name,
            buyer_email: normalize_email(buyer_email),
            seller_email,
            created_at: Utc::now(),
        };

        let sent = self
            .store
            .insert_message(&message)
            .await
            .map_err(ServiceError::store("Failed to send message"))?;
        tracing::info!(message_id = %sent.id, listing_id = %sent.listing_id, "message sent");
        Ok(sent)
    }

    pub async fn upload_image(&self, upload: Option<ImageUpload>) -> Result<StoredObject, ServiceError> {
        let upload = upload.ok_or(ServiceError::NoFile)?;
        if !image::is_allowed_type(&upload.content_type) {
            return Err(ServiceError::InvalidFileType(upload.content_type));
        }
        if upload.bytes.len() > image::MAX_IMAGE_BYTES {
            return Err(ServiceError::FileTooLarge);
        }

        let file_name = image::object_name(&upload.file_name, Utc::now(), &mut rand::thread_rng());
        let size = upload.bytes.len() as u64;
        self.store
            .upload_object(&self.bucket, &file_name, upload.bytes, &upload.content_type)
            .await
            .map_err(ServiceError::store("Failed to upload file"))?;

        let url = self.store.public_url(&self.bucket, &file_name);
        tracing::info!(file_name = %file_name, size, "image uploaded");
        Ok(StoredObject {
            file_name,
            url,
            size,
            content_type: upload.content_type,
        })
    }

    pub async fn delete_image(&self, file_name: Option<&str>) -> Result<(), ServiceError> {
        let file_name = file_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ServiceError::MissingFileName)?;
        self.store
            .remove_object(&self.bucket, file_name)
            .await
            .map_err(ServiceError::store("Failed to delete file"))
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

fn parse_category(raw: &str) -> Result<Category, ServiceError> {
    Category::parse(raw).ok_or_else(|| ServiceError::InvalidCategory(raw.to_string()))
}
