//! Marketplace entities and the rules their inputs must satisfy.

pub mod image;
pub mod listing;
pub mod message;
pub mod page;
pub mod validate;

pub use image::{ImageUpload, StoredObject};
pub use listing::{
    Category, CategoryFilter, Listing, ListingChanges, ListingDraft, ListingPatch, NewListing,
    Price, PriceError,
};
pub use message::{Message, MessageDraft, NewMessage};
pub use page::{Page, PageRequest, Pagination};
