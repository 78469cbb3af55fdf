//! Buyer-to-seller messages about a listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Message {
    pub id: String,
    pub listing_id: String,
    #[serde(default)]
    pub buyer_name: Option<String>,
    pub buyer_email: String,
    pub message: String,
    pub seller_email: String,
    pub created_at: DateTime<Utc>,
}

/// Message input, before validation.
#[derive(Serialize, Deserialize, Debug, Clone, Default, ToSchema)]
pub struct MessageDraft {
    pub listing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub message: Option<String>,
    pub seller_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub listing_id: String,
    pub buyer_name: Option<String>,
    pub buyer_email: String,
    pub message: String,
    pub seller_email: String,
    pub created_at: DateTime<Utc>,
}

/// Stored body: the buyer's name, when given, is folded into the text.
pub fn compose_body(buyer_name: Option<&str>, message: &str) -> String {
    match buyer_name {
        Some(name) => format!("From: {}\n\n{}", name, message),
        None => message.to_string(),
    }
}
