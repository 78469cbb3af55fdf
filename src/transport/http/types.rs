use crate::app::marketplace::MarketplaceService;
use crate::domain::Pagination;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MarketplaceService>,
}

/// Envelope shared by every JSON response.
#[derive(Serialize, Deserialize, Debug, Default, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Elaborates on `error`; carries the raw store message for upstream failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl ApiResponse {
    pub fn ok(data: Option<JsonValue>) -> Self {
        Self {
            success: true,
            data,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details,
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingsQuery {
    /// Category name or slug; `all` disables the filter.
    pub category: Option<String>,
    /// Case-insensitive match against title or description.
    pub search: Option<String>,
    /// Page size (default 20, max 100).
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    pub listing_id: Option<String>,
    pub seller_email: Option<String>,
    /// Page size (default 50, max 100).
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteImageQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// Multipart body of an image upload.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CategoryInfo {
    pub name: &'static str,
    pub slug: String,
}
