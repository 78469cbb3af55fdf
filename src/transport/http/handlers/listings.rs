use crate::app::marketplace::ServiceError;
use crate::domain::{Category, Listing, ListingChanges, ListingDraft};
use crate::transport::http::handlers::common::{message_response, success_response};
use crate::transport::http::types::{ApiResponse, AppState, CategoryInfo, ListingsQuery};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/listings",
    params(ListingsQuery),
    responses(
        (status = 200, description = "Newest-first page of listings", body = ApiResponse),
        (status = 400, description = "Unknown category", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn list_listings_handler(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> impl IntoResponse {
    let result = state
        .service
        .list_listings(
            query.category.as_deref(),
            query.search.as_deref(),
            query.limit.as_deref(),
            query.offset.as_deref(),
        )
        .await;
    match result {
        Ok(page) => success_response(StatusCode::OK, &page.items, None, Some(page.pagination)),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/listings",
    request_body = ListingDraft,
    responses(
        (status = 201, description = "Listing created", body = ApiResponse),
        (status = 400, description = "Validation failed", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn create_listing_handler(
    State(state): State<AppState>,
    request: Result<Json<ListingDraft>, JsonRejection>,
) -> impl IntoResponse {
    let Json(draft) = match request {
        Ok(v) => v,
        Err(e) => return ServiceError::InvalidJson(e.body_text()).into_response(),
    };
    match state.service.create_listing(draft).await {
        Ok(listing) => success_response(
            StatusCode::CREATED,
            &listing,
            Some("Listing created successfully"),
            None,
        ),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "The listing", body = Listing),
        (status = 404, description = "Listing not found", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn get_listing_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.get_listing(&id).await {
        Ok(listing) => success_response(StatusCode::OK, &listing, None, None),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    request_body = ListingChanges,
    responses(
        (status = 200, description = "Listing updated", body = ApiResponse),
        (status = 400, description = "Invalid body", body = ApiResponse),
        (status = 404, description = "Listing not found", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn update_listing_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Result<Json<ListingChanges>, JsonRejection>,
) -> impl IntoResponse {
    let Json(changes) = match request {
        Ok(v) => v,
        Err(e) => return ServiceError::InvalidJson(e.body_text()).into_response(),
    };
    match state.service.update_listing(&id, changes).await {
        Ok(listing) => success_response(
            StatusCode::OK,
            &listing,
            Some("Listing updated successfully"),
            None,
        ),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(("id" = String, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing deleted (also when it did not exist)", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn delete_listing_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.delete_listing(&id).await {
        Ok(()) => message_response(StatusCode::OK, "Listing deleted successfully"),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Every category with its slug", body = ApiResponse))
)]
pub async fn list_categories_handler() -> impl IntoResponse {
    let categories: Vec<CategoryInfo> = Category::ALL
        .iter()
        .map(|c| CategoryInfo {
            name: c.name(),
            slug: c.slug(),
        })
        .collect();
    success_response(StatusCode::OK, &categories, None, None)
}
