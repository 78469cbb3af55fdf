use crate::domain::{
    Category, Listing, ListingChanges, ListingDraft, Message, MessageDraft, Pagination,
    StoredObject,
};
use crate::transport::http::handlers::{common, health, listings, messages, upload};
use crate::transport::http::types::{ApiResponse, AppState, CategoryInfo, UploadForm};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Request body ceiling on the upload route. Sits above the image size limit so
/// oversized images reach validation and get a proper error.
pub const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        listings::list_listings_handler,
        listings::create_listing_handler,
        listings::get_listing_handler,
        listings::update_listing_handler,
        listings::delete_listing_handler,
        listings::list_categories_handler,
        messages::list_messages_handler,
        messages::send_message_handler,
        upload::upload_image_handler,
        upload::delete_image_handler
    ),
    components(schemas(
        ApiResponse,
        Pagination,
        Category,
        CategoryInfo,
        Listing,
        ListingDraft,
        ListingChanges,
        Message,
        MessageDraft,
        StoredObject,
        UploadForm
    ))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/categories", get(listings::list_categories_handler))
        .route(
            "/listings",
            get(listings::list_listings_handler).post(listings::create_listing_handler),
        )
        .route(
            "/listings/:id",
            get(listings::get_listing_handler)
                .put(listings::update_listing_handler)
                .delete(listings::delete_listing_handler),
        )
        .route(
            "/messages",
            get(messages::list_messages_handler).post(messages::send_message_handler),
        )
        .route(
            "/upload",
            post(upload::upload_image_handler)
                .delete(upload::delete_image_handler)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .layer(CatchPanicLayer::custom(common::handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
