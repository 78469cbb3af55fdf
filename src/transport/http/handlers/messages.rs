use crate::app::marketplace::ServiceError;
use crate::domain::MessageDraft;
use crate::transport::http::handlers::common::success_response;
use crate::transport::http::types::{ApiResponse, AppState, MessagesQuery};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/messages",
    params(MessagesQuery),
    responses(
        (status = 200, description = "Newest-first page of messages", body = ApiResponse),
        (status = 400, description = "Neither listing_id nor seller_email given", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn list_messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> impl IntoResponse {
    let result = state
        .service
        .list_messages(
            query.listing_id.as_deref(),
            query.seller_email.as_deref(),
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
    path = "/messages",
    request_body = MessageDraft,
    responses(
        (status = 201, description = "Message sent", body = ApiResponse),
        (status = 400, description = "Validation failed or seller email mismatch", body = ApiResponse),
        (status = 404, description = "Listing not found", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn send_message_handler(
    State(state): State<AppState>,
    request: Result<Json<MessageDraft>, JsonRejection>,
) -> impl IntoResponse {
    let Json(draft) = match request {
        Ok(v) => v,
        Err(e) => return ServiceError::InvalidJson(e.body_text()).into_response(),
    };
    match state.service.send_message(draft).await {
        Ok(message) => success_response(
            StatusCode::CREATED,
            &message,
            Some("Message sent successfully"),
            None,
        ),
        Err(e) => e.into_response(),
    }
}
