//! Handlers for the caller's notification inbox and live event stream.

use crate::api::common::{ApiResponse, HttpError, service_error_to_http};
use crate::auth::models::SessionUser;
use crate::database::models::{Notification, SendNotificationRequest};
use crate::services::notification_service::NotificationService;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[axum::debug_handler]
pub async fn send_notification(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Json(payload): Json<SendNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Notification>>), HttpError> {
    let notification = NotificationService::new(&state)
        .send(&session, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(notification, "Notification sent")),
    ))
}

/// The caller's notifications, newest first.
#[axum::debug_handler]
pub async fn list_notifications(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, HttpError> {
    let notifications = NotificationService::new(&state)
        .list(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        notifications,
        "Notifications retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn list_unread(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, HttpError> {
    let notifications = NotificationService::new(&state)
        .unread(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        notifications,
        "Unread notifications retrieved successfully",
    )))
}

#[axum::debug_handler]
pub async fn unread_count(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Value>>, HttpError> {
    let count = NotificationService::new(&state)
        .unread_count(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::ok(json!({ "unread_count": count }))))
}

#[axum::debug_handler]
pub async fn mark_read(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Notification>>, HttpError> {
    let notification = NotificationService::new(&state)
        .mark_read(&session, &id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        notification,
        "Notification marked as read",
    )))
}

#[axum::debug_handler]
pub async fn mark_all_read(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Result<Json<ApiResponse<Value>>, HttpError> {
    let updated = NotificationService::new(&state)
        .mark_all_read(&session)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(
        json!({ "updated": updated }),
        "All notifications marked as read",
    )))
}

/// Streams every notification addressed to the caller while the
/// connection stays open. Closing the connection drops the subscription,
/// which releases the caller's channel.
pub async fn stream_notifications(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<SessionUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = session.id().to_string();
    let mut subscription = state.notifications.open(&user_id).await;
    tracing::info!("Notification stream opened for user {}", user_id);

    let stream = async_stream::stream! {
        loop {
            match subscription.recv().await {
                Ok(notification) => {
                    match Event::default().event(notification.kind.clone()).json_data(&notification) {
                        Ok(event) => yield Ok(event),
                        Err(e) => tracing::error!("Failed to encode notification: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notification stream for {} skipped {} messages", user_id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
