use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, extract::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use forumwerk_common::model::{
    Id,
    notification::{Notification, NotificationMarker},
};
use forumwerk_core::ContentService;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_notifications)
        .typed_get(get_notification)
        .typed_delete(delete_notification)
        .typed_post(mark_read)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications", rejection(ServerError))]
struct NotificationsPath();

async fn list_notifications(
    NotificationsPath(): NotificationsPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Notification>>> {
    Ok(Json(service.notifications_for(user.user_id()).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications/{id}", rejection(ServerError))]
struct NotificationPath {
    id: Id<NotificationMarker>,
}

async fn get_notification(
    NotificationPath { id }: NotificationPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<Json<Notification>> {
    Ok(Json(service.notification(id, user.user_id()).await?))
}

async fn delete_notification(
    NotificationPath { id }: NotificationPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    service.delete_notification(id, user.user_id()).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/notifications/{id}/read", rejection(ServerError))]
struct NotificationReadPath {
    id: Id<NotificationMarker>,
}

async fn mark_read(
    NotificationReadPath { id }: NotificationReadPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<Json<Notification>> {
    Ok(Json(service.mark_notification_read(id, user.user_id()).await?))
}
