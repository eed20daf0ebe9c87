use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedUser, extract::Json, require_text,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use forumwerk_common::model::{
    Id,
    user::{Role, UserMarker},
};
use forumwerk_core::{ContentService, service::ModerationNotice};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_put(set_role)
        .typed_post(ban_user)
        .typed_post(unban_user)
        .typed_post(broadcast_alert)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct AlertReceipt {
    pub sent: usize,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users/{id}/role", rejection(ServerError))]
struct RolePath {
    id: Id<UserMarker>,
}

async fn set_role(
    RolePath { id }: RolePath,
    State(service): State<Arc<ContentService>>,
    admin: AuthenticatedUser,
    Json(RoleChange { role }): Json<RoleChange>,
) -> Result<Json<ModerationNotice>> {
    admin.require_admin()?;

    Ok(Json(service.set_role(admin.user_id(), id, role).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users/{id}/ban", rejection(ServerError))]
struct BanPath {
    id: Id<UserMarker>,
}

async fn ban_user(
    BanPath { id }: BanPath,
    State(service): State<Arc<ContentService>>,
    admin: AuthenticatedUser,
) -> Result<Json<ModerationNotice>> {
    admin.require_admin()?;

    Ok(Json(service.ban_user(admin.user_id(), id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/users/{id}/unban", rejection(ServerError))]
struct UnbanPath {
    id: Id<UserMarker>,
}

async fn unban_user(
    UnbanPath { id }: UnbanPath,
    State(service): State<Arc<ContentService>>,
    admin: AuthenticatedUser,
) -> Result<Json<ModerationNotice>> {
    admin.require_admin()?;

    Ok(Json(service.unban_user(admin.user_id(), id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/admin/alerts", rejection(ServerError))]
struct AlertsPath();

async fn broadcast_alert(
    AlertsPath(): AlertsPath,
    State(service): State<Arc<ContentService>>,
    admin: AuthenticatedUser,
    Json(Alert { message }): Json<Alert>,
) -> Result<Json<AlertReceipt>> {
    admin.require_admin()?;
    require_text(&message, "message")?;

    let sent = service.broadcast_alert(admin.user_id(), &message).await?;
    Ok(Json(AlertReceipt { sent }))
}
