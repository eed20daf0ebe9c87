use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Created, Json},
    require_text,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use forumwerk_common::model::{
    Id,
    forum::{CreateForum, Forum, ForumMarker, ForumPatch, ForumView},
    thread::ThreadView,
};
use forumwerk_core::ContentService;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_forums)
        .typed_post(create_forum)
        .typed_get(get_forum)
        .typed_put(update_forum)
        .typed_delete(delete_forum)
        .typed_get(get_forum_threads)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forums", rejection(ServerError))]
struct ForumsPath();

async fn list_forums(
    ForumsPath(): ForumsPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<Vec<ForumView>>> {
    Ok(Json(service.list_forums().await?))
}

async fn create_forum(
    ForumsPath(): ForumsPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
    Json(forum): Json<CreateForum>,
) -> Result<Created<Forum>> {
    user.require_admin()?;
    require_text(&forum.title, "title")?;

    Ok(Created(service.create_forum(&forum).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forums/{id}", rejection(ServerError))]
struct ForumPath {
    id: Id<ForumMarker>,
}

async fn get_forum(
    ForumPath { id }: ForumPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<ForumView>> {
    Ok(Json(service.get_forum(id).await?))
}

async fn update_forum(
    ForumPath { id }: ForumPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
    Json(patch): Json<ForumPatch>,
) -> Result<Json<Forum>> {
    user.require_admin()?;
    if let Some(title) = &patch.title {
        require_text(title, "title")?;
    }

    Ok(Json(service.update_forum(id, &patch).await?))
}

async fn delete_forum(
    ForumPath { id }: ForumPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    user.require_admin()?;
    service.delete_forum(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/forums/{id}/threads", rejection(ServerError))]
struct ForumThreadsPath {
    id: Id<ForumMarker>,
}

async fn get_forum_threads(
    ForumThreadsPath { id }: ForumThreadsPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<Vec<ThreadView>>> {
    Ok(Json(service.threads_by_forum(id).await?))
}
