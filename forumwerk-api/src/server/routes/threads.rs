use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Created, Json, Query},
    require_text,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use forumwerk_common::model::{
    Id,
    like::LikeOutcome,
    thread::{CreateThread, ThreadMarker, ThreadPatch, ThreadSort, ThreadView},
    user::{User, UserMarker},
};
use forumwerk_core::{ContentService, Missing, ServiceError};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_threads)
        .typed_post(create_thread)
        .typed_get(get_thread)
        .typed_put(update_thread)
        .typed_delete(delete_thread)
        .typed_post(toggle_like)
        .typed_get(get_likers)
        .typed_get(get_user_threads)
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ThreadsQuery {
    sort: Option<String>,
    q: Option<String>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/threads", rejection(ServerError))]
struct ThreadsPath();

async fn list_threads(
    ThreadsPath(): ThreadsPath,
    State(service): State<Arc<ContentService>>,
    Query(query): Query<ThreadsQuery>,
) -> Result<Json<Vec<ThreadView>>> {
    let sort = match query.sort.as_deref() {
        Some(sort) => sort.parse()?,
        None => ThreadSort::default(),
    };

    Ok(Json(service.list_threads(sort, query.q.as_deref()).await?))
}

async fn create_thread(
    ThreadsPath(): ThreadsPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
    Json(thread): Json<CreateThread>,
) -> Result<Created<ThreadView>> {
    require_text(&thread.title, "title")?;
    require_text(&thread.content, "content")?;

    Ok(Created(service.create_thread(user.user_id(), &thread).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/threads/{id}", rejection(ServerError))]
struct ThreadPath {
    id: Id<ThreadMarker>,
}

async fn get_thread(
    ThreadPath { id }: ThreadPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<ThreadView>> {
    Ok(Json(service.get_thread(id).await?))
}

async fn update_thread(
    ThreadPath { id }: ThreadPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
    Json(patch): Json<ThreadPatch>,
) -> Result<Json<ThreadView>> {
    user.require_author(thread_author(&service, id).await?)?;
    if let Some(title) = &patch.title {
        require_text(title, "title")?;
    }
    if let Some(content) = &patch.content {
        require_text(content, "content")?;
    }

    Ok(Json(service.update_thread(id, &patch).await?))
}

async fn delete_thread(
    ThreadPath { id }: ThreadPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    user.require_author_or_staff(thread_author(&service, id).await?)?;
    service.delete_thread(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/threads/{id}/like", rejection(ServerError))]
struct ThreadLikePath {
    id: Id<ThreadMarker>,
}

async fn toggle_like(
    ThreadLikePath { id }: ThreadLikePath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<Json<LikeOutcome<ThreadView>>> {
    Ok(Json(service.toggle_thread_like(user.user_id(), id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/threads/{id}/likes", rejection(ServerError))]
struct ThreadLikesPath {
    id: Id<ThreadMarker>,
}

async fn get_likers(
    ThreadLikesPath { id }: ThreadLikesPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(service.thread_likers(id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/threads", rejection(ServerError))]
struct UserThreadsPath {
    id: Id<UserMarker>,
}

async fn get_user_threads(
    UserThreadsPath { id }: UserThreadsPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<Vec<ThreadView>>> {
    Ok(Json(service.threads_by_user(id).await?))
}

async fn thread_author(service: &ContentService, id: Id<ThreadMarker>) -> Result<Id<UserMarker>> {
    let thread = service
        .store()
        .fetch_thread(id)
        .await?
        .ok_or(ServiceError::NotFound(Missing::Thread(id)))?;

    Ok(thread.author.id)
}
