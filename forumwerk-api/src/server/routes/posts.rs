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
    like::LikeOutcome,
    post::{CreatePost, PostContent, PostMarker, PostView},
    user::{User, UserMarker},
};
use forumwerk_core::{ContentService, Missing, ServiceError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_post(reply_to_post)
        .typed_post(toggle_like)
        .typed_get(get_likers)
        .typed_get(get_like_count)
        .typed_get(get_user_posts)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct LikeCount {
    pub like_count: u64,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<Vec<PostView>>> {
    Ok(Json(service.list_posts().await?))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
    Json(post): Json<CreatePost>,
) -> Result<Created<PostView>> {
    require_text(&post.content, "content")?;

    Ok(Created(service.create_post(user.user_id(), &post).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<PostView>> {
    Ok(Json(service.get_post(id).await?))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
    Json(PostContent { content }): Json<PostContent>,
) -> Result<Json<PostView>> {
    user.require_author(post_author(&service, id).await?)?;
    require_text(&content, "content")?;

    Ok(Json(service.update_post(id, &content).await?))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    user.require_author_or_staff(post_author(&service, id).await?)?;
    service.delete_post(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/replies", rejection(ServerError))]
struct PostRepliesPath {
    id: Id<PostMarker>,
}

async fn reply_to_post(
    PostRepliesPath { id }: PostRepliesPath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
    Json(PostContent { content }): Json<PostContent>,
) -> Result<Created<PostView>> {
    require_text(&content, "content")?;

    Ok(Created(service.reply_to_post(user.user_id(), id, content).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct PostLikePath {
    id: Id<PostMarker>,
}

async fn toggle_like(
    PostLikePath { id }: PostLikePath,
    State(service): State<Arc<ContentService>>,
    user: AuthenticatedUser,
) -> Result<Json<LikeOutcome<PostView>>> {
    Ok(Json(service.toggle_post_like(user.user_id(), id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/likes", rejection(ServerError))]
struct PostLikesPath {
    id: Id<PostMarker>,
}

async fn get_likers(
    PostLikesPath { id }: PostLikesPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(service.post_likers(id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/likes/count", rejection(ServerError))]
struct PostLikeCountPath {
    id: Id<PostMarker>,
}

async fn get_like_count(
    PostLikeCountPath { id }: PostLikeCountPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<LikeCount>> {
    let like_count = service.post_like_count(id).await?;

    Ok(Json(LikeCount { like_count }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct UserPostsPath {
    id: Id<UserMarker>,
}

async fn get_user_posts(
    UserPostsPath { id }: UserPostsPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<Vec<PostView>>> {
    Ok(Json(service.posts_by_user(id).await?))
}

async fn post_author(service: &ContentService, id: Id<PostMarker>) -> Result<Id<UserMarker>> {
    let post = service
        .store()
        .fetch_post(id)
        .await?
        .ok_or(ServiceError::NotFound(Missing::Post(id)))?;

    Ok(post.author.id)
}
