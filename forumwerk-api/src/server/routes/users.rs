use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, issue_token},
    extract::{Created, Json},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use forumwerk_common::{
    model::{
        Id,
        user::{CreateUser, User, UserMarker},
    },
    util::PositiveDuration,
};
use forumwerk_core::{ContentService, service::UserActivity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register_user)
        .typed_get(get_me)
        .typed_get(get_user)
        .typed_get(get_user_activity)
}

/// A new account together with its first bearer token.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Registration {
    pub user: User,
    pub token: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

async fn register_user(
    UsersPath(): UsersPath,
    State(service): State<Arc<ContentService>>,
    State(token_lifetime): State<Option<PositiveDuration>>,
    Json(user): Json<CreateUser>,
) -> Result<Created<Registration>> {
    let user = service.register_user(&user).await?;
    let token = issue_token(&service, user.id, token_lifetime).await?;

    Ok(Created(Registration {
        user,
        token: token.to_string(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me", rejection(ServerError))]
struct MePath();

async fn get_me(MePath(): MePath, user: AuthenticatedUser) -> Json<User> {
    Json(user.into_user())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<User>> {
    let user = service.get_user(id).await?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/activity", rejection(ServerError))]
struct UserActivityPath {
    id: Id<UserMarker>,
}

async fn get_user_activity(
    UserActivityPath { id }: UserActivityPath,
    State(service): State<Arc<ContentService>>,
) -> Result<Json<UserActivity>> {
    let activity = service.user_activity(id).await?;

    Ok(Json(activity))
}
