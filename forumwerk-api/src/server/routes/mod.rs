use crate::server::ServerRouter;
use axum::Router;

mod admin;
mod forums;
mod notifications;
mod posts;
mod threads;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(users::routes())
        .merge(forums::routes())
        .merge(threads::routes())
        .merge(posts::routes())
        .merge(notifications::routes())
        .merge(admin::routes())
}
