use forumwerk_api::server::{ServerState, app};
use forumwerk_common::{
    model::user::{Role, UserHandle},
    snowflake::{ProcessId, WorkerId},
    store::StoreError,
    util::PositiveDuration,
};
use forumwerk_core::ContentService;
use forumwerk_db::{DbClient, DbError};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error accessing the store: {0}")]
    Store(#[from] StoreError),
    #[error("TOKEN_LIFETIME_HOURS must be positive, got {0}")]
    TokenLifetime(i64),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    #[serde(default)]
    worker_id: WorkerId,
    #[serde(default)]
    process_id: ProcessId,
    token_lifetime_hours: Option<i64>,
    /// Promoted to admin on startup if the account exists.
    bootstrap_admin: Option<UserHandle>,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forumwerk_api=debug,\
                forumwerk_core=debug,\
                forumwerk_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn bootstrap_admin(service: &ContentService, handle: &UserHandle) -> Result<(), InitError> {
    match service.store().fetch_user_by_handle(handle.get()).await? {
        Some(user) if user.role == Role::Admin => debug!(%handle, "Bootstrap admin already set up"),
        Some(user) => {
            service.store().set_user_role(user.id, Role::Admin).await?;
            info!(%handle, "Promoted bootstrap admin");
        }
        None => warn!(%handle, "Bootstrap admin has not registered yet"),
    }

    Ok(())
}

async fn cancel_on_ctrl_c(cancellation: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "Could not listen for ctrl-c");
        return;
    }

    info!("Shutting down");
    cancellation.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let token_lifetime = env
        .token_lifetime_hours
        .map(|hours| PositiveDuration::from_hours(hours).ok_or(InitError::TokenLifetime(hours)))
        .transpose()?;

    let db = DbClient::connect(&env.database_url, env.worker_id, env.process_id).await?;
    db.migrate().await?;
    info!("Database migrated");

    let service = Arc::new(ContentService::new(Arc::new(db)));
    if let Some(handle) = &env.bootstrap_admin {
        bootstrap_admin(&service, handle).await?;
    }

    let app = app(ServerState {
        service,
        token_lifetime,
    });

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let cancellation = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancellation.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(cancellation.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
