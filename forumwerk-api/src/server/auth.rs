use crate::server::{Result, ServerError};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use forumwerk_common::{
    model::{
        Id,
        auth::{AuthToken, Authentication},
        user::{Role, User, UserMarker},
    },
    util::PositiveDuration,
};
use forumwerk_core::ContentService;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The user behind a valid, unexpired bearer token. Banned users are
/// rejected during extraction.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    user: User,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.user.id
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn into_user(self) -> User {
        self.user
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.user.role == Role::Admin {
            Ok(())
        } else {
            Err(ServerError::Forbidden("admin role required"))
        }
    }

    /// Authors may edit their own content only.
    pub fn require_author(&self, author: Id<UserMarker>) -> Result<()> {
        if self.user.id == author {
            Ok(())
        } else {
            Err(ServerError::Forbidden("only the author may edit this"))
        }
    }

    /// Authors, moderators and admins may remove content.
    pub fn require_author_or_staff(&self, author: Id<UserMarker>) -> Result<()> {
        if self.user.id == author || self.user.role.is_staff() {
            Ok(())
        } else {
            Err(ServerError::Forbidden(
                "only the author or a moderator may remove this",
            ))
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<ContentService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;
        let service = Arc::<ContentService>::from_ref(state);

        let authentication = service
            .store()
            .fetch_authentication(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if authentication.user != request_token.user_id
            || authentication.is_expired_at(OffsetDateTime::now_utc())
        {
            return Err(ServerError::InvalidToken);
        }

        let user = service
            .store()
            .fetch_user(authentication.user)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if user.is_banned() {
            debug!(user = %user.id, "Rejecting banned user");
            return Err(ServerError::Banned);
        }

        Ok(Self { user })
    }
}

/// Creates a token for `user` and stores its hash. The returned token is
/// the only copy of the secret.
pub async fn issue_token(
    service: &ContentService,
    user: Id<UserMarker>,
    lifetime: Option<PositiveDuration>,
) -> Result<AuthToken> {
    let token = AuthToken::generate_random(user);
    let authentication = Authentication {
        user,
        token_hash: token.hash()?,
        created_at: OffsetDateTime::now_utc(),
        expires_after: lifetime,
    };

    service
        .store()
        .insert_authentication(&authentication)
        .await?;
    Ok(token)
}
