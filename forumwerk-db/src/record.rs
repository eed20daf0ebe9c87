use forumwerk_common::model::{
    Id, ModelValidationError,
    auth::Authentication,
    forum::Forum,
    notification::Notification,
    post::Post,
    thread::Thread,
    user::{User, UserHandle},
};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub handle: String,
    pub role: String,
    pub banned_at: Option<OffsetDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct ForumRecord {
    pub forum_snowflake: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
}

/// A thread joined with its author.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FullThreadRecord {
    pub thread_snowflake: i64,
    pub forum_snowflake: i64,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub author: UserRecord,
}

/// A post joined with its author.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_snowflake: i64,
    pub thread_snowflake: i64,
    pub parent_snowflake: Option<i64>,
    pub content: String,
    pub created_at: OffsetDateTime,
    #[sqlx(flatten)]
    pub author: UserRecord,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct LikeCountRecord {
    pub target_snowflake: i64,
    pub like_count: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct NotificationRecord {
    pub notification_snowflake: i64,
    pub recipient_snowflake: i64,
    pub sender_snowflake: i64,
    pub message: String,
    pub url: Option<String>,
    pub kind: String,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_i64(value.user_snowflake),
            handle: UserHandle::new(value.handle)?,
            role: value.role.parse()?,
            banned_at: value.banned_at,
        })
    }
}

impl From<ForumRecord> for Forum {
    fn from(value: ForumRecord) -> Self {
        Self {
            id: Id::from_i64(value.forum_snowflake),
            title: value.title,
            description: value.description,
            image_url: value.image_url,
            created_at: value.created_at,
        }
    }
}

impl TryFrom<FullThreadRecord> for Thread {
    type Error = ModelValidationError;

    fn try_from(value: FullThreadRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_i64(value.thread_snowflake),
            forum: Id::from_i64(value.forum_snowflake),
            author: value.author.try_into()?,
            title: value.title,
            content: value.content,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_i64(value.post_snowflake),
            thread: Id::from_i64(value.thread_snowflake),
            parent: value.parent_snowflake.map(Id::from_i64),
            author: value.author.try_into()?,
            content: value.content,
            created_at: value.created_at,
        })
    }
}

impl<Marker> From<LikeCountRecord> for (Id<Marker>, u64) {
    fn from(value: LikeCountRecord) -> Self {
        (
            Id::from_i64(value.target_snowflake),
            value.like_count.try_into().unwrap_or(0),
        )
    }
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = ModelValidationError;

    fn try_from(value: NotificationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_i64(value.notification_snowflake),
            recipient: Id::from_i64(value.recipient_snowflake),
            sender: Id::from_i64(value.sender_snowflake),
            message: value.message,
            url: value.url,
            kind: value.kind.parse()?,
            is_read: value.is_read,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_i64(value.user_snowflake),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{
        AuthenticationRecord, FullPostRecord, LikeCountRecord, NotificationRecord, UserRecord,
    };
    use forumwerk_common::model::{
        Id, ModelValidationError,
        auth::{AUTH_TOKEN_HASH_LEN, Authentication},
        notification::{Notification, NotificationKind},
        post::{Post, PostMarker},
        user::{Role, User},
    };
    use time::macros::datetime;

    fn user_record(handle: &str, role: &str) -> UserRecord {
        UserRecord {
            user_snowflake: 7,
            handle: handle.to_owned(),
            role: role.to_owned(),
            banned_at: None,
        }
    }

    #[test]
    fn user_roles() {
        let user = User::try_from(user_record("alice", "moderator")).unwrap();
        assert_eq!(user.id, Id::from(7));
        assert_eq!(user.role, Role::Moderator);

        assert!(matches!(
            User::try_from(user_record("alice", "owner")),
            Err(ModelValidationError::Role(_))
        ));
        assert!(matches!(
            User::try_from(user_record("not a handle", "member")),
            Err(ModelValidationError::UserHandle(_))
        ));
    }

    #[test]
    fn post_with_parent() {
        let post = Post::try_from(FullPostRecord {
            post_snowflake: 3,
            thread_snowflake: 2,
            parent_snowflake: Some(1),
            content: "hello".to_owned(),
            created_at: datetime!(2026-01-01 00:00 UTC),
            author: user_record("bob", "member"),
        })
        .unwrap();

        assert_eq!(post.parent, Some(Id::from(1)));
        assert_eq!(post.thread, Id::from(2));
        assert_eq!(post.author.handle.get(), "bob");
    }

    #[test]
    fn notification_kinds() {
        let record = NotificationRecord {
            notification_snowflake: 1,
            recipient_snowflake: 2,
            sender_snowflake: 3,
            message: "Your post was liked!".to_owned(),
            url: Some("/posts/4".to_owned()),
            kind: "Like".to_owned(),
            is_read: false,
            created_at: datetime!(2026-01-01 00:00 UTC),
        };

        let notification = Notification::try_from(record.clone()).unwrap();
        assert_eq!(notification.kind, NotificationKind::Like);

        assert!(matches!(
            Notification::try_from(NotificationRecord {
                kind: "Poke".to_owned(),
                ..record
            }),
            Err(ModelValidationError::NotificationKind(_))
        ));
    }

    #[test]
    fn authentication_lifetime() {
        let record = AuthenticationRecord {
            user_snowflake: 1,
            token_hash: vec![0; AUTH_TOKEN_HASH_LEN],
            created_at: datetime!(2026-01-01 00:00 UTC),
            expires_after_seconds: Some(3600),
        };

        let authentication = Authentication::try_from(record.clone()).unwrap();
        assert_eq!(
            authentication.expires_after.map(|lifetime| lifetime.whole_seconds()),
            Some(3600)
        );

        assert!(matches!(
            Authentication::try_from(AuthenticationRecord {
                expires_after_seconds: Some(0),
                ..record.clone()
            }),
            Err(ModelValidationError::NonPositiveDuration(_))
        ));
        assert!(matches!(
            Authentication::try_from(AuthenticationRecord {
                token_hash: vec![0; 3],
                ..record
            }),
            Err(ModelValidationError::TokenHash(_))
        ));
    }

    #[test]
    fn negative_counts_clamp() {
        let (id, count): (Id<PostMarker>, u64) = LikeCountRecord {
            target_snowflake: 5,
            like_count: -1,
        }
        .into();

        assert_eq!(id, Id::from(5));
        assert_eq!(count, 0);
    }
}
