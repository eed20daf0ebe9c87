use crate::{ContentService, error::Result};
use forumwerk_common::model::{
    Id,
    notification::NotificationKind,
    user::{Role, User, UserMarker},
};
use serde::Serialize;
use time::{OffsetDateTime, macros::format_description};
use tracing::{info, instrument};

/// The moderated user after the action, and the text sent to them if
/// anything changed.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct ModerationNotice {
    pub user: User,
    pub message: Option<String>,
}

impl ContentService {
    /// Grants or revokes a role. Setting the current role again is a no-op.
    #[instrument(skip(self))]
    pub async fn set_role(
        &self,
        actor: Id<UserMarker>,
        target: Id<UserMarker>,
        role: Role,
    ) -> Result<ModerationNotice> {
        let user = self.require_user(target).await?;
        if user.role == role {
            return Ok(ModerationNotice {
                user,
                message: None,
            });
        }

        let message = if role > user.role {
            format!("You were granted {role} privileges.")
        } else {
            format!("Your {} privileges have been revoked.", user.role)
        };

        let user = self.store.set_user_role(target, role).await?.unwrap_or(user);
        info!(%role, "Changed role");
        self.notify_moderated(actor, &user, &message).await;

        Ok(ModerationNotice {
            user,
            message: Some(message),
        })
    }

    #[instrument(skip(self))]
    pub async fn ban_user(
        &self,
        actor: Id<UserMarker>,
        target: Id<UserMarker>,
    ) -> Result<ModerationNotice> {
        let user = self.require_user(target).await?;
        if user.is_banned() {
            return Ok(ModerationNotice {
                user,
                message: None,
            });
        }

        let banned_at = OffsetDateTime::now_utc();
        let user = self
            .store
            .set_user_ban(target, Some(banned_at))
            .await?
            .unwrap_or(user);
        info!("Banned user");

        let message = format!("You were banned at {} UTC.", timestamp(banned_at));
        self.notify_moderated(actor, &user, &message).await;

        Ok(ModerationNotice {
            user,
            message: Some(message),
        })
    }

    #[instrument(skip(self))]
    pub async fn unban_user(
        &self,
        actor: Id<UserMarker>,
        target: Id<UserMarker>,
    ) -> Result<ModerationNotice> {
        let user = self.require_user(target).await?;
        if !user.is_banned() {
            return Ok(ModerationNotice {
                user,
                message: None,
            });
        }

        let user = self.store.set_user_ban(target, None).await?.unwrap_or(user);
        info!("Unbanned user");

        let message = format!(
            "You were unbanned at {} UTC.",
            timestamp(OffsetDateTime::now_utc())
        );
        self.notify_moderated(actor, &user, &message).await;

        Ok(ModerationNotice {
            user,
            message: Some(message),
        })
    }

    /// Sends `message` to every user except `actor`. Returns the number of
    /// notifications stored.
    #[instrument(skip(self, message))]
    pub async fn broadcast_alert(&self, actor: Id<UserMarker>, message: &str) -> Result<usize> {
        let users = self.store.list_users().await?;
        let mut sent = 0;

        for user in users.iter().filter(|user| user.id != actor) {
            if self
                .notifications
                .dispatch(user.id, actor, message, NotificationKind::SystemAlert, None)
                .await
                .is_some()
            {
                sent += 1;
            }
        }

        info!(sent, "Broadcast system alert");
        Ok(sent)
    }

    async fn notify_moderated(&self, actor: Id<UserMarker>, user: &User, message: &str) {
        if user.id != actor {
            self.notifications
                .dispatch(user.id, actor, message, NotificationKind::ModeratorAction, None)
                .await;
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
fn timestamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    at.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| at.to_string())
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Missing, ServiceError},
        service::{
            moderation::timestamp,
            testing::{inbox, service, user},
        },
    };
    use forumwerk_common::model::{Id, notification::NotificationKind, user::Role};
    use time::macros::datetime;

    #[test]
    fn timestamp_format() {
        assert_eq!(
            timestamp(datetime!(2026-03-04 05:06:07 +2)),
            "2026-03-04 03:06:07"
        );
    }

    #[tokio::test]
    async fn promotion_and_demotion() {
        let (service, store) = service();
        let admin = user(&store, "admin").await;
        let bob = user(&store, "bob").await;

        let promoted = service.set_role(admin.id, bob.id, Role::Moderator).await.unwrap();
        assert_eq!(promoted.user.role, Role::Moderator);
        assert_eq!(
            promoted.message.as_deref(),
            Some("You were granted moderator privileges.")
        );

        let unchanged = service.set_role(admin.id, bob.id, Role::Moderator).await.unwrap();
        assert_eq!(unchanged.message, None);

        let demoted = service.set_role(admin.id, bob.id, Role::Member).await.unwrap();
        assert_eq!(
            demoted.message.as_deref(),
            Some("Your moderator privileges have been revoked.")
        );

        let notifications = inbox(&store, &bob).await;
        assert_eq!(notifications.len(), 2);
        assert!(
            notifications
                .iter()
                .all(|notification| notification.kind == NotificationKind::ModeratorAction)
        );
    }

    #[tokio::test]
    async fn ban_round_trip() {
        let (service, store) = service();
        let admin = user(&store, "admin").await;
        let bob = user(&store, "bob").await;

        let banned = service.ban_user(admin.id, bob.id).await.unwrap();
        assert!(banned.user.is_banned());
        assert!(banned.message.unwrap().starts_with("You were banned at "));
        assert_eq!(service.ban_user(admin.id, bob.id).await.unwrap().message, None);

        let unbanned = service.unban_user(admin.id, bob.id).await.unwrap();
        assert!(!unbanned.user.is_banned());
        assert_eq!(inbox(&store, &bob).await.len(), 2);

        assert!(matches!(
            service.ban_user(admin.id, Id::from(7)).await,
            Err(ServiceError::NotFound(Missing::User(_)))
        ));
    }

    #[tokio::test]
    async fn self_moderation_is_silent() {
        let (service, store) = service();
        let admin = user(&store, "admin").await;

        service.set_role(admin.id, admin.id, Role::Admin).await.unwrap();

        assert!(inbox(&store, &admin).await.is_empty());
    }

    #[tokio::test]
    async fn alert_skips_sender() {
        let (service, store) = service();
        let admin = user(&store, "admin").await;
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;

        let sent = service.broadcast_alert(admin.id, "Maintenance at noon").await.unwrap();

        assert_eq!(sent, 2);
        assert!(inbox(&store, &admin).await.is_empty());
        for recipient in [&alice, &bob] {
            let notifications = inbox(&store, recipient).await;
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].kind, NotificationKind::SystemAlert);
            assert_eq!(notifications[0].message, "Maintenance at noon");
        }
    }
}
