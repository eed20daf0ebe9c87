use crate::{
    ContentService,
    error::{Missing, Result},
};
use forumwerk_common::model::{
    Id,
    notification::{Notification, NotificationMarker},
    user::UserMarker,
};
use tracing::instrument;

impl ContentService {
    /// The inbox of `user`, newest first.
    #[instrument(skip(self))]
    pub async fn notifications_for(&self, user: Id<UserMarker>) -> Result<Vec<Notification>> {
        let mut notifications = self.store.list_notifications(user).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(notifications)
    }

    /// Notifications of other users are reported as missing.
    #[instrument(skip(self))]
    pub async fn notification(
        &self,
        id: Id<NotificationMarker>,
        user: Id<UserMarker>,
    ) -> Result<Notification> {
        match self.store.fetch_notification(id).await? {
            Some(notification) if notification.recipient == user => Ok(notification),
            _ => Err(Missing::Notification(id).into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn mark_notification_read(
        &self,
        id: Id<NotificationMarker>,
        user: Id<UserMarker>,
    ) -> Result<Notification> {
        let notification = self.notification(id, user).await?;
        if !notification.is_read && !self.store.mark_notification_read(id).await? {
            return Err(Missing::Notification(id).into());
        }

        Ok(Notification {
            is_read: true,
            ..notification
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_notification(
        &self,
        id: Id<NotificationMarker>,
        user: Id<UserMarker>,
    ) -> Result<()> {
        self.notification(id, user).await?;
        if self.store.delete_notification(id).await? {
            Ok(())
        } else {
            Err(Missing::Notification(id).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{Missing, ServiceError},
        service::testing::{service, user},
    };
    use forumwerk_common::model::notification::NotificationKind;

    #[tokio::test]
    async fn inbox_is_private_and_newest_first() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;

        let first = service
            .notifications()
            .notify(alice.id, bob.id, "first", NotificationKind::SystemAlert, None)
            .await
            .unwrap();
        let second = service
            .notifications()
            .notify(alice.id, bob.id, "second", NotificationKind::SystemAlert, None)
            .await
            .unwrap();

        let inbox = service.notifications_for(alice.id).await.unwrap();
        assert_eq!(
            inbox.iter().map(|notification| notification.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert!(service.notifications_for(bob.id).await.unwrap().is_empty());

        assert_eq!(service.notification(first.id, alice.id).await.unwrap(), first);
        assert!(matches!(
            service.notification(first.id, bob.id).await,
            Err(ServiceError::NotFound(Missing::Notification(id))) if id == first.id
        ));
    }

    #[tokio::test]
    async fn read_then_delete() {
        let (service, store) = service();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let notification = service
            .notifications()
            .notify(alice.id, bob.id, "hi", NotificationKind::Reply, Some("/threads/1".to_owned()))
            .await
            .unwrap();
        assert!(!notification.is_read);

        assert!(matches!(
            service.mark_notification_read(notification.id, bob.id).await,
            Err(ServiceError::NotFound(_))
        ));

        let read = service
            .mark_notification_read(notification.id, alice.id)
            .await
            .unwrap();
        assert!(read.is_read);
        assert_eq!(read.message, "hi");
        assert!(service.notification(notification.id, alice.id).await.unwrap().is_read);

        assert!(matches!(
            service.delete_notification(notification.id, bob.id).await,
            Err(ServiceError::NotFound(_))
        ));
        service.delete_notification(notification.id, alice.id).await.unwrap();
        assert!(service.notifications_for(alice.id).await.unwrap().is_empty());
    }
}
