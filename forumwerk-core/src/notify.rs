use forumwerk_common::{
    mention::scan_mentions,
    model::{
        Id,
        notification::{NewNotification, Notification, NotificationKind},
        post::PostMarker,
        thread::ThreadMarker,
        user::UserMarker,
    },
    store::{ContentStore, StoreError},
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Where a mention happened; decides the notification text and link.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MentionTarget {
    Post(Id<PostMarker>),
    Thread(Id<ThreadMarker>),
}

impl MentionTarget {
    #[must_use]
    pub fn url(self) -> String {
        match self {
            MentionTarget::Post(id) => format!("/posts/{id}"),
            MentionTarget::Thread(id) => format!("/threads/{id}"),
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            MentionTarget::Post(_) => "You were mentioned in a post.",
            MentionTarget::Thread(_) => "You were mentioned in a thread.",
        }
    }
}

/// Turns mutation side effects into stored notifications.
///
/// The dispatcher never compares recipient and sender. Every call site
/// checks that it is not notifying a user about their own action.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn ContentStore>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Persists one unread notification stamped with the current time.
    #[instrument(skip(self, message, url))]
    pub async fn notify(
        &self,
        recipient: Id<UserMarker>,
        sender: Id<UserMarker>,
        message: impl Into<String> + Send,
        kind: NotificationKind,
        url: Option<String>,
    ) -> Result<Notification, StoreError> {
        let notification = NewNotification {
            recipient,
            sender,
            message: message.into(),
            kind,
            url,
        };

        self.store.insert_notification(&notification).await
    }

    /// Like [`notify`](Self::notify), but a failure is logged and dropped.
    pub async fn dispatch(
        &self,
        recipient: Id<UserMarker>,
        sender: Id<UserMarker>,
        message: impl Into<String> + Send,
        kind: NotificationKind,
        url: Option<String>,
    ) -> Option<Notification> {
        match self.notify(recipient, sender, message, kind, url).await {
            Ok(notification) => Some(notification),
            Err(error) => {
                warn!(%error, %recipient, %kind, "Dropping notification");
                None
            }
        }
    }

    /// Notifies every distinct user mentioned in `text`, except `sender`.
    ///
    /// Unknown handles are skipped. Lookup and persistence failures are
    /// logged and skipped as well. Returns how many notifications were stored.
    #[instrument(skip(self, text))]
    pub async fn scan_and_notify_mentions(
        &self,
        text: &str,
        sender: Id<UserMarker>,
        target: MentionTarget,
    ) -> usize {
        let mut sent = 0;

        for handle in scan_mentions(text) {
            let user = match self.store.fetch_user_by_handle(handle).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    debug!(handle, "Mentioned handle does not exist");
                    continue;
                }
                Err(error) => {
                    warn!(%error, handle, "Could not resolve mention");
                    continue;
                }
            };

            if user.id == sender {
                continue;
            }

            if self
                .dispatch(
                    user.id,
                    sender,
                    target.message(),
                    NotificationKind::Mention,
                    Some(target.url()),
                )
                .await
                .is_some()
            {
                sent += 1;
            }
        }

        sent
    }
}
