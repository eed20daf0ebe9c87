use crate::model::{Id, user::UserMarker};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct NotificationMarker;

/// Wire-visible as the variant name.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
pub enum NotificationKind {
    Reply,
    Like,
    Mention,
    ModeratorAction,
    SystemAlert,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Reply => "Reply",
            NotificationKind::Like => "Like",
            NotificationKind::Mention => "Mention",
            NotificationKind::ModeratorAction => "ModeratorAction",
            NotificationKind::SystemAlert => "SystemAlert",
        }
    }
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown notification kind: {0}")]
pub struct UnknownNotificationKindError(String);

impl FromStr for NotificationKind {
    type Err = UnknownNotificationKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Reply" => Ok(NotificationKind::Reply),
            "Like" => Ok(NotificationKind::Like),
            "Mention" => Ok(NotificationKind::Mention),
            "ModeratorAction" => Ok(NotificationKind::ModeratorAction),
            "SystemAlert" => Ok(NotificationKind::SystemAlert),
            other => Err(UnknownNotificationKindError(other.to_owned())),
        }
    }
}

/// Created only as a side effect of another mutation. Only `is_read` changes afterwards.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Notification {
    pub id: Id<NotificationMarker>,
    pub recipient: Id<UserMarker>,
    pub sender: Id<UserMarker>,
    pub message: String,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct NewNotification {
    pub recipient: Id<UserMarker>,
    pub sender: Id<UserMarker>,
    pub message: String,
    pub kind: NotificationKind,
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use crate::model::notification::NotificationKind;

    #[test]
    fn wire_names() {
        for kind in [
            NotificationKind::Reply,
            NotificationKind::Like,
            NotificationKind::Mention,
            NotificationKind::ModeratorAction,
            NotificationKind::SystemAlert,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
    }
}
