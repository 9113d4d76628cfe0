//! Notification events emitted by the store.
//!
//! The store reports the outcome of every mutating operation as a
//! `Notification`; presenting it (toast, terminal line, log) is up to the
//! caller.

use crate::types::Id;
use serde::{Deserialize, Serialize};

/// Outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Operation a notification reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    LoopCreated,
    LoopUpdated,
    LoopDeleted,
    CheckInRecorded,
    CheerAdded,
    CheerRemoved,
    LoopCloned,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoopCreated => "LOOP_CREATED",
            Self::LoopUpdated => "LOOP_UPDATED",
            Self::LoopDeleted => "LOOP_DELETED",
            Self::CheckInRecorded => "CHECK_IN_RECORDED",
            Self::CheerAdded => "CHEER_ADDED",
            Self::CheerRemoved => "CHEER_REMOVED",
            Self::LoopCloned => "LOOP_CLONED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub event: NotificationEvent,
    /// Loop the operation targeted, when known.
    pub loop_id: Option<Id>,
    pub message: String,
}

impl Notification {
    pub fn success(event: NotificationEvent, loop_id: Option<Id>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            event,
            loop_id,
            message: message.into(),
        }
    }

    pub fn error(event: NotificationEvent, loop_id: Option<Id>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            event,
            loop_id,
            message: message.into(),
        }
    }

    pub fn loop_created(loop_id: &Id) -> Self {
        Self::success(
            NotificationEvent::LoopCreated,
            Some(loop_id.clone()),
            "Loop created successfully!",
        )
    }

    pub fn loop_updated(loop_id: &Id) -> Self {
        Self::success(
            NotificationEvent::LoopUpdated,
            Some(loop_id.clone()),
            "Loop updated successfully!",
        )
    }

    pub fn loop_deleted(loop_id: &Id) -> Self {
        Self::success(
            NotificationEvent::LoopDeleted,
            Some(loop_id.clone()),
            "Loop deleted successfully!",
        )
    }

    /// A completed check-in continues the streak; a miss is just recorded.
    pub fn check_in_recorded(loop_id: &Id, completed: bool) -> Self {
        let message = if completed {
            "Checked in successfully!"
        } else {
            "Check-in updated"
        };
        Self::success(NotificationEvent::CheckInRecorded, Some(loop_id.clone()), message)
    }

    pub fn cheer_toggled(loop_id: &Id, cheered: bool) -> Self {
        if cheered {
            Self::success(
                NotificationEvent::CheerAdded,
                Some(loop_id.clone()),
                "Cheered the loop!",
            )
        } else {
            Self::success(
                NotificationEvent::CheerRemoved,
                Some(loop_id.clone()),
                "Removed cheer from the loop!",
            )
        }
    }

    pub fn loop_cloned(clone_id: &Id) -> Self {
        Self::success(
            NotificationEvent::LoopCloned,
            Some(clone_id.clone()),
            "Loop cloned successfully!",
        )
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}
