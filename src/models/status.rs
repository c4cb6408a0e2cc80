use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetmeStatus {
    Pending,
    Approved,
    InProgress,
    Delayed,
    AwaitingReply,
    Rejected,
    Completed,
}

impl MeetmeStatus {
    pub const ALL: [MeetmeStatus; 7] = [
        MeetmeStatus::Pending,
        MeetmeStatus::Approved,
        MeetmeStatus::InProgress,
        MeetmeStatus::Delayed,
        MeetmeStatus::AwaitingReply,
        MeetmeStatus::Rejected,
        MeetmeStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MeetmeStatus::Pending => "pending",
            MeetmeStatus::Approved => "approved",
            MeetmeStatus::InProgress => "in_progress",
            MeetmeStatus::Delayed => "delayed",
            MeetmeStatus::AwaitingReply => "awaiting_reply",
            MeetmeStatus::Rejected => "rejected",
            MeetmeStatus::Completed => "completed",
        }
    }

    /// Open meetmes count against the one-open-meetme-per-user limit.
    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MeetmeStatus::Rejected | MeetmeStatus::Completed)
    }

    pub fn open_statuses() -> impl Iterator<Item = MeetmeStatus> {
        Self::ALL.into_iter().filter(|s| s.is_open())
    }

    pub fn accepts_user_reply(self) -> bool {
        self == MeetmeStatus::AwaitingReply
    }

    pub fn valid_values() -> String {
        Self::ALL.map(MeetmeStatus::as_str).join(", ")
    }
}

impl fmt::Display for MeetmeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status. Must be one of: {}",
            MeetmeStatus::valid_values()
        )
    }
}

impl FromStr for MeetmeStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Something that happened to a meetme and may move its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetmeEvent {
    Created,
    UserMessage,
    AdminMessage { explicit: Option<MeetmeStatus> },
    AdminSetStatus(MeetmeStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The owner may only reply while an answer is awaited.
    ReplyNotAwaited(MeetmeStatus),
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::ReplyNotAwaited(_) => f.write_str(
                "You can only send messages when the meetme status is \"Awaiting Reply\". Please wait for admin response.",
            ),
        }
    }
}

/// Status after `event` is applied to a meetme currently in `current`.
///
/// Admins may move a meetme anywhere; an admin reply without an explicit
/// status puts it in progress; a user reply is only valid while a reply is
/// awaited and leaves it there.
pub fn next_status(
    current: MeetmeStatus,
    event: MeetmeEvent,
) -> Result<MeetmeStatus, TransitionError> {
    match event {
        MeetmeEvent::Created => Ok(MeetmeStatus::Pending),
        MeetmeEvent::AdminSetStatus(status) => Ok(status),
        MeetmeEvent::AdminMessage { explicit } => Ok(explicit.unwrap_or(MeetmeStatus::InProgress)),
        MeetmeEvent::UserMessage if current.accepts_user_reply() => Ok(MeetmeStatus::AwaitingReply),
        MeetmeEvent::UserMessage => Err(TransitionError::ReplyNotAwaited(current)),
    }
}
