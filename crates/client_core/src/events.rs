//! Event stream consumed by the presentation layer.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    InProgress,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn in_progress(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::InProgress,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// No token was held when an operation needed one.
    Unauthenticated,
    /// The service rejected the token (401/403).
    Expired,
    LoggedOut,
}

impl SessionEndReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Unauthenticated => "You need to sign in. Redirecting...",
            Self::Expired => {
                "Your session has expired or you are not authorized. Please sign in again."
            }
            Self::LoggedOut => "Signed out.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Notice(Notice),
    NoticesCleared,
    StoreReloaded {
        revision: u64,
        appointments: usize,
        companies: usize,
    },
    RedirectScheduled {
        reason: SessionEndReason,
        after: Duration,
    },
    NavigateToLogin {
        reason: SessionEndReason,
    },
}
