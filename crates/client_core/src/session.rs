use std::{fmt, time::Duration};

use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::{
    error::{ClientError, RepositoryError},
    events::{ClientEvent, SessionEndReason},
};

/// Bearer token for the appointment service.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

impl Drop for SessionToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectDelays {
    pub unauthenticated: Duration,
    pub expired: Duration,
}

impl Default for RedirectDelays {
    fn default() -> Self {
        Self {
            unauthenticated: Duration::from_millis(1500),
            expired: Duration::from_millis(2000),
        }
    }
}

/// Owns the session token and gates every repository call on it.
///
/// The guard never retries. When it refuses an operation it schedules the
/// login redirect itself: `RedirectScheduled` goes out at once so the UI can
/// show why, and `NavigateToLogin` follows after the configured delay.
pub struct SessionGuard {
    token: RwLock<Option<SessionToken>>,
    delays: RedirectDelays,
    events: broadcast::Sender<ClientEvent>,
}

impl SessionGuard {
    pub fn new(delays: RedirectDelays, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            token: RwLock::new(None),
            delays,
            events,
        }
    }

    pub async fn establish(&self, token: SessionToken) {
        *self.token.write().await = Some(token);
        info!("session: token established");
    }

    pub async fn is_active(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn require_session(&self) -> Result<SessionToken, ClientError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        warn!("session: operation refused, no token held");
        self.schedule_redirect(SessionEndReason::Unauthenticated, self.delays.unauthenticated);
        Err(ClientError::Unauthenticated)
    }

    /// Clears the token after the service rejected it.
    pub async fn expire(&self) -> ClientError {
        let previous = self.token.write().await.take();
        warn!(had_token = previous.is_some(), "session: token rejected, clearing");
        self.schedule_redirect(SessionEndReason::Expired, self.delays.expired);
        ClientError::SessionExpired
    }

    pub async fn logout(&self) {
        self.token.write().await.take();
        info!("session: logged out");
        let _ = self.events.send(ClientEvent::NavigateToLogin {
            reason: SessionEndReason::LoggedOut,
        });
    }

    /// Maps a repository failure into the client taxonomy, taking the expiry
    /// path for authorization failures.
    pub async fn classify(&self, err: RepositoryError) -> ClientError {
        if err.is_authorization_failure() {
            return self.expire().await;
        }
        ClientError::from(err)
    }

    fn schedule_redirect(&self, reason: SessionEndReason, after: Duration) {
        let _ = self
            .events
            .send(ClientEvent::RedirectScheduled { reason, after });
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(ClientEvent::NavigateToLogin { reason });
        });
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
