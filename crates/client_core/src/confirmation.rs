//! Two-step guard in front of appointment deletion.

use shared::domain::AppointmentId;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::{error::ClientResult, events::ClientEvent, mutation::MutationCoordinator};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfirmationState {
    #[default]
    Idle,
    AwaitingConfirmation(AppointmentId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Confirm was pressed with no dialog open.
    NothingPending,
    Deleted(AppointmentId),
}

/// Delete confirmation dialog state. Methods take `&self` so a UI can keep
/// using the dialog while a confirmed delete is still running.
pub struct ConfirmationWorkflow {
    state: Mutex<ConfirmationState>,
    events: broadcast::Sender<ClientEvent>,
}

impl ConfirmationWorkflow {
    pub fn new(events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            state: Mutex::new(ConfirmationState::Idle),
            events,
        }
    }

    pub async fn state(&self) -> ConfirmationState {
        self.state.lock().await.clone()
    }

    /// Opens the dialog for `appointment_id`, replacing any target already
    /// awaiting confirmation.
    pub async fn request(&self, appointment_id: AppointmentId) {
        let _ = self.events.send(ClientEvent::NoticesCleared);
        debug!(appointment_id = %appointment_id, "confirmation: awaiting");
        *self.state.lock().await = ConfirmationState::AwaitingConfirmation(appointment_id);
    }

    pub async fn decline(&self) {
        *self.state.lock().await = ConfirmationState::Idle;
    }

    /// Closes the dialog and deletes the target. The workflow is back in
    /// `Idle` before the delete is issued.
    pub async fn confirm(
        &self,
        coordinator: &MutationCoordinator,
    ) -> ClientResult<ConfirmOutcome> {
        let taken = std::mem::take(&mut *self.state.lock().await);
        let ConfirmationState::AwaitingConfirmation(target) = taken else {
            return Ok(ConfirmOutcome::NothingPending);
        };
        coordinator.delete_appointment(&target).await?;
        Ok(ConfirmOutcome::Deleted(target))
    }
}

#[cfg(test)]
#[path = "tests/confirmation_tests.rs"]
mod tests;
