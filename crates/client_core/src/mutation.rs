use std::sync::Arc;

use chrono::NaiveDateTime;
use shared::{
    domain::{AppointmentId, AppointmentStatus, CompanyId, NOTES_MAX_CHARS},
    protocol::{Appointment, CreateAppointmentRequest, UpdateStatusRequest},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ClientResult, ValidationError},
    events::{ClientEvent, Notice},
    repository::AppointmentRepository,
    session::SessionGuard,
    store::AppointmentStore,
};

pub const CREATE_SUCCEEDED_MESSAGE: &str = "Your appointment was created successfully!";
pub const CREATE_FAILED_MESSAGE: &str = "The appointment could not be created. Please try again.";
pub const UPDATE_FAILED_MESSAGE: &str =
    "An error occurred while updating the status. Please try again.";
pub const DELETE_SUCCEEDED_MESSAGE: &str = "Appointment deleted successfully.";
pub const DELETE_FAILED_MESSAGE: &str =
    "An unexpected error occurred while deleting the appointment.";

/// Runs mutations against the repository and reconciles the store afterwards.
///
/// Nothing is applied locally. After a mutation the store is reloaded from
/// the service, with one deliberate asymmetry: a failed status update still
/// reloads (the write may have partly landed), a failed create or delete does
/// not. Authorization failures skip the reload and end the session instead.
pub struct MutationCoordinator {
    repository: Arc<dyn AppointmentRepository>,
    session: Arc<SessionGuard>,
    store: Arc<AppointmentStore>,
    pending_delete: Mutex<Option<AppointmentId>>,
    events: broadcast::Sender<ClientEvent>,
}

impl MutationCoordinator {
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        session: Arc<SessionGuard>,
        store: Arc<AppointmentStore>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            repository,
            session,
            store,
            pending_delete: Mutex::new(None),
            events,
        }
    }

    pub fn store(&self) -> &Arc<AppointmentStore> {
        &self.store
    }

    /// Delete currently in flight, if any.
    pub async fn pending_delete(&self) -> Option<AppointmentId> {
        self.pending_delete.lock().await.clone()
    }

    pub async fn create_appointment(
        &self,
        company_id: Option<&CompanyId>,
        date: Option<NaiveDateTime>,
        notes: &str,
    ) -> ClientResult<Appointment> {
        let request = build_create_request(company_id, date, notes)?;
        let token = self.session.require_session().await?;

        self.store.mark_stale().await;
        info!(company_id = %request.company_id, "mutation: creating appointment");
        let created = match self.repository.create_appointment(&token, &request).await {
            Ok(created) => created,
            Err(err) => {
                let err = self.session.classify(err).await;
                self.report_failure(&err, CREATE_FAILED_MESSAGE);
                return Err(err);
            }
        };

        info!(appointment_id = %created.id, "mutation: appointment created");
        self.notify(Notice::success(CREATE_SUCCEEDED_MESSAGE));
        self.reload_after("create").await;
        Ok(created)
    }

    pub async fn update_status(
        &self,
        appointment_id: &AppointmentId,
        label: &str,
    ) -> ClientResult<()> {
        let status = AppointmentStatus::from_label(label)
            .map_err(|_| ValidationError::UnknownStatus(label.to_string()))?;
        let token = self.session.require_session().await?;

        self.store.mark_stale().await;
        info!(
            appointment_id = %appointment_id,
            status = status.label(),
            ordinal = status.ordinal(),
            "mutation: updating status"
        );
        let request = UpdateStatusRequest::new(appointment_id.clone(), status);
        let result = self.repository.update_status(&token, &request).await;

        match result {
            Ok(()) => {
                self.reload_after("update_status").await;
                self.notify(Notice::success(format!(
                    "Appointment ({}...) status was updated to \"{}\".",
                    appointment_id.short(),
                    status.label()
                )));
                Ok(())
            }
            Err(err) => {
                let err = self.session.classify(err).await;
                if err.ends_session() {
                    return Err(err);
                }
                self.report_failure(&err, UPDATE_FAILED_MESSAGE);
                self.reload_after("update_status_failure").await;
                Err(err)
            }
        }
    }

    /// Issues the delete. Only reachable through the confirmation workflow.
    pub(crate) async fn delete_appointment(
        &self,
        appointment_id: &AppointmentId,
    ) -> ClientResult<()> {
        let token = self.session.require_session().await?;
        *self.pending_delete.lock().await = Some(appointment_id.clone());
        self.notify(Notice::in_progress(format!(
            "Deleting appointment ({}...)",
            appointment_id.short()
        )));

        let result = async {
            self.store.mark_stale().await;
            info!(appointment_id = %appointment_id, "mutation: deleting appointment");
            match self.repository.delete_appointment(&token, appointment_id).await {
                Ok(()) => {
                    self.reload_after("delete").await;
                    self.notify(Notice::success(DELETE_SUCCEEDED_MESSAGE));
                    Ok(())
                }
                Err(err) => {
                    let err = self.session.classify(err).await;
                    self.report_failure(&err, DELETE_FAILED_MESSAGE);
                    Err(err)
                }
            }
        }
        .await;

        self.pending_delete.lock().await.take();
        result
    }

    /// Reload failures are reported by the store itself and do not change the
    /// outcome of the mutation that triggered them.
    async fn reload_after(&self, operation: &'static str) {
        if let Err(err) = self.store.load().await {
            warn!(operation, "mutation: reload after mutation failed: {err}");
        }
    }

    fn report_failure(&self, err: &ClientError, fallback: &str) {
        if err.ends_session() {
            return;
        }
        warn!("mutation: failed: {err}");
        self.notify(Notice::error(err.user_message(fallback)));
    }

    fn notify(&self, notice: Notice) {
        let _ = self.events.send(ClientEvent::Notice(notice));
    }
}

fn build_create_request(
    company_id: Option<&CompanyId>,
    date: Option<NaiveDateTime>,
    notes: &str,
) -> Result<CreateAppointmentRequest, ValidationError> {
    let company_id = company_id.ok_or(ValidationError::MissingCompany)?;
    let date = date.ok_or(ValidationError::MissingDate)?;
    let notes = notes.trim();
    let len = notes.chars().count();
    if len > NOTES_MAX_CHARS {
        return Err(ValidationError::NotesTooLong { len });
    }
    Ok(CreateAppointmentRequest {
        company_id: company_id.clone(),
        date,
        notes: notes.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
