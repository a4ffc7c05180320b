use std::sync::Arc;

use shared::domain::Role;
use tokio::sync::broadcast;

pub mod auth;
pub mod booking;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod events;
pub mod mutation;
pub mod repository;
pub mod session;
pub mod store;

pub use auth::{AuthClient, Credentials, CustomerRegistration};
pub use booking::{
    local_now, parse_booking_date, BookingDraft, BookingState, BookingWorkflow, SubmitOutcome,
};
pub use config::{load_settings, ClientSettings};
pub use confirmation::{ConfirmOutcome, ConfirmationState, ConfirmationWorkflow};
pub use error::{ClientError, ClientResult, RepositoryError, ValidationError};
pub use events::{ClientEvent, Notice, NoticeKind, SessionEndReason};
pub use mutation::MutationCoordinator;
pub use repository::{AppointmentRepository, HttpAppointmentRepository};
pub use session::{RedirectDelays, SessionGuard, SessionToken};
pub use store::{AppointmentStore, StoreSnapshot};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One signed-in dashboard: session, cache and mutation path wired to a
/// single repository and event stream.
pub struct AppointmentClient {
    role: Role,
    session: Arc<SessionGuard>,
    store: Arc<AppointmentStore>,
    coordinator: Arc<MutationCoordinator>,
    events: broadcast::Sender<ClientEvent>,
}

impl AppointmentClient {
    pub fn new(settings: &ClientSettings, role: Role) -> Self {
        Self::new_with_repository(
            role,
            Arc::new(HttpAppointmentRepository::new(&settings.server_url, role)),
            settings.redirect_delays(),
        )
    }

    pub fn new_with_repository(
        role: Role,
        repository: Arc<dyn AppointmentRepository>,
        delays: RedirectDelays,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let session = Arc::new(SessionGuard::new(delays, events.clone()));
        let store = Arc::new(AppointmentStore::new(
            role,
            Arc::clone(&repository),
            Arc::clone(&session),
            events.clone(),
        ));
        let coordinator = Arc::new(MutationCoordinator::new(
            repository,
            Arc::clone(&session),
            Arc::clone(&store),
            events.clone(),
        ));
        Self {
            role,
            session,
            store,
            coordinator,
            events,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn session(&self) -> &Arc<SessionGuard> {
        &self.session
    }

    pub fn store(&self) -> &Arc<AppointmentStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<MutationCoordinator> {
        &self.coordinator
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn confirmation_workflow(&self) -> ConfirmationWorkflow {
        ConfirmationWorkflow::new(self.events.clone())
    }

    pub fn booking_workflow(&self) -> BookingWorkflow {
        BookingWorkflow::new()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
