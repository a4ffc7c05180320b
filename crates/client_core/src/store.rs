use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{AppointmentId, CompanyId, Role},
    protocol::{Appointment, Company},
};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::{
    error::{ClientError, ClientResult, RepositoryError, ValidationError},
    events::{ClientEvent, Notice},
    repository::AppointmentRepository,
    session::{SessionGuard, SessionToken},
};

pub const LOAD_FAILED_MESSAGE: &str = "An unexpected error occurred while loading appointments.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub appointments: Vec<Appointment>,
    pub companies: Vec<Company>,
    /// Number of successful loads so far.
    pub revision: u64,
    /// Set once a mutation has been issued; cleared by the next good load.
    pub stale: bool,
}

impl StoreSnapshot {
    pub fn appointment(&self, id: &AppointmentId) -> Option<&Appointment> {
        self.appointments.iter().find(|appointment| &appointment.id == id)
    }

    pub fn company(&self, id: &CompanyId) -> Result<&Company, ValidationError> {
        self.companies
            .iter()
            .find(|company| &company.id == id)
            .ok_or_else(|| ValidationError::UnknownCompany(id.clone()))
    }

    pub fn appointments_by_date(&self) -> Vec<Appointment> {
        let mut sorted = self.appointments.clone();
        sorted.sort_by_key(|appointment| appointment.date);
        sorted
    }
}

/// Per-session cache of appointments and the company directory.
///
/// Contents are only ever replaced wholesale by [`AppointmentStore::load`].
/// Overlapping loads are not sequenced; whichever finishes last wins.
pub struct AppointmentStore {
    role: Role,
    repository: Arc<dyn AppointmentRepository>,
    session: Arc<SessionGuard>,
    inner: RwLock<StoreSnapshot>,
    events: broadcast::Sender<ClientEvent>,
}

impl AppointmentStore {
    pub fn new(
        role: Role,
        repository: Arc<dyn AppointmentRepository>,
        session: Arc<SessionGuard>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            role,
            repository,
            session,
            inner: RwLock::new(StoreSnapshot::default()),
            events,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn mark_stale(&self) {
        self.inner.write().await.stale = true;
    }

    /// Fetches appointments (and, for customers, companies) and replaces the
    /// cache. On failure the previous contents are kept.
    pub async fn load(&self) -> ClientResult<(Vec<Appointment>, Vec<Company>)> {
        let token = self.session.require_session().await?;
        let (appointments, companies) =
            futures::join!(self.repository.list_appointments(&token), self.fetch_companies(&token));

        let (appointments, companies) = match (appointments, companies) {
            (Ok(appointments), Ok(companies)) => (appointments, companies),
            (Err(appointments), Err(companies)) => {
                return Err(self.fail(prefer_authorization_failure(appointments, companies)).await);
            }
            (Err(err), Ok(_)) | (Ok(_), Err(err)) => return Err(self.fail(err).await),
        };

        let appointments = dedupe_by_id(appointments);
        let revision = {
            let mut guard = self.inner.write().await;
            guard.appointments = appointments.clone();
            guard.companies = companies.clone();
            guard.revision += 1;
            guard.stale = false;
            guard.revision
        };

        info!(
            revision,
            appointments = appointments.len(),
            companies = companies.len(),
            "store: reloaded"
        );
        let _ = self.events.send(ClientEvent::StoreReloaded {
            revision,
            appointments: appointments.len(),
            companies: companies.len(),
        });
        Ok((appointments, companies))
    }

    async fn fetch_companies(&self, token: &SessionToken) -> Result<Vec<Company>, RepositoryError> {
        if !self.role.loads_company_directory() {
            return Ok(Vec::new());
        }
        self.repository.list_companies(token).await
    }

    async fn fail(&self, err: RepositoryError) -> ClientError {
        let err = self.session.classify(err).await;
        if !err.ends_session() {
            warn!("store: load failed: {err}");
            let _ = self
                .events
                .send(ClientEvent::Notice(Notice::error(err.user_message(LOAD_FAILED_MESSAGE))));
        }
        err
    }
}

/// Both reads failed: an authorization failure wins so the expiry path runs.
fn prefer_authorization_failure(
    appointments: RepositoryError,
    companies: RepositoryError,
) -> RepositoryError {
    if companies.is_authorization_failure() && !appointments.is_authorization_failure() {
        companies
    } else {
        appointments
    }
}

fn dedupe_by_id(appointments: Vec<Appointment>) -> Vec<Appointment> {
    let mut last_index: HashMap<AppointmentId, usize> = HashMap::new();
    for (idx, appointment) in appointments.iter().enumerate() {
        last_index.insert(appointment.id.clone(), idx);
    }
    if last_index.len() == appointments.len() {
        return appointments;
    }
    warn!(
        returned = appointments.len(),
        unique = last_index.len(),
        "store: service returned duplicate appointment ids"
    );
    appointments
        .into_iter()
        .enumerate()
        .filter(|(idx, appointment)| last_index.get(&appointment.id) == Some(idx))
        .map(|(_, appointment)| appointment)
        .collect()
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
