//! In-memory appointment service used across the unit tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use shared::{
    domain::{AppointmentId, AppointmentStatus, CompanyId, Role},
    protocol::{Appointment, Company, CreateAppointmentRequest, UpdateStatusRequest},
};
use tokio::{
    net::TcpListener,
    sync::{broadcast, Mutex, Notify, Semaphore},
};

use crate::{
    error::RepositoryError,
    events::ClientEvent,
    repository::AppointmentRepository,
    session::{RedirectDelays, SessionToken},
    AppointmentClient,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    ListAppointments,
    ListCompanies,
    Create(CreateAppointmentRequest),
    UpdateStatus(UpdateStatusRequest),
    Delete(AppointmentId),
}

#[derive(Default)]
struct Failures {
    list_appointments: Option<RepositoryError>,
    list_companies: Option<RepositoryError>,
    create: Option<RepositoryError>,
    update_status: Option<RepositoryError>,
    delete: Option<RepositoryError>,
}

/// Scripted repository: records every call, serves an in-memory list and
/// fails operations on demand. Failures stay armed until cleared.
#[derive(Default)]
pub struct FakeRepository {
    appointments: Mutex<Vec<Appointment>>,
    companies: Mutex<Vec<Company>>,
    calls: Mutex<Vec<RepoCall>>,
    failures: Mutex<Failures>,
    tokens_seen: Mutex<Vec<String>>,
    create_gate: Option<Arc<Semaphore>>,
    pub create_entered: Notify,
    delete_gate: Option<Arc<Semaphore>>,
    pub delete_entered: Notify,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create calls block until a permit is added to the returned semaphore.
    pub fn with_gated_create() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let repo = Self {
            create_gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (repo, gate)
    }

    /// Delete calls block until a permit is added to the returned semaphore.
    pub fn with_gated_delete() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let repo = Self {
            delete_gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (repo, gate)
    }

    pub async fn seed_appointments(&self, appointments: Vec<Appointment>) {
        *self.appointments.lock().await = appointments;
    }

    pub async fn seed_companies(&self, companies: Vec<Company>) {
        *self.companies.lock().await = companies;
    }

    pub async fn fail_list_appointments(&self, err: RepositoryError) {
        self.failures.lock().await.list_appointments = Some(err);
    }

    pub async fn fail_list_companies(&self, err: RepositoryError) {
        self.failures.lock().await.list_companies = Some(err);
    }

    pub async fn fail_create(&self, err: RepositoryError) {
        self.failures.lock().await.create = Some(err);
    }

    pub async fn fail_update_status(&self, err: RepositoryError) {
        self.failures.lock().await.update_status = Some(err);
    }

    pub async fn fail_delete(&self, err: RepositoryError) {
        self.failures.lock().await.delete = Some(err);
    }

    pub async fn calls(&self) -> Vec<RepoCall> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, matches: impl Fn(&RepoCall) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|call| matches(call)).count()
    }

    pub async fn list_appointment_calls(&self) -> usize {
        self.count(|call| matches!(call, RepoCall::ListAppointments))
            .await
    }

    pub async fn mutation_calls(&self) -> usize {
        self.count(|call| {
            matches!(
                call,
                RepoCall::Create(_) | RepoCall::UpdateStatus(_) | RepoCall::Delete(_)
            )
        })
        .await
    }

    pub async fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().await.clone()
    }

    async fn record(&self, token: &SessionToken, call: RepoCall) {
        self.tokens_seen.lock().await.push(token.expose().to_string());
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl AppointmentRepository for FakeRepository {
    async fn list_appointments(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        self.record(token, RepoCall::ListAppointments).await;
        if let Some(err) = self.failures.lock().await.list_appointments.clone() {
            return Err(err);
        }
        Ok(self.appointments.lock().await.clone())
    }

    async fn list_companies(&self, token: &SessionToken) -> Result<Vec<Company>, RepositoryError> {
        self.record(token, RepoCall::ListCompanies).await;
        if let Some(err) = self.failures.lock().await.list_companies.clone() {
            return Err(err);
        }
        Ok(self.companies.lock().await.clone())
    }

    async fn create_appointment(
        &self,
        token: &SessionToken,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, RepositoryError> {
        self.record(token, RepoCall::Create(request.clone())).await;
        self.create_entered.notify_one();
        if let Some(gate) = &self.create_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|err| RepositoryError::Transport(err.to_string()))?;
        }
        if let Some(err) = self.failures.lock().await.create.clone() {
            return Err(err);
        }

        let company_name = self
            .companies
            .lock()
            .await
            .iter()
            .find(|company| company.id == request.company_id)
            .map(|company| company.name.clone());
        let created = Appointment {
            id: AppointmentId::new(uuid::Uuid::new_v4().to_string()),
            date: request.date,
            notes: Some(request.notes.clone()).filter(|notes| !notes.is_empty()),
            status: AppointmentStatus::Pending,
            customer_full_name: Some("Ayşe Yılmaz".into()),
            company_name,
        };
        self.appointments.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update_status(
        &self,
        token: &SessionToken,
        request: &UpdateStatusRequest,
    ) -> Result<(), RepositoryError> {
        self.record(token, RepoCall::UpdateStatus(request.clone())).await;
        if let Some(err) = self.failures.lock().await.update_status.clone() {
            return Err(err);
        }
        let status = AppointmentStatus::from_ordinal(request.status)
            .map_err(|err| RepositoryError::Rejected {
                status: 400,
                message: Some(err.to_string()),
            })?;
        let mut appointments = self.appointments.lock().await;
        let Some(appointment) = appointments
            .iter_mut()
            .find(|appointment| appointment.id == request.appointment_id)
        else {
            return Err(RepositoryError::Rejected {
                status: 404,
                message: Some("Appointment not found".into()),
            });
        };
        appointment.status = status;
        Ok(())
    }

    async fn delete_appointment(
        &self,
        token: &SessionToken,
        appointment_id: &AppointmentId,
    ) -> Result<(), RepositoryError> {
        self.record(token, RepoCall::Delete(appointment_id.clone())).await;
        self.delete_entered.notify_one();
        if let Some(gate) = &self.delete_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|err| RepositoryError::Transport(err.to_string()))?;
        }
        if let Some(err) = self.failures.lock().await.delete.clone() {
            return Err(err);
        }
        self.appointments
            .lock()
            .await
            .retain(|appointment| &appointment.id != appointment_id);
        Ok(())
    }
}

pub const TEST_TOKEN: &str = "test-token";

pub fn test_delays() -> RedirectDelays {
    RedirectDelays {
        unauthenticated: Duration::from_millis(1500),
        expired: Duration::from_millis(2000),
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid test date")
}

pub fn appointment(id: &str, date: NaiveDateTime, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: AppointmentId::new(id),
        date,
        notes: None,
        status,
        customer_full_name: Some("Mehmet Demir".into()),
        company_name: Some("Acme Dental".into()),
    }
}

pub fn company(id: &str, name: &str) -> Company {
    Company {
        id: CompanyId::new(id),
        name: name.into(),
        address: "1 Main St".into(),
        phone_number: "555-0100".into(),
    }
}

pub fn rejected(message: &str) -> RepositoryError {
    RepositoryError::Rejected {
        status: 400,
        message: Some(message.into()),
    }
}

pub fn unauthorized() -> RepositoryError {
    RepositoryError::Unauthorized { status: 401 }
}

/// Client wired to `repo` with a live session.
pub async fn signed_in_client(role: Role, repo: &Arc<FakeRepository>) -> AppointmentClient {
    let client = signed_out_client(role, repo);
    client
        .session()
        .establish(SessionToken::new(TEST_TOKEN))
        .await;
    client
}

pub fn signed_out_client(role: Role, repo: &Arc<FakeRepository>) -> AppointmentClient {
    AppointmentClient::new_with_repository(
        role,
        Arc::clone(repo) as Arc<dyn AppointmentRepository>,
        test_delays(),
    )
}

/// Everything currently buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// One request as seen by [`MockService`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is json")
    }
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<HashMap<(Method, String), (StatusCode, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// HTTP stand-in for the appointment service. Unscripted routes answer
/// `200 null`.
pub struct MockService {
    pub url: String,
    state: MockState,
}

impl MockService {
    pub async fn spawn() -> Self {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        let state = MockState::default();
        let app = Router::new()
            .fallback(handle_any)
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub async fn reply(
        &self,
        method: Method,
        path: &str,
        status: StatusCode,
        body: impl Into<String>,
    ) {
        self.state
            .replies
            .lock()
            .await
            .insert((method, path.to_string()), (status, body.into()));
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().await.clone()
    }

    pub async fn only_request(&self) -> RecordedRequest {
        let requests = self.requests().await;
        assert_eq!(requests.len(), 1, "expected one request: {requests:?}");
        requests[0].clone()
    }
}

async fn handle_any(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    state.requests.lock().await.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });
    let (status, body) = state
        .replies
        .lock()
        .await
        .get(&(method, path))
        .cloned()
        .unwrap_or((StatusCode::OK, "null".to_string()));
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}
