use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{AppointmentId, Role},
    error::ErrorEnvelope,
    protocol::{Appointment, Company, CreateAppointmentRequest, UpdateStatusRequest},
};
use tracing::{debug, warn};

use crate::{error::RepositoryError, session::SessionToken};

/// Remote appointment service as seen by the core.
///
/// Every call takes the session token explicitly; implementations hold no
/// credentials of their own.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn list_appointments(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<Appointment>, RepositoryError>;
    async fn list_companies(&self, token: &SessionToken) -> Result<Vec<Company>, RepositoryError>;
    async fn create_appointment(
        &self,
        token: &SessionToken,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, RepositoryError>;
    async fn update_status(
        &self,
        token: &SessionToken,
        request: &UpdateStatusRequest,
    ) -> Result<(), RepositoryError>;
    async fn delete_appointment(
        &self,
        token: &SessionToken,
        appointment_id: &AppointmentId,
    ) -> Result<(), RepositoryError>;
}

pub struct HttpAppointmentRepository {
    http: Client,
    api_base: String,
}

impl HttpAppointmentRepository {
    pub fn new(server_url: &str, role: Role) -> Self {
        Self::with_client(Client::new(), server_url, role)
    }

    pub fn with_client(http: Client, server_url: &str, role: Role) -> Self {
        Self {
            http,
            api_base: format!(
                "{}/api/{}",
                server_url.trim_end_matches('/'),
                role.api_scope()
            ),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn send(
        &self,
        request: RequestBuilder,
        token: &SessionToken,
    ) -> Result<Response, RepositoryError> {
        let response = request.bearer_auth(token.expose()).send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SessionToken,
    ) -> Result<T, RepositoryError> {
        let response = self
            .send(self.http.get(format!("{}/{path}", self.api_base)), token)
            .await?;
        Ok(response.json().await?)
    }
}

/// Maps 401/403 to authorization failures and any other non-success status to
/// a rejection carrying the service's envelope message.
pub(crate) async fn check_status(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!(status = status.as_u16(), "appointment service refused credentials");
        return Err(RepositoryError::Unauthorized {
            status: status.as_u16(),
        });
    }
    if status.is_success() {
        return Ok(response);
    }
    Err(rejection(response).await)
}

/// Reads the error envelope out of a failed response.
pub(crate) async fn rejection(response: Response) -> RepositoryError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = ErrorEnvelope::from_body(&body);
    debug!(status, ?message, "appointment service rejected request");
    RepositoryError::Rejected { status, message }
}

#[async_trait]
impl AppointmentRepository for HttpAppointmentRepository {
    async fn list_appointments(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        self.get_json("appointments", token).await
    }

    async fn list_companies(&self, token: &SessionToken) -> Result<Vec<Company>, RepositoryError> {
        self.get_json("companies", token).await
    }

    async fn create_appointment(
        &self,
        token: &SessionToken,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, RepositoryError> {
        let response = self
            .send(
                self.http
                    .post(format!("{}/appointments", self.api_base))
                    .json(request),
                token,
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn update_status(
        &self,
        token: &SessionToken,
        request: &UpdateStatusRequest,
    ) -> Result<(), RepositoryError> {
        self.send(
            self.http
                .put(format!("{}/appointments/update", self.api_base))
                .json(request),
            token,
        )
        .await?;
        Ok(())
    }

    async fn delete_appointment(
        &self,
        token: &SessionToken,
        appointment_id: &AppointmentId,
    ) -> Result<(), RepositoryError> {
        self.send(
            self.http.delete(format!(
                "{}/appointments/delete/{}",
                self.api_base,
                appointment_id.as_str()
            )),
            token,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/repository_tests.rs"]
mod tests;
