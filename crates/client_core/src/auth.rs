use reqwest::Client;
use shared::{
    domain::Role,
    protocol::{LoginRequest, LoginResponse, RegisterCustomerRequest},
};
use tracing::info;

use crate::{
    error::{ClientError, ClientResult, RepositoryError, ValidationError},
    repository::rejection,
    session::{SessionGuard, SessionToken},
};

pub const LOGIN_FAILED_MESSAGE: &str =
    "Sign-in failed: the server did not return a valid credential.";
pub const REGISTER_FAILED_MESSAGE: &str = "Registration failed. Please try again.";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CustomerRegistration {
    pub email: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
}

/// Sign-in and customer sign-up against `{server}/api/auth`.
pub struct AuthClient {
    http: Client,
    auth_base: String,
}

impl AuthClient {
    pub fn new(server_url: &str) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Self {
        Self {
            http,
            auth_base: format!("{}/api/auth", server_url.trim_end_matches('/')),
        }
    }

    /// Signs in and hands the issued token to `session`.
    pub async fn login(
        &self,
        credentials: &Credentials,
        session: &SessionGuard,
    ) -> ClientResult<SessionToken> {
        let email = credentials.email.trim();
        if email.is_empty() || credentials.password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let response = self
            .http
            .post(format!("{}/login", self.auth_base))
            .json(&LoginRequest {
                email: email.to_string(),
                password: credentials.password.clone(),
                requested_role: credentials.role.requested_role().to_string(),
            })
            .send()
            .await
            .map_err(RepositoryError::from)
            .map_err(remote)?;
        if !response.status().is_success() {
            return Err(remote(rejection(response).await));
        }
        let body: LoginResponse = response
            .json()
            .await
            .map_err(RepositoryError::from)
            .map_err(remote)?;

        let token = body
            .token
            .filter(|token| !token.trim().is_empty())
            .map(SessionToken::new)
            .ok_or_else(|| ClientError::Remote {
                message: Some(LOGIN_FAILED_MESSAGE.to_string()),
            })?;
        session.establish(token.clone()).await;
        info!(role = credentials.role.requested_role(), "auth: signed in");
        Ok(token)
    }

    pub async fn register_customer(&self, registration: &CustomerRegistration) -> ClientResult<()> {
        let request = RegisterCustomerRequest {
            email: registration.email.trim().to_string(),
            password: registration.password.clone(),
            firstname: registration.firstname.trim().to_string(),
            lastname: registration.lastname.trim().to_string(),
        };
        if request.email.is_empty()
            || request.password.is_empty()
            || request.firstname.is_empty()
            || request.lastname.is_empty()
        {
            return Err(ValidationError::MissingRegistrationFields.into());
        }

        let response = self
            .http
            .post(format!("{}/register/customer", self.auth_base))
            .json(&request)
            .send()
            .await
            .map_err(RepositoryError::from)
            .map_err(remote)?;
        if !response.status().is_success() {
            return Err(remote(rejection(response).await));
        }
        info!("auth: customer registered");
        Ok(())
    }
}

/// Auth endpoints have no session to expire, so every failure, 401 included,
/// is reported as an ordinary remote error.
fn remote(err: RepositoryError) -> ClientError {
    ClientError::Remote {
        message: err.service_message().map(str::to_string),
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
