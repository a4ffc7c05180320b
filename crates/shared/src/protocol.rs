use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{wire_date, AppointmentId, AppointmentStatus, CompanyId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(with = "wire_date")]
    pub date: NaiveDateTime,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAppointmentRequest {
    pub company_id: CompanyId,
    #[serde(with = "wire_date")]
    pub date: NaiveDateTime,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateStatusRequest {
    pub appointment_id: AppointmentId,
    /// Wire ordinal of the requested status.
    pub status: u8,
}

impl UpdateStatusRequest {
    pub fn new(appointment_id: AppointmentId, status: AppointmentStatus) -> Self {
        Self {
            appointment_id,
            status: status.ordinal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub requested_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, alias = "Token")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterCustomerRequest {
    pub email: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
}
