//! Appointment creation flow: pick a company, fill the form, submit once.

use chrono::{Local, NaiveDateTime};
use shared::{
    domain::{parse_wire_date, truncate_to_minute, NOTES_MAX_CHARS},
    protocol::{Appointment, Company},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    error::{ClientError, ClientResult, ValidationError},
    mutation::{MutationCoordinator, CREATE_FAILED_MESSAGE},
};

/// Current local wall-clock time at the booking form's resolution.
pub fn local_now() -> NaiveDateTime {
    truncate_to_minute(Local::now().naive_local())
}

/// Reads a date typed by the user in any layout the service itself sends.
pub fn parse_booking_date(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    parse_wire_date(raw).ok_or_else(|| ValidationError::InvalidDate(raw.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    pub company: Company,
    pub date: Option<NaiveDateTime>,
    /// Earliest selectable date, fixed when the form was opened.
    pub min_date: NaiveDateTime,
    pub notes: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BookingState {
    #[default]
    Idle,
    Composing(BookingDraft),
    Submitting(BookingDraft),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Appointment),
    /// A submission is already outstanding; nothing was sent.
    AlreadySubmitting,
}

/// Booking form state. Methods take `&self` so a UI can share one instance
/// between its event handlers; the submit trigger is disabled while a
/// submission is outstanding.
#[derive(Default)]
pub struct BookingWorkflow {
    state: Mutex<BookingState>,
}

impl BookingWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> BookingState {
        self.state.lock().await.clone()
    }

    pub async fn is_submitting(&self) -> bool {
        matches!(*self.state.lock().await, BookingState::Submitting(_))
    }

    /// Opens the form for `company`, pre-filling the date with `now`.
    /// Ignored while a submission is outstanding.
    pub async fn open(&self, company: Company, now: NaiveDateTime) {
        let now = truncate_to_minute(now);
        let mut guard = self.state.lock().await;
        if matches!(*guard, BookingState::Submitting(_)) {
            debug!(company_id = %company.id, "booking: open ignored, already submitting");
            return;
        }
        debug!(company_id = %company.id, "booking: composing");
        *guard = BookingState::Composing(BookingDraft {
            company,
            date: Some(now),
            min_date: now,
            notes: String::new(),
            error: None,
        });
    }

    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        if matches!(*guard, BookingState::Composing(_)) {
            *guard = BookingState::Idle;
        }
    }

    pub async fn set_date(&self, date: Option<NaiveDateTime>) -> Result<(), ValidationError> {
        self.edit(|draft| {
            if let Some(date) = date {
                if date < draft.min_date {
                    return Err(ValidationError::DateBeforeMinimum {
                        date,
                        minimum: draft.min_date,
                    });
                }
            }
            draft.date = date;
            Ok(())
        })
        .await
    }

    pub async fn set_notes(&self, notes: &str) -> Result<(), ValidationError> {
        self.edit(|draft| {
            let len = notes.chars().count();
            if len > NOTES_MAX_CHARS {
                return Err(ValidationError::NotesTooLong { len });
            }
            draft.notes = notes.to_string();
            Ok(())
        })
        .await
    }

    async fn edit(
        &self,
        apply: impl FnOnce(&mut BookingDraft) -> Result<(), ValidationError>,
    ) -> Result<(), ValidationError> {
        let mut guard = self.state.lock().await;
        match &mut *guard {
            BookingState::Composing(draft) => apply(draft),
            _ => Err(ValidationError::NoBookingOpen),
        }
    }

    /// Submits the draft. On success the form closes; on failure it reopens
    /// with the inputs intact and the error attached, unless the failure
    /// ended the session.
    pub async fn submit(&self, coordinator: &MutationCoordinator) -> ClientResult<SubmitOutcome> {
        let draft = {
            let mut guard = self.state.lock().await;
            match std::mem::take(&mut *guard) {
                BookingState::Composing(mut draft) => {
                    draft.error = None;
                    *guard = BookingState::Submitting(draft.clone());
                    draft
                }
                BookingState::Submitting(draft) => {
                    *guard = BookingState::Submitting(draft);
                    debug!("booking: submit ignored, already submitting");
                    return Ok(SubmitOutcome::AlreadySubmitting);
                }
                BookingState::Idle => return Err(ValidationError::NoBookingOpen.into()),
            }
        };

        let result = match draft.date {
            Some(date) if date < draft.min_date => Err(ClientError::from(
                ValidationError::DateBeforeMinimum {
                    date,
                    minimum: draft.min_date,
                },
            )),
            date => {
                coordinator
                    .create_appointment(Some(&draft.company.id), date, &draft.notes)
                    .await
            }
        };

        let mut guard = self.state.lock().await;
        match result {
            Ok(created) => {
                info!(appointment_id = %created.id, "booking: closed after create");
                *guard = BookingState::Idle;
                Ok(SubmitOutcome::Created(created))
            }
            Err(err) if err.ends_session() => {
                *guard = BookingState::Idle;
                Err(err)
            }
            Err(err) => {
                *guard = BookingState::Composing(BookingDraft {
                    error: Some(err.user_message(CREATE_FAILED_MESSAGE)),
                    ..draft
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/booking_tests.rs"]
mod tests;
