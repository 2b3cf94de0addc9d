// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::services::slots::SlotTime;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: SlotTime,
        status: AppointmentStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            date,
            time,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            doctor_id: self.doctor_id,
            date: self.date,
            time: self.time,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Status of an appointment.
///
/// `Completed` is part of the persisted vocabulary but nothing in this
/// service moves an appointment into it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Active appointments occupy their slot.
    pub fn is_active(&self) -> bool {
        Self::active_statuses().contains(self)
    }

    pub fn active_statuses() -> [AppointmentStatus; 2] {
        [AppointmentStatus::Pending, AppointmentStatus::Confirmed]
    }

    pub fn all() -> [AppointmentStatus; 4] {
        [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ]
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "Pending"),
            AppointmentStatus::Confirmed => write!(f, "Confirmed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// One bookable window: a doctor's time on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.doctor_id, self.date, self.time)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Body of `POST /appointments`. Fields are optional on the wire so that a
/// missing value is reported as a validation error rather than a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl BookAppointmentRequest {
    pub fn new(doctor_id: Uuid, date: &str, time: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            date: Some(date.to_string()),
            time: Some(time.to_string()),
        }
    }
}

/// Query string of the slot lookups: `?doctorId=..&date=YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub time: SlotTime,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentResponse {
    pub message: String,
    pub appointment: Appointment,
}

// ==============================================================================
// ERRORS
// ==============================================================================

pub const SLOT_TAKEN_MESSAGE: &str = "This time slot is already booked. Please choose another.";

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{}", SLOT_TAKEN_MESSAGE)]
    SlotTaken,

    #[error("Appointment not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::SlotTaken => AppError::BadRequest(SLOT_TAKEN_MESSAGE.to_string()),
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            e @ AppointmentError::InvalidStatusTransition { .. } => AppError::BadRequest(e.to_string()),
            AppointmentError::StorageError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn sample(status: AppointmentStatus) -> Appointment {
        Appointment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            SlotTime::parse("10:00").unwrap(),
            status,
        )
    }

    #[test]
    fn test_active_statuses() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::Confirmed.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
    }

    #[test]
    fn test_record_shape() {
        let appointment = sample(AppointmentStatus::Confirmed);
        let value = serde_json::to_value(&appointment).unwrap();

        assert_eq!(value["date"], "2025-07-10");
        assert_eq!(value["time"], "10:00");
        assert_eq!(value["status"], "Confirmed");
        assert_eq!(value["patientId"], appointment.patient_id.to_string());
        assert_eq!(value["doctorId"], appointment.doctor_id.to_string());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
    }

    #[test]
    fn test_book_request_accepts_missing_fields() {
        let request: BookAppointmentRequest = serde_json::from_str(r#"{"doctorId":"abc"}"#).unwrap();
        assert_eq!(request.doctor_id.as_deref(), Some("abc"));
        assert!(request.date.is_none());
        assert!(request.time.is_none());
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppointmentError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (AppointmentError::SlotTaken, StatusCode::BAD_REQUEST),
            (AppointmentError::NotFound, StatusCode::NOT_FOUND),
            (AppointmentError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                AppointmentError::InvalidStatusTransition {
                    from: AppointmentStatus::Completed,
                    to: AppointmentStatus::Cancelled,
                },
                StatusCode::BAD_REQUEST,
            ),
            (AppointmentError::StorageError("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status_code(), expected);
        }
    }

    #[test]
    fn test_slot_taken_message() {
        match AppError::from(AppointmentError::SlotTaken) {
            AppError::BadRequest(msg) => assert_eq!(msg, SLOT_TAKEN_MESSAGE),
            other => panic!("unexpected {:?}", other),
        }
    }
}
