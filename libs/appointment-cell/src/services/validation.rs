// libs/appointment-cell/src/services/validation.rs
use chrono::NaiveDate;
use uuid::Uuid;

use shared_models::auth::User;

use crate::models::AppointmentError;
use crate::services::slots::SlotTime;

fn present<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppointmentError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppointmentError::ValidationError(format!("{} is required", field))),
    }
}

pub fn require_doctor_id(raw: Option<&str>) -> Result<Uuid, AppointmentError> {
    let value = present(raw, "doctorId")?;
    Uuid::parse_str(value)
        .map_err(|_| AppointmentError::ValidationError(format!("Invalid doctorId '{}'", value)))
}

/// Dates travel as `YYYY-MM-DD`.
pub fn require_date(raw: Option<&str>) -> Result<NaiveDate, AppointmentError> {
    let value = present(raw, "date")?;
    if value.len() != 10 {
        return Err(invalid_date(value));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid_date(value))
}

pub fn require_time(raw: Option<&str>) -> Result<SlotTime, AppointmentError> {
    let value = present(raw, "time")?;
    SlotTime::parse(value).map_err(|e| AppointmentError::ValidationError(e.to_string()))
}

/// The authenticated principal's id as issued by the auth service.
pub fn principal_id(user: &User) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppointmentError::Forbidden("Authenticated user id is not recognised".to_string()))
}

fn invalid_date(value: &str) -> AppointmentError {
    AppointmentError::ValidationError(format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_missing_fields() {
        assert_matches!(require_doctor_id(None), Err(AppointmentError::ValidationError(msg)) if msg == "doctorId is required");
        assert_matches!(require_date(Some("  ")), Err(AppointmentError::ValidationError(_)));
        assert_matches!(require_time(None), Err(AppointmentError::ValidationError(_)));
    }

    #[test]
    fn test_date_format() {
        assert_eq!(
            require_date(Some("2025-07-10")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()
        );
        assert!(require_date(Some("2025-7-10")).is_err());
        assert!(require_date(Some("10/07/2025")).is_err());
        assert!(require_date(Some("2025-02-30")).is_err());
    }

    #[test]
    fn test_time_must_be_catalog_slot() {
        assert_eq!(require_time(Some("16:30")).unwrap().as_str(), "16:30");
        assert_matches!(require_time(Some("08:00")), Err(AppointmentError::ValidationError(_)));
    }

    #[test]
    fn test_principal_id() {
        let mut user = User {
            id: Uuid::new_v4().to_string(),
            email: None,
            role: Some("patient".to_string()),
            created_at: None,
        };
        assert!(principal_id(&user).is_ok());

        user.id = "not-a-uuid".to_string();
        assert_matches!(principal_id(&user), Err(AppointmentError::Forbidden(_)));
    }
}
