// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_capability;

use crate::models::{
    Appointment, AppointmentError, BookAppointmentRequest, CancelAppointmentResponse, SlotAvailability,
    SlotQuery,
};
use crate::router::AppointmentState;
use crate::services::slots::SlotTime;
use crate::services::validation::principal_id;

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    require_capability(&user, Role::can_book)?;
    let Json(request) = payload?;
    let patient_id = principal_id(&user)?;

    let appointment = state.booking.book_appointment(patient_id, request).await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_capability(&user, Role::can_view_own)?;

    let appointments = state.lifecycle.patient_appointments(&user).await?;
    Ok(Json(appointments))
}

/// Doctor's schedule from today (UTC) onwards.
#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_capability(&user, Role::can_view_schedule)?;

    let today = Utc::now().date_naive();
    let appointments = state.lifecycle.doctor_upcoming(&user, today).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_all_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    require_capability(&user, Role::can_view_all)?;

    let appointments = state.lifecycle.all_appointments().await?;
    Ok(Json(appointments))
}

// ==============================================================================
// SLOT AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_booked_slots(
    State(state): State<AppointmentState>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Vec<SlotTime>>, AppError> {
    let booked = state.availability.list_booked_times(&query).await?;
    Ok(Json(booked))
}

#[axum::debug_handler]
pub async fn get_slot_availability(
    State(state): State<AppointmentState>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Vec<SlotAvailability>>, AppError> {
    let grid = state.availability.slot_availability(&query).await?;
    Ok(Json(grid))
}

// ==============================================================================
// CANCELLATION
// ==============================================================================

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<CancelAppointmentResponse>, AppError> {
    require_capability(&user, Role::can_cancel_own)?;

    // An id that cannot exist is reported the same way as one that does not.
    let appointment_id = Uuid::parse_str(&appointment_id).map_err(|_| AppointmentError::NotFound)?;

    let appointment = state.lifecycle.cancel_appointment(appointment_id, &user).await?;

    Ok(Json(CancelAppointmentResponse {
        message: "Appointment cancelled successfully".to_string(),
        appointment,
    }))
}
