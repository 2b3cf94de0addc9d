// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{Appointment, AppointmentError, BookAppointmentRequest};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::slots::SlotTime;
use crate::services::store::{AppointmentStore, StoreError};
use crate::services::validation::{require_date, require_doctor_id, require_time};

/// A booking request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
}

/// The only place appointments are created.
pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    auto_confirm: bool,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, config: &AppConfig) -> Self {
        Self::with_auto_confirm(store, config.auto_confirm_bookings)
    }

    pub fn with_auto_confirm(store: Arc<dyn AppointmentStore>, auto_confirm: bool) -> Self {
        Self { store, auto_confirm }
    }

    pub fn validate_booking_request(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<ValidatedBooking, AppointmentError> {
        Ok(ValidatedBooking {
            doctor_id: require_doctor_id(request.doctor_id.as_deref())?,
            date: require_date(request.date.as_deref())?,
            time: require_time(request.time.as_deref())?,
        })
    }

    /// Book `patient_id` into the requested slot.
    ///
    /// The availability read gives a fast, friendly rejection; the store's
    /// insert is what actually arbitrates concurrent requests, so a lost race
    /// surfaces as `SlotTaken` too.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let booking = self.validate_booking_request(&request)?;
        debug!(
            "Booking request from patient {} for doctor {} on {} at {}",
            patient_id, booking.doctor_id, booking.date, booking.time
        );

        if let Some(existing) = self
            .store
            .find_active_conflict(booking.doctor_id, booking.date, booking.time)
            .await?
        {
            warn!(
                "Slot {} {} {} already held by appointment {}",
                booking.doctor_id, booking.date, booking.time, existing.id
            );
            return Err(AppointmentError::SlotTaken);
        }

        let appointment = Appointment::new(
            patient_id,
            booking.doctor_id,
            booking.date,
            booking.time,
            AppointmentLifecycleService::initial_status(self.auto_confirm),
        );

        let created = self.store.insert(appointment).await.map_err(|e| match e {
            StoreError::Conflict => {
                warn!(
                    "Lost booking race for doctor {} on {} at {}",
                    booking.doctor_id, booking.date, booking.time
                );
                AppointmentError::SlotTaken
            }
            other => other.into(),
        })?;

        info!(
            "Appointment {} booked for patient {} with doctor {} on {} at {} ({})",
            created.id, created.patient_id, created.doctor_id, created.date, created.time, created.status
        );
        Ok(created)
    }
}
