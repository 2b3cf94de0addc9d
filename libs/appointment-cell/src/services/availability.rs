// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use tracing::debug;

use crate::models::{AppointmentError, SlotAvailability, SlotQuery};
use crate::services::slots::SlotTime;
use crate::services::store::AppointmentStore;
use crate::services::validation::{require_date, require_doctor_id};

/// Read side of the slot grid shown to patients.
pub struct SlotAvailabilityService {
    store: Arc<dyn AppointmentStore>,
}

impl SlotAvailabilityService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Times already held by pending or confirmed appointments.
    pub async fn list_booked_times(&self, query: &SlotQuery) -> Result<Vec<SlotTime>, AppointmentError> {
        let doctor_id = require_doctor_id(query.doctor_id.as_deref())?;
        let date = require_date(query.date.as_deref())?;

        let booked = self.store.list_booked_times(doctor_id, date).await?;
        debug!("Doctor {} has {} booked slots on {}", doctor_id, booked.len(), date);
        Ok(booked)
    }

    /// Whole catalog for the day, each slot flagged free or taken.
    pub async fn slot_availability(&self, query: &SlotQuery) -> Result<Vec<SlotAvailability>, AppointmentError> {
        let booked = self.list_booked_times(query).await?;

        Ok(SlotTime::all()
            .map(|time| SlotAvailability {
                time,
                available: booked.binary_search(&time).is_err(),
            })
            .collect())
    }
}
