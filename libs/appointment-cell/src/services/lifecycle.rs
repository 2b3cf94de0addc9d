// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::User;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::store::AppointmentStore;
use crate::services::validation::principal_id;

pub struct AppointmentLifecycleService {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentLifecycleService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Status given to a freshly booked appointment. With auto-confirm off,
    /// bookings wait in `Pending` for an approval step.
    pub fn initial_status(auto_confirm: bool) -> AppointmentStatus {
        if auto_confirm {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        }
    }

    /// Statuses reachable from `current`. Cancelling twice is accepted and
    /// leaves the record cancelled.
    pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
        match current {
            AppointmentStatus::Pending => &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => &[AppointmentStatus::Cancelled],
            AppointmentStatus::Cancelled => &[AppointmentStatus::Cancelled],
            // TODO: add a doctor-facing "mark completed" transition once the
            // visit workflow exists; until then nothing leads into or out of it.
            AppointmentStatus::Completed => &[],
        }
    }

    /// Statuses from which `next` is reachable. Handed to the store so the
    /// transition is re-checked against the record at write time.
    pub fn transition_sources(next: AppointmentStatus) -> Vec<AppointmentStatus> {
        AppointmentStatus::all()
            .into_iter()
            .filter(|status| Self::valid_transitions(*status).contains(&next))
            .collect()
    }

    pub fn validate_status_transition(
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if Self::valid_transitions(current).contains(&next) {
            debug!("Status transition validated: {} -> {}", current, next);
            Ok(())
        } else {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            Err(AppointmentError::InvalidStatusTransition { from: current, to: next })
        }
    }

    /// Owning patient or any admin may cancel.
    pub fn authorize_cancel(actor: &User, appointment: &Appointment) -> Result<(), AppointmentError> {
        let role = actor.role();

        if role.map_or(false, |r| r.can_cancel_any()) {
            return Ok(());
        }

        let owns = principal_id(actor).map_or(false, |id| id == appointment.patient_id);
        if owns && role.map_or(false, |r| r.can_cancel_own()) {
            return Ok(());
        }

        warn!("User {} attempted to cancel appointment {} they do not own", actor.id, appointment.id);
        Err(AppointmentError::Forbidden(
            "User not authorized to cancel this appointment".to_string(),
        ))
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        actor: &User,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .store
            .find_by_id(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        Self::authorize_cancel(actor, &appointment)?;
        Self::validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let sources = Self::transition_sources(AppointmentStatus::Cancelled);
        let cancelled = self
            .store
            .set_status(appointment_id, &sources, AppointmentStatus::Cancelled)
            .await?;

        info!(
            "Appointment {} cancelled by {} (slot {} released)",
            appointment_id,
            actor.id,
            cancelled.slot_key()
        );
        Ok(cancelled)
    }

    pub async fn patient_appointments(&self, patient: &User) -> Result<Vec<Appointment>, AppointmentError> {
        let patient_id = principal_id(patient)?;
        Ok(self.store.find_by_patient(patient_id).await?)
    }

    /// Pending or confirmed appointments for the doctor from `today` on.
    pub async fn doctor_upcoming(
        &self,
        doctor: &User,
        today: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let doctor_id = principal_id(doctor)?;
        Ok(self.store.find_by_doctor_upcoming(doctor_id, today).await?)
    }

    pub async fn all_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.store.find_all().await?)
    }
}
