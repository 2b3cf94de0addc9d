// libs/appointment-cell/src/services/store/mod.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::slots::SlotTime;

pub mod memory;
pub mod supabase;

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The write would leave two active appointments on one slot.
    #[error("Active appointment already exists for this slot")]
    Conflict,

    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    /// The record's status was not one the caller allowed moving from.
    #[error("Appointment is {current}, cannot move to {requested}")]
    StatusChanged {
        current: AppointmentStatus,
        requested: AppointmentStatus,
    },

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for AppointmentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict => AppointmentError::SlotTaken,
            StoreError::NotFound(_) => AppointmentError::NotFound,
            StoreError::StatusChanged { current, requested } => AppointmentError::InvalidStatusTransition {
                from: current,
                to: requested,
            },
            StoreError::Backend(msg) => AppointmentError::StorageError(msg),
        }
    }
}

/// Persistence for appointment records.
///
/// Implementations own the slot invariant: for a (doctor, date, time) there
/// is at most one record with an active status, and `insert` / `set_status`
/// check and write as a single atomic step.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// The active appointment currently holding the slot, if any.
    async fn find_active_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: SlotTime,
    ) -> Result<Option<Appointment>, StoreError>;

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Newest first.
    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError>;

    /// Active appointments on or after `from_date`, soonest first.
    async fn find_by_doctor_upcoming(
        &self,
        doctor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Newest first.
    async fn find_all(&self) -> Result<Vec<Appointment>, StoreError>;

    /// Moves the record to `status` only if its current status is one of
    /// `from`; otherwise `StatusChanged`. Check and write are one step.
    async fn set_status(
        &self,
        id: Uuid,
        from: &[AppointmentStatus],
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError>;

    /// Times held by active appointments, in catalog order.
    async fn list_booked_times(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<SlotTime>, StoreError>;
}

pub fn sort_newest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| (b.date, b.time, b.created_at).cmp(&(a.date, a.time, a.created_at)));
}

pub fn sort_soonest_first(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| (a.date, a.time, a.created_at).cmp(&(b.date, b.time, b.created_at)));
}

/// Build the store selected by `APPOINTMENT_STORE`.
pub fn store_from_config(config: &AppConfig) -> Result<Arc<dyn AppointmentStore>, StoreError> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory appointment store");
            Ok(Arc::new(InMemoryAppointmentStore::new()))
        }
        StoreBackend::Supabase => {
            if !config.is_supabase_configured() {
                return Err(StoreError::Backend(
                    "Supabase store selected but SUPABASE_URL, SUPABASE_ANON_PUBLIC_KEY or SUPABASE_SERVICE_ROLE_KEY is missing"
                        .to_string(),
                ));
            }
            info!("Using Supabase appointment store at {}", config.supabase_url);
            Ok(Arc::new(SupabaseAppointmentStore::new(config)))
        }
    }
}
