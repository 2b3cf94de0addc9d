// libs/appointment-cell/src/services/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{Appointment, AppointmentStatus};
use crate::services::slots::SlotTime;
use crate::services::store::{AppointmentStore, StoreError};

const TABLE_PATH: &str = "/rest/v1/appointments";
const ACTIVE_FILTER: &str = "status=in.(Pending,Confirmed)";

/// Row layout of the `appointments` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppointmentRow {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    date: NaiveDate,
    time: SlotTime,
    status: AppointmentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentRow {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            patient_id: a.patient_id,
            doctor_id: a.doctor_id,
            date: a.date,
            time: a.time,
            status: a.status,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            date: row.date,
            time: row.time,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookedTimeRow {
    time: SlotTime,
}

/// PostgREST-backed store. Slot exclusivity is enforced by the partial
/// unique index `appointments_active_slot_key`; a violating insert or update
/// comes back as 409 and is reported as `StoreError::Conflict`.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch_rows(&self, query: &str) -> Result<Vec<Appointment>, StoreError> {
        let path = format!("{}?{}", TABLE_PATH, query);
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(map_supabase_error)?;

        Ok(rows.into_iter().map(Appointment::from).collect())
    }
}

fn map_supabase_error(error: SupabaseError) -> StoreError {
    match error {
        SupabaseError::Conflict { .. } => StoreError::Conflict,
        other => {
            warn!("Appointment store request failed: {}", other);
            StoreError::Backend(other.to_string())
        }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_active_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: SlotTime,
    ) -> Result<Option<Appointment>, StoreError> {
        let query = format!(
            "doctor_id=eq.{}&date=eq.{}&time=eq.{}&{}&limit=1",
            doctor_id, date, time, ACTIVE_FILTER
        );
        Ok(self.fetch_rows(&query).await?.into_iter().next())
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let body = serde_json::to_value(AppointmentRow::from(appointment))
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let rows: Vec<AppointmentRow> = self
            .supabase
            .request_with_headers(
                Method::POST,
                TABLE_PATH,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(map_supabase_error)?;

        rows.into_iter()
            .next()
            .map(Appointment::from)
            .ok_or_else(|| StoreError::Backend("insert returned no rows".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.fetch_rows(&format!("id=eq.{}", id)).await?.into_iter().next())
    }

    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        self.fetch_rows(&format!(
            "patient_id=eq.{}&order=date.desc,time.desc",
            patient_id
        ))
        .await
    }

    async fn find_by_doctor_upcoming(
        &self,
        doctor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.fetch_rows(&format!(
            "doctor_id=eq.{}&{}&date=gte.{}&order=date.asc,time.asc",
            doctor_id, ACTIVE_FILTER, from_date
        ))
        .await
    }

    async fn find_all(&self) -> Result<Vec<Appointment>, StoreError> {
        self.fetch_rows("order=date.desc,time.desc").await
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: &[AppointmentStatus],
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let allowed: Vec<String> = from.iter().map(ToString::to_string).collect();
        let path = format!("{}?id=eq.{}&status=in.({})", TABLE_PATH, id, allowed.join(","));
        let body = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<AppointmentRow> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(map_supabase_error)?;

        if let Some(row) = rows.into_iter().next() {
            debug!("Status of appointment {} set to {}", id, status);
            return Ok(Appointment::from(row));
        }

        // Nothing matched: either the row is gone or its status moved on.
        match self.find_by_id(id).await? {
            Some(current) => {
                debug!("Status update of {} rejected, record is {}", id, current.status);
                Err(StoreError::StatusChanged {
                    current: current.status,
                    requested: status,
                })
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn list_booked_times(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<SlotTime>, StoreError> {
        let path = format!(
            "{}?select=time&doctor_id=eq.{}&date=eq.{}&{}",
            TABLE_PATH, doctor_id, date, ACTIVE_FILTER
        );
        let rows: Vec<BookedTimeRow> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(map_supabase_error)?;

        let mut times: Vec<SlotTime> = rows.into_iter().map(|row| row.time).collect();
        times.sort();
        Ok(times)
    }
}
