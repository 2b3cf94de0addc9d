// libs/appointment-cell/src/services/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, SlotKey};
use crate::services::slots::SlotTime;
use crate::services::store::{sort_newest_first, sort_soonest_first, AppointmentStore, StoreError};

#[derive(Default)]
struct StoreState {
    records: HashMap<Uuid, Appointment>,
    /// Index of active appointments. A key is present iff exactly one
    /// active record holds that slot.
    active_slots: HashMap<SlotKey, Uuid>,
}

/// Process-local store. Every write holds the write lock across its check
/// and its mutation, so the lock is the linearization point for bookings.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    state: RwLock<StoreState>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_active_conflict(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: SlotTime,
    ) -> Result<Option<Appointment>, StoreError> {
        let key = SlotKey { doctor_id, date, time };
        let state = self.state.read().await;

        Ok(state
            .active_slots
            .get(&key)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        let mut state = self.state.write().await;

        if state.records.contains_key(&appointment.id) {
            return Err(StoreError::Backend(format!("duplicate appointment id {}", appointment.id)));
        }

        let key = appointment.slot_key();
        if appointment.is_active() {
            if state.active_slots.contains_key(&key) {
                debug!("Insert rejected, slot {} already held", key);
                return Err(StoreError::Conflict);
            }
            state.active_slots.insert(key, appointment.id);
        }

        state.records.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.state.read().await.records.get(&id).cloned())
    }

    async fn find_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .records
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();

        sort_newest_first(&mut appointments);
        Ok(appointments)
    }

    async fn find_by_doctor_upcoming(
        &self,
        doctor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state
            .records
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.is_active() && a.date >= from_date)
            .cloned()
            .collect();

        sort_soonest_first(&mut appointments);
        Ok(appointments)
    }

    async fn find_all(&self) -> Result<Vec<Appointment>, StoreError> {
        let state = self.state.read().await;
        let mut appointments: Vec<Appointment> = state.records.values().cloned().collect();

        sort_newest_first(&mut appointments);
        Ok(appointments)
    }

    async fn set_status(
        &self,
        id: Uuid,
        from: &[AppointmentStatus],
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let record = state.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !from.contains(&record.status) {
            debug!("Status update of {} rejected, record is {}", id, record.status);
            return Err(StoreError::StatusChanged {
                current: record.status,
                requested: status,
            });
        }
        let key = record.slot_key();
        let was_active = record.is_active();
        let will_be_active = status.is_active();

        if will_be_active && !was_active {
            if let Some(holder) = state.active_slots.get(&key) {
                if *holder != id {
                    return Err(StoreError::Conflict);
                }
            }
        }

        record.status = status;
        record.updated_at = Utc::now();

        if was_active && !will_be_active {
            state.active_slots.remove(&key);
        } else if will_be_active {
            state.active_slots.insert(key, id);
        }

        Ok(record.clone())
    }

    async fn list_booked_times(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<SlotTime>, StoreError> {
        let state = self.state.read().await;
        let mut times: Vec<SlotTime> = state
            .active_slots
            .keys()
            .filter(|key| key.doctor_id == doctor_id && key.date == date)
            .map(|key| key.time)
            .collect();

        times.sort();
        Ok(times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn slot(raw: &str) -> SlotTime {
        raw.parse().unwrap()
    }

    const ANY: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];

    fn confirmed(doctor_id: Uuid, time: &str) -> Appointment {
        Appointment::new(Uuid::new_v4(), doctor_id, day(), slot(time), AppointmentStatus::Confirmed)
    }

    #[tokio::test]
    async fn test_insert_rejects_second_active_booking() {
        let store = InMemoryAppointmentStore::new();
        let doctor = Uuid::new_v4();

        store.insert(confirmed(doctor, "09:00")).await.unwrap();
        assert_matches!(store.insert(confirmed(doctor, "09:00")).await, Err(StoreError::Conflict));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_inactive_records_do_not_hold_slot() {
        let store = InMemoryAppointmentStore::new();
        let doctor = Uuid::new_v4();

        let mut old = confirmed(doctor, "09:00");
        old.status = AppointmentStatus::Completed;
        store.insert(old).await.unwrap();

        store.insert(confirmed(doctor, "09:00")).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_cancel_releases_slot_and_index() {
        let store = InMemoryAppointmentStore::new();
        let doctor = Uuid::new_v4();
        let first = store.insert(confirmed(doctor, "10:00")).await.unwrap();

        assert_eq!(store.list_booked_times(doctor, day()).await.unwrap(), vec![slot("10:00")]);

        let cancelled = store.set_status(first.id, &ANY, AppointmentStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert!(cancelled.updated_at >= first.updated_at);
        assert!(store.find_active_conflict(doctor, day(), slot("10:00")).await.unwrap().is_none());
        assert!(store.list_booked_times(doctor, day()).await.unwrap().is_empty());

        store.insert(confirmed(doctor, "10:00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_reactivation_into_held_slot_is_rejected() {
        let store = InMemoryAppointmentStore::new();
        let doctor = Uuid::new_v4();
        let first = store.insert(confirmed(doctor, "11:00")).await.unwrap();
        store.set_status(first.id, &ANY, AppointmentStatus::Cancelled).await.unwrap();
        store.insert(confirmed(doctor, "11:00")).await.unwrap();

        assert_matches!(
            store.set_status(first.id, &ANY, AppointmentStatus::Confirmed).await,
            Err(StoreError::Conflict)
        );
    }

    #[tokio::test]
    async fn test_set_status_rejects_unexpected_current_status() {
        let store = InMemoryAppointmentStore::new();
        let doctor = Uuid::new_v4();
        let mut done = confirmed(doctor, "13:00");
        done.status = AppointmentStatus::Completed;
        let done = store.insert(done).await.unwrap();

        let open = [AppointmentStatus::Pending, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled];
        assert_matches!(
            store.set_status(done.id, &open, AppointmentStatus::Cancelled).await,
            Err(StoreError::StatusChanged {
                current: AppointmentStatus::Completed,
                requested: AppointmentStatus::Cancelled
            })
        );

        let unchanged = store.find_by_id(done.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, AppointmentStatus::Completed);
        assert_eq!(unchanged.updated_at, done.updated_at);
    }

    #[tokio::test]
    async fn test_set_status_unknown_id() {
        let store = InMemoryAppointmentStore::new();
        let id = Uuid::new_v4();
        assert_matches!(
            store.set_status(id, &ANY, AppointmentStatus::Cancelled).await,
            Err(StoreError::NotFound(missing)) if missing == id
        );
    }

    #[tokio::test]
    async fn test_queries_filter_and_order() {
        let store = InMemoryAppointmentStore::new();
        let doctor = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let today = day();
        let yesterday = today.pred_opt().unwrap();
        let tomorrow = today.succ_opt().unwrap();

        for (date, time) in [(yesterday, "09:00"), (tomorrow, "09:00"), (today, "15:00"), (today, "09:30")] {
            let appointment = Appointment::new(patient, doctor, date, slot(time), AppointmentStatus::Confirmed);
            store.insert(appointment).await.unwrap();
        }
        let cancelled = Appointment::new(patient, doctor, today, slot("12:00"), AppointmentStatus::Cancelled);
        store.insert(cancelled).await.unwrap();

        let upcoming = store.find_by_doctor_upcoming(doctor, today).await.unwrap();
        let rendered: Vec<String> = upcoming.iter().map(|a| format!("{} {}", a.date, a.time)).collect();
        assert_eq!(rendered, vec!["2025-06-01 09:30", "2025-06-01 15:00", "2025-06-02 09:00"]);

        let mine = store.find_by_patient(patient).await.unwrap();
        assert_eq!(mine.len(), 5);
        assert_eq!(mine.first().unwrap().date, tomorrow);
        assert_eq!(mine.last().unwrap().date, yesterday);

        assert_eq!(store.find_all().await.unwrap().len(), 5);
        assert!(store.find_by_patient(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
