// libs/appointment-cell/src/store/memory.rs
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use shared_models::error::StoreError;
use shared_utils::TimeGrid;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentFilter, AppointmentStatus, NewAppointment,
};
use crate::store::AppointmentStore;

/// Appointment table held in memory. Every conditional write runs its check
/// and its mutation under a single lock guard.
pub struct InMemoryAppointmentStore {
    grid: TimeGrid,
    appointments: Mutex<Vec<Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new(grid: TimeGrid) -> Self {
        Self {
            grid,
            appointments: Mutex::new(Vec::new()),
        }
    }

    /// Seeds a record as-is, bypassing the slot guard.
    pub async fn seed(&self, appointment: Appointment) {
        self.appointments.lock().await.push(appointment);
    }

    fn clashes(&self, rows: &[Appointment], candidate: &Appointment) -> bool {
        rows.iter().any(|other| {
            other.id != candidate.id
                && other.doctor_id == candidate.doctor_id
                && other.status == AppointmentStatus::Confirmed
                && self.grid.conflicts(other.appointment_date, candidate.appointment_date)
        })
    }
}

impl Default for InMemoryAppointmentStore {
    fn default() -> Self {
        Self::new(TimeGrid::default())
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let rows = self.appointments.lock().await;
        let mut found: Vec<Appointment> = rows.iter().filter(|a| filter.matches(a)).cloned().collect();
        found.sort_by_key(|a| a.appointment_date);
        Ok(found)
    }

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let rows = self.appointments.lock().await;
        Ok(rows.iter().find(|a| a.id == appointment_id).cloned())
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let created = appointment.into_appointment(Utc::now());
        self.appointments.lock().await.push(created.clone());
        Ok(created)
    }

    async fn insert_confirmed_if_free(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut rows = self.appointments.lock().await;

        let mut created = appointment.into_appointment(Utc::now());
        created.status = AppointmentStatus::Confirmed;

        if self.clashes(&rows, &created) {
            warn!("Slot guard refused insert for doctor {} at {}", created.doctor_id, created.appointment_date);
            return Err(StoreError::SlotTaken);
        }

        rows.push(created.clone());
        Ok(created)
    }

    async fn confirm_if_free(&self, appointment_id: Uuid, staff_id: Uuid) -> Result<Appointment, StoreError> {
        let mut rows = self.appointments.lock().await;

        let index = rows
            .iter()
            .position(|a| a.id == appointment_id)
            .ok_or(StoreError::NotFound)?;

        if rows[index].status != AppointmentStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "appointment is {}, expected pending",
                rows[index].status
            )));
        }
        if self.clashes(&rows, &rows[index]) {
            warn!("Slot guard refused confirmation of {}", appointment_id);
            return Err(StoreError::SlotTaken);
        }

        let row = &mut rows[index];
        row.status = AppointmentStatus::Confirmed;
        row.staff_id = Some(staff_id);
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn update(&self, appointment_id: Uuid, changes: &AppointmentChanges) -> Result<Appointment, StoreError> {
        let mut rows = self.appointments.lock().await;
        let row = rows
            .iter_mut()
            .find(|a| a.id == appointment_id)
            .ok_or(StoreError::NotFound)?;

        changes.apply(row, Utc::now());
        Ok(row.clone())
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<(), StoreError> {
        let mut rows = self.appointments.lock().await;
        let before = rows.len();
        rows.retain(|a| a.id != appointment_id);

        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
