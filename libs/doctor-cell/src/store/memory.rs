// libs/doctor-cell/src/store/memory.rs
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::error::StoreError;

use crate::models::{Doctor, DoctorFilter, NewWorkShift, ShiftFilter, WorkShift};
use crate::store::{DoctorDirectory, WorkScheduleStore};

/// Directory backed by a vector; preserves insertion order.
#[derive(Default)]
pub struct InMemoryDoctorDirectory {
    doctors: RwLock<Vec<Doctor>>,
    lab_nurses: RwLock<HashSet<Uuid>>,
}

impl InMemoryDoctorDirectory {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        Self {
            doctors: RwLock::new(doctors),
            lab_nurses: RwLock::default(),
        }
    }

    pub fn with_lab_nurses(mut self, nurse_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.lab_nurses.get_mut().extend(nurse_ids);
        self
    }

    pub async fn insert(&self, doctor: Doctor) {
        self.doctors.write().await.push(doctor);
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn find_active(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>, StoreError> {
        let doctors = self.doctors.read().await;
        Ok(doctors
            .iter()
            .filter(|d| d.is_active())
            .filter(|d| filter.specialty.as_ref().map_or(true, |s| &d.specialty == s))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        let doctors = self.doctors.read().await;
        Ok(doctors.iter().find(|d| d.id == doctor_id).cloned())
    }

    async fn list_specialties(&self) -> Result<Vec<String>, StoreError> {
        let doctors = self.doctors.read().await;
        let mut specialties: Vec<String> = doctors
            .iter()
            .filter(|d| d.is_active() && !d.specialty.is_empty())
            .map(|d| d.specialty.clone())
            .collect();
        specialties.sort();
        specialties.dedup();
        Ok(specialties)
    }

    async fn lab_nurse_exists(&self, nurse_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lab_nurses.read().await.contains(&nurse_id))
    }
}

#[derive(Default)]
pub struct InMemoryWorkScheduleStore {
    shifts: RwLock<Vec<WorkShift>>,
}

impl InMemoryWorkScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkScheduleStore for InMemoryWorkScheduleStore {
    async fn find(&self, filter: &ShiftFilter) -> Result<Vec<WorkShift>, StoreError> {
        let shifts = self.shifts.read().await;
        let mut found: Vec<WorkShift> = shifts.iter().filter(|s| filter.matches(s)).cloned().collect();
        found.sort_by_key(|s| (s.day_of_week, s.shift_start));
        Ok(found)
    }

    async fn find_by_id(&self, shift_id: Uuid) -> Result<Option<WorkShift>, StoreError> {
        let shifts = self.shifts.read().await;
        Ok(shifts.iter().find(|s| s.id == shift_id).cloned())
    }

    async fn create(&self, shift: NewWorkShift) -> Result<WorkShift, StoreError> {
        let mut shifts = self.shifts.write().await;

        let duplicate = shifts.iter().any(|s| {
            s.owner == shift.owner
                && s.day_of_week == shift.day_of_week
                && s.shift_start == shift.shift_start
                && s.shift_end == shift.shift_end
        });
        if duplicate {
            return Err(StoreError::Conflict("duplicate work schedule".to_string()));
        }

        let created = shift.into_shift(Utc::now());
        shifts.push(created.clone());
        Ok(created)
    }

    async fn update(&self, shift: WorkShift) -> Result<WorkShift, StoreError> {
        let mut shifts = self.shifts.write().await;
        let slot = shifts
            .iter_mut()
            .find(|s| s.id == shift.id)
            .ok_or(StoreError::NotFound)?;

        let mut updated = shift;
        updated.created_at = slot.created_at;
        updated.updated_at = Utc::now();
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, shift_id: Uuid) -> Result<(), StoreError> {
        let mut shifts = self.shifts.write().await;
        let before = shifts.len();
        shifts.retain(|s| s.id != shift_id);

        if shifts.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
