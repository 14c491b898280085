// libs/doctor-cell/src/store/mod.rs
//
// Collaborator contracts for the doctor directory and the weekly schedule
// table. Services receive these as `Arc<dyn ...>` so tests can swap in the
// in-memory variants.

use async_trait::async_trait;
use uuid::Uuid;

use shared_models::error::StoreError;

use crate::models::{Doctor, DoctorFilter, NewWorkShift, ShiftFilter, WorkShift};

pub mod memory;
pub mod supabase;

pub use memory::{InMemoryDoctorDirectory, InMemoryWorkScheduleStore};
pub use supabase::{SupabaseDoctorDirectory, SupabaseWorkScheduleStore};

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Active doctors matching the filter, in directory order.
    async fn find_active(&self, filter: &DoctorFilter) -> Result<Vec<Doctor>, StoreError>;

    async fn find_by_id(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError>;

    /// Distinct specialties of active doctors, sorted.
    async fn list_specialties(&self) -> Result<Vec<String>, StoreError>;

    async fn lab_nurse_exists(&self, nurse_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait WorkScheduleStore: Send + Sync {
    async fn find(&self, filter: &ShiftFilter) -> Result<Vec<WorkShift>, StoreError>;

    async fn find_by_id(&self, shift_id: Uuid) -> Result<Option<WorkShift>, StoreError>;

    async fn create(&self, shift: NewWorkShift) -> Result<WorkShift, StoreError>;

    /// Replaces the stored row with `shift` (matched on id).
    async fn update(&self, shift: WorkShift) -> Result<WorkShift, StoreError>;

    async fn delete(&self, shift_id: Uuid) -> Result<(), StoreError>;
}
