// libs/appointment-cell/src/store/mod.rs
//
// Appointment persistence contract. The two `*_if_free` writes are the only
// place the "one confirmed booking per doctor per window" rule is enforced
// atomically; services re-check beforehand but rely on these for races.

use async_trait::async_trait;
use uuid::Uuid;

use shared_models::error::StoreError;

use crate::models::{Appointment, AppointmentChanges, AppointmentFilter, NewAppointment};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Matching appointments ordered by `appointment_date` ascending.
    async fn find(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Unconditional insert. Used for pending requests, which never lock a slot.
    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Inserts a confirmed appointment unless another confirmed appointment of
    /// the same doctor conflicts with it. Fails with `StoreError::SlotTaken`.
    async fn insert_confirmed_if_free(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Promotes a pending appointment to confirmed under the same guard.
    /// Fails with `SlotTaken` on a clash and `Conflict` if the row is no
    /// longer pending.
    async fn confirm_if_free(&self, appointment_id: Uuid, staff_id: Uuid) -> Result<Appointment, StoreError>;

    async fn update(&self, appointment_id: Uuid, changes: &AppointmentChanges) -> Result<Appointment, StoreError>;

    async fn delete(&self, appointment_id: Uuid) -> Result<(), StoreError>;
}
