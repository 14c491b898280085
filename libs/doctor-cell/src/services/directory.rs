// libs/doctor-cell/src/services/directory.rs
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use shared_models::error::StoreError;

use crate::models::{Doctor, DoctorFilter};
use crate::store::DoctorDirectory;

/// Read-only view of the doctor directory.
pub struct DirectoryService {
    directory: Arc<dyn DoctorDirectory>,
}

impl DirectoryService {
    pub fn new(directory: Arc<dyn DoctorDirectory>) -> Self {
        Self { directory }
    }

    pub async fn active_doctors(&self, specialty: Option<&str>) -> Result<Vec<Doctor>, StoreError> {
        let filter = DoctorFilter {
            specialty: specialty.map(str::to_string),
        };
        let doctors = self.directory.find_active(&filter).await?;
        debug!("Found {} active doctors (specialty: {:?})", doctors.len(), specialty);
        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        self.directory.find_by_id(doctor_id).await
    }

    pub async fn list_specialties(&self) -> Result<Vec<String>, StoreError> {
        self.directory.list_specialties().await
    }
}
