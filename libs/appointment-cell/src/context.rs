// libs/appointment-cell/src/context.rs
use std::sync::Arc;

use doctor_cell::services::ScheduleService;
use doctor_cell::store::{DoctorDirectory, SupabaseDoctorDirectory, SupabaseWorkScheduleStore, WorkScheduleStore};
use shared_config::{AppConfig, SchedulingConfig};
use shared_database::supabase::SupabaseClient;
use shared_utils::{TimeGrid, TimeGridError};

use crate::store::{AppointmentStore, SupabaseAppointmentStore};

/// Collaborators shared by the availability, assignment and booking
/// services.
#[derive(Clone)]
pub struct SchedulingContext {
    pub grid: TimeGrid,
    pub config: SchedulingConfig,
    pub directory: Arc<dyn DoctorDirectory>,
    pub schedule: Arc<ScheduleService>,
    pub appointments: Arc<dyn AppointmentStore>,
}

impl SchedulingContext {
    pub fn new(
        grid: TimeGrid,
        config: SchedulingConfig,
        directory: Arc<dyn DoctorDirectory>,
        schedules: Arc<dyn WorkScheduleStore>,
        appointments: Arc<dyn AppointmentStore>,
    ) -> Self {
        let schedule = Arc::new(ScheduleService::new(schedules, directory.clone()));
        Self {
            grid,
            config,
            directory,
            schedule,
            appointments,
        }
    }

    /// Wires the PostgREST-backed stores from the application config.
    pub fn from_app_config(config: &AppConfig, auth_token: Option<String>) -> Result<Self, TimeGridError> {
        let grid = TimeGrid::from_config(&config.scheduling)?;
        let supabase = Arc::new(SupabaseClient::new(config));

        Ok(Self::new(
            grid,
            config.scheduling.clone(),
            Arc::new(SupabaseDoctorDirectory::new(supabase.clone(), auth_token.clone())),
            Arc::new(SupabaseWorkScheduleStore::new(supabase.clone(), auth_token.clone())),
            Arc::new(SupabaseAppointmentStore::new(supabase, auth_token, grid)),
        ))
    }
}
