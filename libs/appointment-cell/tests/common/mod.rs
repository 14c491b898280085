#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use appointment_cell::models::BookRequest;
use appointment_cell::services::BookingService;
use appointment_cell::store::InMemoryAppointmentStore;
use appointment_cell::SchedulingContext;
use doctor_cell::models::{CreateShiftRequest, Doctor, DoctorStatus};
use doctor_cell::store::{InMemoryDoctorDirectory, InMemoryWorkScheduleStore};
use shared_config::SchedulingConfig;
use shared_models::auth::ActorRole;
use shared_utils::test_utils::{init_test_tracing, local_instant};
use shared_utils::TimeGrid;

/// 2025-06-02 is a Monday.
pub const MONDAY: &str = "2025-06-02";
pub const TUESDAY: &str = "2025-06-03";
pub const SUNDAY: &str = "2025-06-01";

pub struct Clinic {
    pub ctx: SchedulingContext,
    pub appointments: Arc<InMemoryAppointmentStore>,
}

impl Clinic {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        init_test_tracing();

        let grid = TimeGrid::default();
        let appointments = Arc::new(InMemoryAppointmentStore::new(grid));
        let ctx = SchedulingContext::new(
            grid,
            SchedulingConfig::default(),
            Arc::new(InMemoryDoctorDirectory::new(doctors)),
            Arc::new(InMemoryWorkScheduleStore::new()),
            appointments.clone(),
        );

        Self { ctx, appointments }
    }

    pub async fn add_shift(&self, doctor_id: Uuid, day_of_week: i32, start: &str, end: &str) {
        self.ctx
            .schedule
            .create_shift(CreateShiftRequest {
                doctor_id: Some(doctor_id),
                lab_nurse_id: None,
                day_of_week,
                shift_start: start.to_string(),
                shift_end: end.to_string(),
                note: None,
            })
            .await
            .expect("fixture shift must be valid");
    }

    pub fn booking(&self) -> BookingService {
        BookingService::new(self.ctx.clone())
    }
}

pub fn doctor(name: &str, specialty: &str) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        full_name: name.to_string(),
        specialty: specialty.to_string(),
        status: DoctorStatus::Active,
    }
}

pub fn patient_request(doctor_id: Option<Uuid>, date: &str, time: &str) -> BookRequest {
    BookRequest {
        patient_id: Uuid::new_v4(),
        doctor_id,
        specialty: None,
        appointment_date: local_instant(date, time),
        note: None,
        actor_role: ActorRole::Patient,
        staff_id: None,
    }
}

pub fn staff_request(doctor_id: Option<Uuid>, date: &str, time: &str) -> BookRequest {
    BookRequest {
        actor_role: ActorRole::Staff,
        staff_id: Some(Uuid::new_v4()),
        ..patient_request(doctor_id, date, time)
    }
}
