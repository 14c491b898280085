// libs/appointment-cell/src/services/assignment.rs
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorFilter};
use shared_utils::time_grid::time_is_between;

use crate::context::SchedulingContext;
use crate::models::{AppointmentError, AppointmentFilter, Assignment};

/// Least-loaded doctor selection for bookings that name no doctor.
///
/// The load count is read once and goes stale immediately; two concurrent
/// calls may pick the same doctor; the booking's atomic write settles it.
pub struct AssignmentService {
    ctx: SchedulingContext,
}

impl AssignmentService {
    pub fn new(ctx: SchedulingContext) -> Self {
        Self { ctx }
    }

    pub async fn auto_assign(
        &self,
        instant: DateTime<Utc>,
        specialty: Option<&str>,
    ) -> Result<Assignment, AppointmentError> {
        let filter = DoctorFilter {
            specialty: specialty.map(str::to_string),
        };
        let doctors = self.ctx.directory.find_active(&filter).await?;
        if doctors.is_empty() {
            warn!("No active doctors for specialty {:?}", specialty);
            return Err(AppointmentError::NoEligibleDoctor {
                specialty: specialty.map(str::to_string),
            });
        }

        let date = self.ctx.grid.local_date_of(instant);
        let time = self.ctx.grid.local_time_of(instant);
        let ids: Vec<Uuid> = doctors.iter().map(|d| d.id).collect();

        // Shift ends are inclusive here, unlike slot generation.
        let shifts = self.ctx.schedule.shifts_for_doctors(&ids, date.day_of_week()).await?;
        let on_shift: Vec<Doctor> = doctors
            .into_iter()
            .filter(|d| {
                shifts.iter().any(|s| {
                    s.owner.doctor_id() == Some(d.id) && time_is_between(time, s.shift_start, s.shift_end)
                })
            })
            .collect();

        if on_shift.is_empty() {
            warn!("Nobody on shift at {} {}", date, time);
            return Err(AppointmentError::NoScheduleOnDay);
        }

        let on_shift_ids: Vec<Uuid> = on_shift.iter().map(|d| d.id).collect();

        // Load is counted per local day; conflicts may sit across midnight.
        let confirmed_today = self
            .ctx
            .appointments
            .find(&AppointmentFilter::confirmed_between(
                on_shift_ids.clone(),
                date.midnight_utc(),
                date.next_day().midnight_utc(),
            ))
            .await?;
        let window = self.ctx.grid.window();
        let nearby = self
            .ctx
            .appointments
            .find(&AppointmentFilter::confirmed_between(
                on_shift_ids,
                instant - window,
                instant + window,
            ))
            .await?;

        let mut best: Option<Assignment> = None;
        for doctor in on_shift {
            let busy = nearby
                .iter()
                .any(|a| a.doctor_id == doctor.id && self.ctx.grid.conflicts(a.appointment_date, instant));
            if busy {
                debug!("Doctor {} is booked at {}", doctor.id, instant);
                continue;
            }

            let count = confirmed_today.iter().filter(|a| a.doctor_id == doctor.id).count();
            if best.as_ref().map_or(true, |b| count < b.confirmed_count) {
                best = Some(Assignment {
                    doctor,
                    confirmed_count: count,
                });
            }
        }

        match best {
            Some(assignment) => {
                info!(
                    "Auto-assigned doctor {} ({} confirmed on {})",
                    assignment.doctor.id, assignment.confirmed_count, date
                );
                Ok(assignment)
            }
            None => {
                warn!("All on-shift doctors are booked at {}", instant);
                Err(AppointmentError::NoFreeSlot)
            }
        }
    }
}
