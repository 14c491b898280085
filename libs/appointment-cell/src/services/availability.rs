// libs/appointment-cell/src/services/availability.rs
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::{DoctorFilter, ShiftOwner, WorkShift};
use shared_utils::CivilDate;

use crate::context::SchedulingContext;
use crate::models::{Appointment, AppointmentError, AppointmentFilter, AvailableSlot, SlotCheck};

/// Bookable slots: weekly shifts walked on the clinic grid, minus anything
/// that conflicts with a confirmed appointment of the same doctor.
pub struct AvailabilityService {
    ctx: SchedulingContext,
}

impl AvailabilityService {
    pub fn new(ctx: SchedulingContext) -> Self {
        Self { ctx }
    }

    /// Open slots on local `date` (`YYYY-MM-DD`). With a doctor the slots are
    /// that doctor's; otherwise they span the specialty (or every active
    /// doctor) and are collapsed by instant with `doctor_id` left out.
    pub async fn available_slots(
        &self,
        doctor_id: Option<Uuid>,
        specialty: Option<&str>,
        date: &str,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        let date = self.ctx.grid.civil_date(date)?;
        self.available_slots_on(doctor_id, specialty, &date).await
    }

    pub async fn available_slots_on(
        &self,
        doctor_id: Option<Uuid>,
        specialty: Option<&str>,
        date: &CivilDate,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        let day_of_week = date.day_of_week();
        let shifts = self.resolve_shifts(doctor_id, specialty, day_of_week).await?;

        let mut candidates: Vec<(Uuid, DateTime<Utc>)> = shifts
            .iter()
            .filter_map(|shift| shift.owner.doctor_id().map(|id| (id, shift)))
            .flat_map(|(id, shift)| {
                self.ctx
                    .grid
                    .shift_slots(date, shift.shift_start, shift.shift_end)
                    .into_iter()
                    .map(move |instant| (id, instant))
            })
            .collect();

        if candidates.is_empty() {
            debug!("No shifts on {} (day {})", date, day_of_week);
            return Ok(Vec::new());
        }

        let mut doctor_ids: Vec<Uuid> = candidates.iter().map(|(id, _)| *id).collect();
        doctor_ids.sort();
        doctor_ids.dedup();

        let confirmed = self
            .ctx
            .appointments
            .find(&AppointmentFilter::confirmed_between(
                doctor_ids,
                date.midnight_utc(),
                date.next_day().midnight_utc(),
            ))
            .await?;

        candidates.retain(|(id, instant)| !self.is_blocked(&confirmed, *id, *instant));
        candidates.sort_by_key(|(_, instant)| *instant);

        let slots: Vec<AvailableSlot> = match doctor_id {
            Some(_) => {
                candidates.dedup();
                candidates
                    .into_iter()
                    .map(|(id, instant)| self.slot(instant, Some(id)))
                    .collect()
            }
            None => {
                candidates.dedup_by_key(|(_, instant)| *instant);
                candidates
                    .into_iter()
                    .map(|(_, instant)| self.slot(instant, None))
                    .collect()
            }
        };

        debug!("{} open slots on {}", slots.len(), date);
        Ok(slots)
    }

    /// Local dates in `[from, from + days_ahead]` with at least one open slot
    /// for the doctor. `from` defaults to today in the clinic offset.
    pub async fn available_dates(
        &self,
        doctor_id: Uuid,
        from: Option<&str>,
        days_ahead: Option<u32>,
    ) -> Result<Vec<CivilDate>, AppointmentError> {
        let start = match from {
            Some(value) => self.ctx.grid.civil_date(value)?,
            None => self.ctx.grid.today(Utc::now()),
        };
        let days_ahead = days_ahead
            .unwrap_or(self.ctx.config.default_days_ahead)
            .min(self.ctx.config.max_days_ahead);

        let mut dates = Vec::new();
        for offset in 0..=days_ahead {
            let date = start.add_days(i64::from(offset));
            if !self.available_slots_on(Some(doctor_id), None, &date).await?.is_empty() {
                dates.push(date);
            }
        }

        debug!("Doctor {} has {} bookable dates from {}", doctor_id, dates.len(), start);
        Ok(dates)
    }

    /// Open slots of the appointment's doctor on the appointment's local
    /// date. A missing appointment yields no suggestions.
    pub async fn suggested_slots(
        &self,
        appointment_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        let Some(appointment) = self.ctx.appointments.find_by_id(appointment_id).await? else {
            return Ok(Vec::new());
        };
        self.suggestions_for(&appointment, limit).await
    }

    pub(crate) async fn suggestions_for(
        &self,
        appointment: &Appointment,
        limit: Option<usize>,
    ) -> Result<Vec<AvailableSlot>, AppointmentError> {
        let limit = limit.unwrap_or(self.ctx.config.suggestion_limit);
        let date = self.ctx.grid.local_date_of(appointment.appointment_date);

        let mut slots = self
            .available_slots_on(Some(appointment.doctor_id), None, &date)
            .await?;
        slots.truncate(limit);
        Ok(slots)
    }

    /// Whether `instant` is clear of the doctor's confirmed appointments.
    pub async fn check_slot(&self, doctor_id: Uuid, instant: DateTime<Utc>) -> Result<SlotCheck, AppointmentError> {
        let clash = self.confirmed_conflict(doctor_id, instant, None).await?;

        Ok(match clash {
            Some(existing) => SlotCheck {
                available: false,
                reason: Some(format!(
                    "Slot already booked at {}",
                    self.ctx.grid.format_local(existing.appointment_date)
                )),
            },
            None => SlotCheck {
                available: true,
                reason: None,
            },
        })
    }

    /// First confirmed appointment of `doctor_id` conflicting with `instant`,
    /// ignoring `exclude`.
    pub(crate) async fn confirmed_conflict(
        &self,
        doctor_id: Uuid,
        instant: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let window = self.ctx.grid.window();
        let nearby = self
            .ctx
            .appointments
            .find(&AppointmentFilter::confirmed_between(
                vec![doctor_id],
                instant - window,
                instant + window,
            ))
            .await?;

        Ok(nearby
            .into_iter()
            .filter(|a| Some(a.id) != exclude)
            .find(|a| self.ctx.grid.conflicts(a.appointment_date, instant)))
    }

    async fn resolve_shifts(
        &self,
        doctor_id: Option<Uuid>,
        specialty: Option<&str>,
        day_of_week: u8,
    ) -> Result<Vec<WorkShift>, AppointmentError> {
        let shifts = match (doctor_id, specialty) {
            (Some(id), _) => self.ctx.schedule.shifts_for(ShiftOwner::Doctor(id), day_of_week).await?,
            (None, Some(specialty)) => self
                .ctx
                .schedule
                .shifts_for_specialty(specialty, day_of_week)
                .await?
                .into_iter()
                .map(|(_, shift)| shift)
                .collect(),
            (None, None) => {
                let doctors = self.ctx.directory.find_active(&DoctorFilter::default()).await?;
                let ids: Vec<Uuid> = doctors.iter().map(|d| d.id).collect();
                self.ctx.schedule.shifts_for_doctors(&ids, day_of_week).await?
            }
        };
        Ok(shifts)
    }

    fn is_blocked(&self, confirmed: &[Appointment], doctor_id: Uuid, instant: DateTime<Utc>) -> bool {
        confirmed
            .iter()
            .any(|a| a.doctor_id == doctor_id && self.ctx.grid.conflicts(a.appointment_date, instant))
    }

    fn slot(&self, instant: DateTime<Utc>, doctor_id: Option<Uuid>) -> AvailableSlot {
        AvailableSlot {
            start_time: instant,
            local_time: self.ctx.grid.format_local(instant),
            doctor_id,
        }
    }
}
