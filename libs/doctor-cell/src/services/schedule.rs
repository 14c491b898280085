// libs/doctor-cell/src/services/schedule.rs
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::error::StoreError;
use shared_utils::time_grid::{ranges_overlap, time_is_between};
use shared_utils::TimeOfDay;

use crate::models::{
    validate_day_of_week, CreateShiftRequest, Doctor, DoctorFilter, NewWorkShift, OwnerKind,
    ScheduleError, ShiftFilter, ShiftOwner, UpdateShiftRequest, WorkShift,
};
use crate::store::{DoctorDirectory, WorkScheduleStore};

/// Weekly shift index: which owners work when, plus validated admin writes.
pub struct ScheduleService {
    schedules: Arc<dyn WorkScheduleStore>,
    directory: Arc<dyn DoctorDirectory>,
}

impl ScheduleService {
    pub fn new(schedules: Arc<dyn WorkScheduleStore>, directory: Arc<dyn DoctorDirectory>) -> Self {
        Self { schedules, directory }
    }

    // ==========================================================================
    // READ SIDE
    // ==========================================================================

    pub async fn shifts_for(&self, owner: ShiftOwner, day_of_week: u8) -> Result<Vec<WorkShift>, StoreError> {
        let filter = ShiftFilter {
            owner: Some(owner),
            day_of_week: Some(day_of_week),
            ..Default::default()
        };
        self.schedules.find(&filter).await
    }

    /// Shifts of any of `doctor_ids` on `day_of_week`.
    pub async fn shifts_for_doctors(&self, doctor_ids: &[Uuid], day_of_week: u8) -> Result<Vec<WorkShift>, StoreError> {
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = ShiftFilter {
            doctor_ids: Some(doctor_ids.to_vec()),
            day_of_week: Some(day_of_week),
            ..Default::default()
        };
        let shifts = self.schedules.find(&filter).await?;
        debug!("Found {} shifts for {} doctors on day {}", shifts.len(), doctor_ids.len(), day_of_week);
        Ok(shifts)
    }

    /// Shifts on `day_of_week` of active doctors in `specialty`, paired with
    /// their doctor, in directory order.
    pub async fn shifts_for_specialty(&self, specialty: &str, day_of_week: u8) -> Result<Vec<(Doctor, WorkShift)>, StoreError> {
        let doctors = self.directory.find_active(&DoctorFilter::specialty(specialty)).await?;
        let ids: Vec<Uuid> = doctors.iter().map(|d| d.id).collect();
        let shifts = self.shifts_for_doctors(&ids, day_of_week).await?;

        let mut paired = Vec::new();
        for doctor in doctors {
            for shift in shifts.iter().filter(|s| s.owner == ShiftOwner::Doctor(doctor.id)) {
                paired.push((doctor.clone(), shift.clone()));
            }
        }
        Ok(paired)
    }

    /// The doctor's whole week. Unknown doctors are an error, not an empty week.
    pub async fn doctor_schedule(&self, doctor_id: Uuid) -> Result<Vec<WorkShift>, ScheduleError> {
        self.ensure_owner_exists(ShiftOwner::Doctor(doctor_id)).await?;
        Ok(self.week_of(ShiftOwner::Doctor(doctor_id)).await?)
    }

    pub async fn nurse_schedule(&self, nurse_id: Uuid) -> Result<Vec<WorkShift>, ScheduleError> {
        self.ensure_owner_exists(ShiftOwner::Nurse(nurse_id)).await?;
        Ok(self.week_of(ShiftOwner::Nurse(nurse_id)).await?)
    }

    async fn week_of(&self, owner: ShiftOwner) -> Result<Vec<WorkShift>, StoreError> {
        let filter = ShiftFilter {
            owner: Some(owner),
            ..Default::default()
        };
        let mut shifts = self.schedules.find(&filter).await?;
        shifts.sort_by_key(|s| (s.day_of_week, s.shift_start));
        Ok(shifts)
    }

    /// Owners of `kind` with a shift on `day_of_week` that contains `time`
    /// (both shift ends inclusive). Each owner appears once.
    pub async fn staff_on_duty(&self, day_of_week: i32, time: &str, kind: OwnerKind) -> Result<Vec<ShiftOwner>, ScheduleError> {
        let day = validate_day_of_week(day_of_week)?;
        let time = TimeOfDay::parse(time)?;

        let filter = ShiftFilter {
            owner_kind: Some(kind),
            day_of_week: Some(day),
            ..Default::default()
        };
        let shifts = self.schedules.find(&filter).await?;

        let mut seen = HashSet::new();
        Ok(shifts
            .into_iter()
            .filter(|s| time_is_between(time, s.shift_start, s.shift_end))
            .map(|s| s.owner)
            .filter(|owner| seen.insert(*owner))
            .collect())
    }

    // ==========================================================================
    // WRITE SIDE
    // ==========================================================================

    pub async fn create_shift(&self, request: CreateShiftRequest) -> Result<WorkShift, ScheduleError> {
        let owner = ShiftOwner::from_columns(request.doctor_id, request.lab_nurse_id)?;
        let day_of_week = validate_day_of_week(request.day_of_week)?;
        let shift_start = TimeOfDay::parse(&request.shift_start)?;
        let shift_end = TimeOfDay::parse(&request.shift_end)?;
        validate_range(shift_start, shift_end)?;

        self.ensure_owner_exists(owner).await?;
        self.ensure_no_overlap(owner, day_of_week, shift_start, shift_end, None).await?;

        let created = self
            .schedules
            .create(NewWorkShift {
                owner,
                day_of_week,
                shift_start,
                shift_end,
                note: request.note.unwrap_or_default(),
            })
            .await?;

        info!("Created work shift {} ({} {}-{})", created.id, created.day_of_week, created.shift_start, created.shift_end);
        Ok(created)
    }

    pub async fn update_shift(&self, shift_id: Uuid, request: UpdateShiftRequest) -> Result<WorkShift, ScheduleError> {
        let mut shift = self
            .schedules
            .find_by_id(shift_id)
            .await?
            .ok_or(ScheduleError::NotFound)?;

        if let Some(day) = request.day_of_week {
            shift.day_of_week = validate_day_of_week(day)?;
        }
        if let Some(start) = &request.shift_start {
            shift.shift_start = TimeOfDay::parse(start)?;
        }
        if let Some(end) = &request.shift_end {
            shift.shift_end = TimeOfDay::parse(end)?;
        }
        if let Some(note) = request.note {
            shift.note = note;
        }
        validate_range(shift.shift_start, shift.shift_end)?;

        self.ensure_no_overlap(shift.owner, shift.day_of_week, shift.shift_start, shift.shift_end, Some(shift.id))
            .await?;

        let updated = self.schedules.update(shift).await.map_err(not_found)?;
        info!("Updated work shift {}", updated.id);
        Ok(updated)
    }

    pub async fn delete_shift(&self, shift_id: Uuid) -> Result<(), ScheduleError> {
        if self.schedules.find_by_id(shift_id).await?.is_none() {
            return Err(ScheduleError::NotFound);
        }

        self.schedules.delete(shift_id).await.map_err(not_found)?;
        info!("Deleted work shift {}", shift_id);
        Ok(())
    }

    async fn ensure_owner_exists(&self, owner: ShiftOwner) -> Result<(), ScheduleError> {
        match owner {
            ShiftOwner::Doctor(doctor_id) => {
                if self.directory.find_by_id(doctor_id).await?.is_none() {
                    warn!("Unknown doctor {}", doctor_id);
                    return Err(ScheduleError::DoctorNotFound);
                }
            }
            ShiftOwner::Nurse(nurse_id) => {
                if !self.directory.lab_nurse_exists(nurse_id).await? {
                    warn!("Unknown lab nurse {}", nurse_id);
                    return Err(ScheduleError::LabNurseNotFound);
                }
            }
        }
        Ok(())
    }

    async fn ensure_no_overlap(
        &self,
        owner: ShiftOwner,
        day_of_week: u8,
        start: TimeOfDay,
        end: TimeOfDay,
        exclude: Option<Uuid>,
    ) -> Result<(), ScheduleError> {
        let existing = self.shifts_for(owner, day_of_week).await?;

        let clash = existing
            .iter()
            .filter(|s| Some(s.id) != exclude)
            .find(|s| ranges_overlap(start, end, s.shift_start, s.shift_end));

        match clash {
            Some(other) => {
                warn!("Shift {}-{} overlaps {} on day {}", start, end, other.id, day_of_week);
                Err(ScheduleError::Overlap {
                    start: other.shift_start,
                    end: other.shift_end,
                })
            }
            None => Ok(()),
        }
    }
}

fn validate_range(start: TimeOfDay, end: TimeOfDay) -> Result<(), ScheduleError> {
    if start < end {
        Ok(())
    } else {
        Err(ScheduleError::InvalidRange { start, end })
    }
}

fn not_found(err: StoreError) -> ScheduleError {
    match err {
        StoreError::NotFound => ScheduleError::NotFound,
        other => ScheduleError::Store(other),
    }
}
