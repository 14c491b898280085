// libs/doctor-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::StoreError;
use shared_utils::{TimeGridError, TimeOfDay};

// ==============================================================================
// DOCTOR DIRECTORY RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub status: DoctorStatus,
}

impl Doctor {
    pub fn is_active(&self) -> bool {
        self.status == DoctorStatus::Active
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    Active,
    Off,
    Retired,
}

impl fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorStatus::Active => write!(f, "active"),
            DoctorStatus::Off => write!(f, "off"),
            DoctorStatus::Retired => write!(f, "retired"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorFilter {
    pub specialty: Option<String>,
}

impl DoctorFilter {
    pub fn specialty(specialty: impl Into<String>) -> Self {
        Self { specialty: Some(specialty.into()) }
    }
}

// ==============================================================================
// WORK SCHEDULE MODELS
// ==============================================================================

/// Who a weekly shift belongs to. A shift always has exactly one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ShiftOwner {
    Doctor(Uuid),
    Nurse(Uuid),
}

impl ShiftOwner {
    pub fn id(&self) -> Uuid {
        match self {
            ShiftOwner::Doctor(id) | ShiftOwner::Nurse(id) => *id,
        }
    }

    pub fn kind(&self) -> OwnerKind {
        match self {
            ShiftOwner::Doctor(_) => OwnerKind::Doctor,
            ShiftOwner::Nurse(_) => OwnerKind::Nurse,
        }
    }

    pub fn doctor_id(&self) -> Option<Uuid> {
        match self {
            ShiftOwner::Doctor(id) => Some(*id),
            ShiftOwner::Nurse(_) => None,
        }
    }

    /// Builds an owner from the two nullable columns of the schedule table.
    pub fn from_columns(doctor_id: Option<Uuid>, lab_nurse_id: Option<Uuid>) -> Result<Self, ScheduleError> {
        match (doctor_id, lab_nurse_id) {
            (Some(doctor), None) => Ok(ShiftOwner::Doctor(doctor)),
            (None, Some(nurse)) => Ok(ShiftOwner::Nurse(nurse)),
            _ => Err(ScheduleError::InvalidOwner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Doctor,
    Nurse,
}

/// A recurring weekly shift. `shift_end` is an exclusive bound for slot
/// generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkShiftRow", into = "WorkShiftRow")]
pub struct WorkShift {
    pub id: Uuid,
    pub owner: ShiftOwner,
    pub day_of_week: u8, // 0 = Sunday, 1 = Monday, etc.
    pub shift_start: TimeOfDay,
    pub shift_end: TimeOfDay,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column layout of the `workschedules` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkShiftRow {
    id: Uuid,
    doctor_id: Option<Uuid>,
    lab_nurse_id: Option<Uuid>,
    day_of_week: u8,
    shift_start: TimeOfDay,
    shift_end: TimeOfDay,
    #[serde(default)]
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WorkShiftRow> for WorkShift {
    type Error = ScheduleError;

    fn try_from(row: WorkShiftRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner: ShiftOwner::from_columns(row.doctor_id, row.lab_nurse_id)?,
            day_of_week: row.day_of_week,
            shift_start: row.shift_start,
            shift_end: row.shift_end,
            note: row.note.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<WorkShift> for WorkShiftRow {
    fn from(shift: WorkShift) -> Self {
        Self {
            id: shift.id,
            doctor_id: shift.owner.doctor_id(),
            lab_nurse_id: match shift.owner {
                ShiftOwner::Nurse(id) => Some(id),
                ShiftOwner::Doctor(_) => None,
            },
            day_of_week: shift.day_of_week,
            shift_start: shift.shift_start,
            shift_end: shift.shift_end,
            note: Some(shift.note),
            created_at: shift.created_at,
            updated_at: shift.updated_at,
        }
    }
}

/// Validated shift ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkShift {
    pub owner: ShiftOwner,
    pub day_of_week: u8,
    pub shift_start: TimeOfDay,
    pub shift_end: TimeOfDay,
    pub note: String,
}

impl NewWorkShift {
    pub fn into_shift(self, now: DateTime<Utc>) -> WorkShift {
        WorkShift {
            id: Uuid::new_v4(),
            owner: self.owner,
            day_of_week: self.day_of_week,
            shift_start: self.shift_start,
            shift_end: self.shift_end,
            note: self.note,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShiftFilter {
    pub owner: Option<ShiftOwner>,
    pub owner_kind: Option<OwnerKind>,
    pub doctor_ids: Option<Vec<Uuid>>,
    pub day_of_week: Option<u8>,
}

impl ShiftFilter {
    pub fn matches(&self, shift: &WorkShift) -> bool {
        if let Some(owner) = &self.owner {
            if shift.owner != *owner {
                return false;
            }
        }
        if let Some(kind) = self.owner_kind {
            if shift.owner.kind() != kind {
                return false;
            }
        }
        if let Some(ids) = &self.doctor_ids {
            match shift.owner.doctor_id() {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }
        if let Some(day) = self.day_of_week {
            if shift.day_of_week != day {
                return false;
            }
        }
        true
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShiftRequest {
    pub doctor_id: Option<Uuid>,
    pub lab_nurse_id: Option<Uuid>,
    pub day_of_week: i32,
    pub shift_start: String,
    pub shift_end: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateShiftRequest {
    pub day_of_week: Option<i32>,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub note: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("A shift needs exactly one of doctor_id or lab_nurse_id")]
    InvalidOwner,

    #[error("Day of week must be between 0 (Sunday) and 6 (Saturday), got {0}")]
    InvalidDayOfWeek(i32),

    #[error("Invalid time format (expected HH:mm): {0}")]
    InvalidTimeFormat(String),

    #[error("Shift start {start} must be before shift end {end}")]
    InvalidRange { start: TimeOfDay, end: TimeOfDay },

    #[error("Shift overlaps existing shift {start}-{end}")]
    Overlap { start: TimeOfDay, end: TimeOfDay },

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Lab nurse not found")]
    LabNurseNotFound,

    #[error("Work schedule not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TimeGridError> for ScheduleError {
    fn from(err: TimeGridError) -> Self {
        match err {
            TimeGridError::InvalidTimeFormat(value) => ScheduleError::InvalidTimeFormat(value),
            other => ScheduleError::InvalidTimeFormat(other.to_string()),
        }
    }
}

pub fn validate_day_of_week(day: i32) -> Result<u8, ScheduleError> {
    if (0..=6).contains(&day) {
        Ok(day as u8)
    } else {
        Err(ScheduleError::InvalidDayOfWeek(day))
    }
}
