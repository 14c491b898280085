// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use doctor_cell::models::Doctor;
use shared_models::auth::ActorRole;
use shared_models::error::StoreError;
use shared_utils::TimeGridError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub staff_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_confirmed(&self) -> bool {
        self.status == AppointmentStatus::Confirmed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A validated appointment ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub note: Option<String>,
}

impl NewAppointment {
    pub fn into_appointment(self, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            staff_id: self.staff_id,
            appointment_date: self.appointment_date,
            status: self.status,
            note: self.note,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update applied by the store. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AppointmentChanges {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(&self, appointment: &mut Appointment, now: DateTime<Utc>) {
        if let Some(date) = self.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(doctor_id) = self.doctor_id {
            appointment.doctor_id = doctor_id;
        }
        if let Some(staff_id) = self.staff_id {
            appointment.staff_id = Some(staff_id);
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(note) = &self.note {
            appointment.note = Some(note.clone());
        }
        appointment.updated_at = now;
    }
}

/// Store query. `from` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub doctor_ids: Option<Vec<Uuid>>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    pub fn confirmed_between(doctor_ids: Vec<Uuid>, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            doctor_ids: Some(doctor_ids),
            status: Some(AppointmentStatus::Confirmed),
            from: Some(from),
            until: Some(until),
            ..Default::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(ids) = &self.doctor_ids {
            if !ids.contains(&appointment.doctor_id) {
                return false;
            }
        }
        if let Some(patient_id) = self.patient_id {
            if appointment.patient_id != patient_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if appointment.appointment_date < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if appointment.appointment_date >= until {
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
pub struct BookRequest {
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub specialty: Option<String>,
    pub appointment_date: DateTime<Utc>,
    pub note: Option<String>,
    pub actor_role: ActorRole,
    pub staff_id: Option<Uuid>,
}

impl BookRequest {
    /// Clinic-side bookings lock the slot immediately; patient requests wait
    /// for a staff confirmation.
    pub fn initial_status(&self) -> AppointmentStatus {
        if self.actor_role.acts_for_clinic() || self.staff_id.is_some() {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<DateTime<Utc>>,
    pub doctor_id: Option<Uuid>,
    pub note: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSlot {
    pub start_time: DateTime<Utc>,
    /// `YYYY-MM-DDTHH:mm` in the clinic offset.
    pub local_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotCheck {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub doctor: Doctor,
    /// Confirmed appointments of the doctor on the target local date.
    pub confirmed_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectOutcome {
    pub appointment: Appointment,
    pub suggestions: Vec<AvailableSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<AvailableSlot>>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid date format (expected YYYY-MM-DD): {0}")]
    InvalidDateFormat(String),

    #[error("Invalid time format (expected HH:mm): {0}")]
    InvalidTimeFormat(String),

    #[error("No active doctor available{}", specialty.as_ref().map(|s| format!(" for specialty {}", s)).unwrap_or_default())]
    NoEligibleDoctor { specialty: Option<String> },

    #[error("No doctor works at the requested time")]
    NoScheduleOnDay,

    #[error("All scheduled doctors are booked at the requested time")]
    NoFreeSlot,

    #[error("Time slot is already taken")]
    SlotTaken,

    #[error("Appointment cannot be modified in current status: {current}")]
    InvalidState { current: AppointmentStatus },

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Appointment not found")]
    NotFound,

    #[error(transparent)]
    Store(StoreError),
}

impl AppointmentError {
    /// Stable snake_case code for callers that translate errors into
    /// user-facing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AppointmentError::InvalidDateFormat(_) => "invalid_date_format",
            AppointmentError::InvalidTimeFormat(_) => "invalid_time_format",
            AppointmentError::NoEligibleDoctor { .. } => "no_eligible_doctor",
            AppointmentError::NoScheduleOnDay => "no_schedule_on_day",
            AppointmentError::NoFreeSlot => "no_free_slot",
            AppointmentError::SlotTaken => "slot_taken",
            AppointmentError::InvalidState { .. } => "invalid_state",
            AppointmentError::AlreadyCancelled => "already_cancelled",
            AppointmentError::NotFound => "not_found",
            AppointmentError::Store(_) => "store",
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppointmentError::Store(_))
    }
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotTaken => AppointmentError::SlotTaken,
            StoreError::NotFound => AppointmentError::NotFound,
            other => AppointmentError::Store(other),
        }
    }
}

impl From<TimeGridError> for AppointmentError {
    fn from(err: TimeGridError) -> Self {
        match err {
            TimeGridError::InvalidTimeFormat(value) => AppointmentError::InvalidTimeFormat(value),
            TimeGridError::InvalidDateFormat(value) => AppointmentError::InvalidDateFormat(value),
            other => AppointmentError::InvalidDateFormat(other.to_string()),
        }
    }
}
