// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::context::SchedulingContext;
use shared_models::error::StoreError;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentError, AppointmentFilter, AppointmentStatus, BookRequest,
    CancelOutcome, NewAppointment, RejectOutcome, UpdateAppointmentRequest,
};
use crate::services::assignment::AssignmentService;
use crate::services::availability::AvailabilityService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::store::AppointmentStore;

const REJECTION_MARKER: &str = "[Rejected by staff]";

/// Write path for appointments. Every write that can lock a slot re-checks
/// confirmed conflicts first and then goes through the store's atomic guard.
pub struct BookingService {
    appointments: Arc<dyn AppointmentStore>,
    availability: AvailabilityService,
    assignment: AssignmentService,
    lifecycle: AppointmentLifecycleService,
}

impl BookingService {
    pub fn new(ctx: SchedulingContext) -> Self {
        Self {
            appointments: ctx.appointments.clone(),
            availability: AvailabilityService::new(ctx.clone()),
            assignment: AssignmentService::new(ctx),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub fn availability(&self) -> &AvailabilityService {
        &self.availability
    }

    pub fn assignment(&self) -> &AssignmentService {
        &self.assignment
    }

    #[instrument(
        skip(self, request),
        fields(patient_id = %request.patient_id, role = %request.actor_role)
    )]
    pub async fn book(&self, request: BookRequest) -> Result<Appointment, AppointmentError> {
        let status = request.initial_status();

        let doctor_id = match request.doctor_id {
            Some(id) => id,
            None => {
                self.assignment
                    .auto_assign(request.appointment_date, request.specialty.as_deref())
                    .await?
                    .doctor
                    .id
            }
        };

        self.ensure_slot_free(doctor_id, &request).await?;

        let new_appointment = NewAppointment {
            patient_id: request.patient_id,
            doctor_id,
            staff_id: request.staff_id,
            appointment_date: request.appointment_date,
            status,
            note: request.note,
        };

        let appointment = match status {
            AppointmentStatus::Confirmed => self.appointments.insert_confirmed_if_free(new_appointment).await?,
            _ => self.appointments.insert(new_appointment).await?,
        };

        info!(
            "Booked appointment {} with doctor {} ({})",
            appointment.id, appointment.doctor_id, appointment.status
        );
        Ok(appointment)
    }

    #[instrument(skip(self))]
    pub async fn confirm(&self, appointment_id: Uuid, staff_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.get(appointment_id).await?;
        self.lifecycle.validate_confirmable(appointment.status)?;

        if let Some(existing) = self
            .availability
            .confirmed_conflict(appointment.doctor_id, appointment.appointment_date, Some(appointment.id))
            .await?
        {
            warn!("Cannot confirm {}: conflicts with {}", appointment_id, existing.id);
            return Err(AppointmentError::SlotTaken);
        }

        let confirmed = match self.appointments.confirm_if_free(appointment_id, staff_id).await {
            Ok(confirmed) => confirmed,
            Err(StoreError::Conflict(_)) => {
                // Someone else moved the row out of pending in the meantime.
                let current = self.get(appointment_id).await?;
                warn!("Cannot confirm {}: it is now {}", appointment_id, current.status);
                return Err(AppointmentError::InvalidState {
                    current: current.status,
                });
            }
            Err(err) => return Err(err.into()),
        };
        info!("Appointment {} confirmed by staff {}", confirmed.id, staff_id);
        Ok(confirmed)
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        appointment_id: Uuid,
        staff_id: Uuid,
        reason: Option<&str>,
    ) -> Result<RejectOutcome, AppointmentError> {
        let appointment = self.get(appointment_id).await?;
        self.lifecycle.validate_rejectable(appointment.status)?;

        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Cancelled),
            staff_id: Some(staff_id),
            note: rejection_note(appointment.note.as_deref(), reason),
            ..Default::default()
        };
        let rejected = self.appointments.update(appointment_id, &changes).await?;
        let suggestions = self.availability.suggestions_for(&rejected, None).await?;

        info!(
            "Appointment {} rejected by staff {} ({} suggestions)",
            rejected.id,
            staff_id,
            suggestions.len()
        );
        Ok(RejectOutcome {
            appointment: rejected,
            suggestions,
        })
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<CancelOutcome, AppointmentError> {
        let appointment = self.get(appointment_id).await?;
        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        let cancelled = self
            .appointments
            .update(appointment_id, &AppointmentChanges::status(AppointmentStatus::Cancelled))
            .await?;

        // Only a confirmed booking freed a locked slot worth re-offering.
        let suggestions = if appointment.is_confirmed() {
            let slots = self.availability.suggestions_for(&cancelled, None).await?;
            (!slots.is_empty()).then_some(slots)
        } else {
            None
        };

        info!("Appointment {} cancelled (was {})", cancelled.id, appointment.status);
        Ok(CancelOutcome {
            appointment: cancelled,
            suggestions,
        })
    }

    /// Edits date, doctor or note. Does not re-check slot conflicts.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get(appointment_id).await?;
        self.lifecycle.validate_editable(appointment.status)?;

        let changes = AppointmentChanges {
            appointment_date: request.appointment_date,
            doctor_id: request.doctor_id,
            note: request.note,
            ..Default::default()
        };
        let updated = self.appointments.update(appointment_id, &changes).await?;

        info!("Appointment {} updated", updated.id);
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        let appointment = self.get(appointment_id).await?;
        self.lifecycle.validate_deletable(appointment.status)?;

        self.appointments.delete(appointment_id).await?;
        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);
        self.appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// A patient's appointments, earliest first.
    pub async fn patient_appointments(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            patient_id: Some(patient_id),
            status,
            ..Default::default()
        };
        Ok(self.appointments.find(&filter).await?)
    }

    /// A doctor's appointments, earliest first.
    pub async fn doctor_appointments(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            doctor_ids: Some(vec![doctor_id]),
            status,
            ..Default::default()
        };
        Ok(self.appointments.find(&filter).await?)
    }

    /// Every appointment, most recently created first.
    pub async fn all_appointments(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            status,
            ..Default::default()
        };
        let mut appointments = self.appointments.find(&filter).await?;
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("Listing {} appointments", appointments.len());
        Ok(appointments)
    }

    async fn ensure_slot_free(&self, doctor_id: Uuid, request: &BookRequest) -> Result<(), AppointmentError> {
        match self
            .availability
            .confirmed_conflict(doctor_id, request.appointment_date, None)
            .await?
        {
            Some(existing) => {
                warn!(
                    "Slot {} for doctor {} conflicts with appointment {}",
                    request.appointment_date, doctor_id, existing.id
                );
                Err(AppointmentError::SlotTaken)
            }
            None => Ok(()),
        }
    }
}

/// Appends the rejection reason to an existing note. Without a reason the
/// note is left as it was.
fn rejection_note(existing: Option<&str>, reason: Option<&str>) -> Option<String> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty())?;
    let note = format!("{}\n{}: {}", existing.unwrap_or_default(), REJECTION_MARKER, reason);
    Some(note.trim().to_string())
}
