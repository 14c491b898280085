// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Legal status moves: `pending -> confirmed -> cancelled` and
/// `pending -> cancelled`. Nothing leaves `cancelled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if current_status == AppointmentStatus::Cancelled {
            warn!("Transition attempted on cancelled appointment: -> {}", new_status);
            return Err(AppointmentError::AlreadyCancelled);
        }

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidState { current: current_status });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled],
            AppointmentStatus::Confirmed => vec![AppointmentStatus::Cancelled],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Staff confirmation: pending only.
    pub fn validate_confirmable(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        match current_status {
            AppointmentStatus::Pending => Ok(()),
            current => Err(AppointmentError::InvalidState { current }),
        }
    }

    /// Staff rejection: pending only, with a distinct error once cancelled.
    pub fn validate_rejectable(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        match current_status {
            AppointmentStatus::Pending => Ok(()),
            AppointmentStatus::Cancelled => Err(AppointmentError::AlreadyCancelled),
            current => Err(AppointmentError::InvalidState { current }),
        }
    }

    /// Field edits (date, doctor, note) are allowed until cancellation.
    pub fn validate_editable(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        match current_status {
            AppointmentStatus::Cancelled => Err(AppointmentError::AlreadyCancelled),
            _ => Ok(()),
        }
    }

    /// Only requests that never locked a slot may be hard-deleted.
    pub fn validate_deletable(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        match current_status {
            AppointmentStatus::Pending => Ok(()),
            current => Err(AppointmentError::InvalidState { current }),
        }
    }
}
