use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::AppointmentStatus;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(
        "Requested time overlaps existing bookings (appointments: [{}], blocked slots: [{}])",
        join_ids(.appointment_ids),
        join_ids(.blocked_slot_ids)
    )]
    Conflict {
        appointment_ids: Vec<Uuid>,
        blocked_slot_ids: Vec<Uuid>,
    },

    #[error("Appointment in status '{current}' cannot move to '{requested}': {reason}")]
    IllegalState {
        current: AppointmentStatus,
        requested: String,
        reason: String,
    },

    #[error("Patient {patient_id} already holds {active} active appointments with doctor {doctor_id} (limit {cap})")]
    CapacityExceeded {
        patient_id: Uuid,
        doctor_id: Uuid,
        cap: u32,
        active: u32,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    pub fn appointment_not_found(id: Uuid) -> Self {
        AppointmentError::NotFound { entity: "Appointment", id }
    }

    pub fn doctor_not_found(id: Uuid) -> Self {
        AppointmentError::NotFound { entity: "Doctor", id }
    }

    pub fn blocked_slot_not_found(id: Uuid) -> Self {
        AppointmentError::NotFound { entity: "Blocked time slot", id }
    }

    pub fn illegal_transition(current: AppointmentStatus, requested: impl ToString, reason: impl Into<String>) -> Self {
        AppointmentError::IllegalState {
            current,
            requested: requested.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable tag, used in recurring-series error entries.
    pub fn kind(&self) -> &'static str {
        match self {
            AppointmentError::ValidationError(_) => "validation_error",
            AppointmentError::NotFound { .. } => "not_found",
            AppointmentError::Forbidden(_) => "forbidden",
            AppointmentError::Conflict { .. } => "conflict",
            AppointmentError::IllegalState { .. } => "illegal_state",
            AppointmentError::CapacityExceeded { .. } => "capacity_exceeded",
            AppointmentError::DatabaseError(_) => "database_error",
        }
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::ValidationError(_) => AppError::ValidationError(message),
            AppointmentError::NotFound { .. } => AppError::NotFound(message),
            AppointmentError::Forbidden(_) => AppError::Forbidden(message),
            AppointmentError::Conflict { .. }
            | AppointmentError::IllegalState { .. }
            | AppointmentError::CapacityExceeded { .. } => AppError::Conflict(message),
            AppointmentError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
