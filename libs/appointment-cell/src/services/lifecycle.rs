// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::AppointmentError;
use crate::models::{Actor, ActorRole, Appointment, AppointmentStatus};

/// Which side of the visit asked for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTrigger {
    Patient,
    Clinic,
}

impl TransitionTrigger {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            ActorRole::Patient => TransitionTrigger::Patient,
            ActorRole::Doctor | ActorRole::Staff | ActorRole::Admin => TransitionTrigger::Clinic,
        }
    }

    pub fn cancellation_status(self) -> AppointmentStatus {
        match self {
            TransitionTrigger::Patient => AppointmentStatus::CancelledByPatient,
            TransitionTrigger::Clinic => AppointmentStatus::CancelledByClinic,
        }
    }
}

/// Appointment status transitions and who may trigger them.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentStateMachine;

impl AppointmentStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// The single transition table. Returns the new status or an
    /// `IllegalState` naming both ends of the attempted move.
    pub fn transition(
        &self,
        appointment: &Appointment,
        requested: AppointmentStatus,
        trigger: TransitionTrigger,
        now: DateTime<Utc>,
    ) -> Result<AppointmentStatus, AppointmentError> {
        use AppointmentStatus::*;
        use TransitionTrigger::*;

        let current = appointment.status;
        debug!("Validating status transition {} -> {} ({:?})", current, requested, trigger);

        if current.is_terminal() {
            warn!("Attempted transition out of terminal status {} for appointment {}", current, appointment.id);
            return Err(AppointmentError::illegal_transition(
                current,
                requested,
                "appointment is already in a terminal status",
            ));
        }

        let allowed = match (current, requested, trigger) {
            (Scheduled, Confirmed, Clinic) => true,
            (Confirmed, Completed, Clinic) => true,
            (Scheduled | Confirmed, CancelledByPatient, Patient) => true,
            (Scheduled | Confirmed, CancelledByClinic, Clinic) => true,
            (Scheduled | Confirmed, NoShow, Clinic) => {
                if now <= appointment.end_time {
                    return Err(AppointmentError::illegal_transition(
                        current,
                        requested,
                        format!(
                            "no-show can only be recorded after the appointment ends at {}",
                            appointment.end_time.to_rfc3339()
                        ),
                    ));
                }
                true
            }
            _ => false,
        };

        if !allowed {
            warn!("Invalid status transition attempted: {} -> {}", current, requested);
            return Err(AppointmentError::illegal_transition(
                current,
                requested,
                "transition is not permitted",
            ));
        }

        Ok(requested)
    }

    /// Statuses reachable from `current` by `trigger`, ignoring timing rules.
    #[cfg(test)]
    fn allowed_transitions(
        &self,
        current: AppointmentStatus,
        trigger: TransitionTrigger,
    ) -> Vec<AppointmentStatus> {
        use AppointmentStatus::*;

        match (current, trigger) {
            (Scheduled, TransitionTrigger::Clinic) => vec![Confirmed, CancelledByClinic, NoShow],
            (Confirmed, TransitionTrigger::Clinic) => vec![Completed, CancelledByClinic, NoShow],
            (Scheduled | Confirmed, TransitionTrigger::Patient) => vec![CancelledByPatient],
            _ => vec![],
        }
    }

    /// Status an appointment takes after its time moves. A confirmed visit must
    /// be reconfirmed; terminal appointments cannot be moved.
    pub fn status_after_reschedule(
        &self,
        current: AppointmentStatus,
    ) -> Result<AppointmentStatus, AppointmentError> {
        match current {
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed => Ok(AppointmentStatus::Scheduled),
            terminal => Err(AppointmentError::illegal_transition(
                terminal,
                AppointmentStatus::Scheduled,
                "terminal appointments cannot be rescheduled",
            )),
        }
    }
}
