use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, BlockedTimeSlot, TimeRange};

/// Domain events for the reminder/notification subsystem.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AppointmentEvent {
    AppointmentBooked {
        appointment: Appointment,
    },
    AppointmentRescheduled {
        appointment: Appointment,
        previous: TimeRange,
    },
    AppointmentCancelled {
        appointment: Appointment,
        cancelled_status: AppointmentStatus,
    },
    AppointmentConfirmed {
        appointment: Appointment,
    },
    AppointmentCompleted {
        appointment: Appointment,
    },
    AppointmentNoShow {
        appointment: Appointment,
    },
    TimeSlotsBlocked {
        doctor_id: Uuid,
        slots: Vec<BlockedTimeSlot>,
        at: DateTime<Utc>,
    },
}

impl AppointmentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppointmentEvent::AppointmentBooked { .. } => "appointment_booked",
            AppointmentEvent::AppointmentRescheduled { .. } => "appointment_rescheduled",
            AppointmentEvent::AppointmentCancelled { .. } => "appointment_cancelled",
            AppointmentEvent::AppointmentConfirmed { .. } => "appointment_confirmed",
            AppointmentEvent::AppointmentCompleted { .. } => "appointment_completed",
            AppointmentEvent::AppointmentNoShow { .. } => "appointment_no_show",
            AppointmentEvent::TimeSlotsBlocked { .. } => "time_slots_blocked",
        }
    }
}

/// Fire-and-forget publisher. Implementations must not block or fail the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AppointmentEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: AppointmentEvent) {
        match &event {
            AppointmentEvent::TimeSlotsBlocked { doctor_id, slots, .. } => {
                info!(event = event.name(), %doctor_id, count = slots.len(), "Scheduling event");
            }
            AppointmentEvent::AppointmentBooked { appointment }
            | AppointmentEvent::AppointmentRescheduled { appointment, .. }
            | AppointmentEvent::AppointmentCancelled { appointment, .. }
            | AppointmentEvent::AppointmentConfirmed { appointment }
            | AppointmentEvent::AppointmentCompleted { appointment }
            | AppointmentEvent::AppointmentNoShow { appointment } => {
                info!(
                    event = event.name(),
                    appointment_id = %appointment.id,
                    doctor_id = %appointment.doctor_id,
                    status = %appointment.status,
                    "Scheduling event"
                );
            }
        }
    }
}

/// Forwards events to an unbounded channel; a dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<AppointmentEvent>,
}

impl ChannelEventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AppointmentEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: AppointmentEvent) {
        if let Err(e) = self.sender.send(event) {
            debug!("Event receiver dropped, discarding {}", e.0.name());
        }
    }
}
