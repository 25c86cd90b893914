//! Authorization predicates, one per scheduling operation.

use uuid::Uuid;

use crate::models::{Actor, ActorRole, Appointment};

fn is_participant(actor: &Actor, appointment: &Appointment) -> bool {
    match actor.role {
        ActorRole::Patient => actor.id == appointment.patient_id,
        ActorRole::Doctor => actor.id == appointment.doctor_id,
        ActorRole::Staff | ActorRole::Admin => false,
    }
}

fn is_clinic_side(actor: &Actor, doctor_id: Uuid) -> bool {
    actor.is_clinic_staff() || (actor.role == ActorRole::Doctor && actor.id == doctor_id)
}

/// Patients book for themselves, doctors on their own calendar, staff for anyone.
pub fn can_book(actor: &Actor, patient_id: Uuid, doctor_id: Uuid) -> bool {
    match actor.role {
        ActorRole::Patient => actor.id == patient_id,
        ActorRole::Doctor => actor.id == doctor_id,
        ActorRole::Staff | ActorRole::Admin => true,
    }
}

pub fn can_view(actor: &Actor, appointment: &Appointment) -> bool {
    actor.is_clinic_staff() || is_participant(actor, appointment)
}

pub fn can_reschedule(actor: &Actor, appointment: &Appointment) -> bool {
    can_view(actor, appointment)
}

pub fn can_cancel(actor: &Actor, appointment: &Appointment) -> bool {
    can_view(actor, appointment)
}

/// Confirm, complete and no-show are clinic-side decisions.
pub fn can_manage_status(actor: &Actor, appointment: &Appointment) -> bool {
    is_clinic_side(actor, appointment.doctor_id)
}

pub fn can_update_notes(actor: &Actor, appointment: &Appointment, touches_staff_notes: bool) -> bool {
    match actor.role {
        ActorRole::Patient => actor.id == appointment.patient_id && !touches_staff_notes,
        _ => is_clinic_side(actor, appointment.doctor_id),
    }
}

pub fn can_view_calendar(actor: &Actor, doctor_id: Uuid) -> bool {
    is_clinic_side(actor, doctor_id)
}

/// Conflict ids expose other patients' bookings.
pub fn can_inspect_conflicts(actor: &Actor, doctor_id: Uuid) -> bool {
    is_clinic_side(actor, doctor_id)
}

pub fn can_manage_blocks(actor: &Actor, doctor_id: Uuid) -> bool {
    is_clinic_side(actor, doctor_id)
}

pub fn can_delete(actor: &Actor) -> bool {
    actor.is_clinic_staff()
}
