use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentChanges, BlockedTimeSlot, NewAppointment, NewBlockedSlot, TimeRange,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The storage-level exclusion guard refused a write that would overlap
    /// occupied time. Ids are empty when the backend cannot name them.
    #[error("Write rejected by overlap guard")]
    Overlap {
        appointment_ids: Vec<Uuid>,
        blocked_slot_ids: Vec<Uuid>,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => AppointmentError::NotFound { entity, id },
            StoreError::Overlap { appointment_ids, blocked_slot_ids } => AppointmentError::Conflict {
                appointment_ids,
                blocked_slot_ids,
            },
            StoreError::Backend(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}

/// Durable store for appointments and blocked slots. Range queries use the
/// half-open overlap law of [`TimeRange::overlaps`].
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Every appointment of the doctor overlapping `range`, whatever its status.
    async fn find_appointments_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn find_blocked_slots_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
    ) -> Result<Vec<BlockedTimeSlot>, StoreError>;

    /// Inserts with status `scheduled`. Fails with `Overlap` if the new range
    /// collides with an active appointment or blocked slot of the doctor.
    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Applies `changes`. Moving the range is guarded like `create_appointment`.
    async fn update_appointment(&self, id: Uuid, changes: AppointmentChanges) -> Result<Appointment, StoreError>;

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError>;

    /// Appointments of this patient with this doctor in scheduled/confirmed.
    async fn count_active_appointments(&self, doctor_id: Uuid, patient_id: Uuid) -> Result<u32, StoreError>;

    async fn create_blocked_slot(&self, slot: NewBlockedSlot) -> Result<BlockedTimeSlot, StoreError>;

    async fn create_blocked_slots(&self, slots: Vec<NewBlockedSlot>) -> Result<Vec<BlockedTimeSlot>, StoreError> {
        let mut created = Vec::with_capacity(slots.len());
        for slot in slots {
            created.push(self.create_blocked_slot(slot).await?);
        }
        Ok(created)
    }

    async fn get_blocked_slot(&self, id: Uuid) -> Result<Option<BlockedTimeSlot>, StoreError>;

    async fn delete_blocked_slot(&self, id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    appointments: HashMap<Uuid, Appointment>,
    blocked_slots: HashMap<Uuid, BlockedTimeSlot>,
}

impl Tables {
    /// Exclusion check run while holding the write lock.
    fn overlap_guard(&self, doctor_id: Uuid, range: &TimeRange, exclude_id: Option<Uuid>) -> Result<(), StoreError> {
        let appointment_ids: Vec<Uuid> = self
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && Some(a.id) != exclude_id)
            .filter(|a| a.status.is_active() && a.range().overlaps(range))
            .map(|a| a.id)
            .collect();
        let blocked_slot_ids: Vec<Uuid> = self
            .blocked_slots
            .values()
            .filter(|s| s.doctor_id == doctor_id && s.range().overlaps(range))
            .map(|s| s.id)
            .collect();

        if appointment_ids.is_empty() && blocked_slot_ids.is_empty() {
            return Ok(());
        }
        warn!("Overlap guard rejected write for doctor {} at {}", doctor_id, range);
        Err(StoreError::Overlap { appointment_ids, blocked_slot_ids })
    }
}

/// Process-local store; the write lock makes guard-then-insert atomic.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    tables: RwLock<Tables>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_start<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn find_appointments_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        let found = tables
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && Some(a.id) != exclude_id)
            .filter(|a| a.range().overlaps(range))
            .cloned()
            .collect();
        Ok(sorted_by_start(found, |a: &Appointment| a.start_time))
    }

    async fn find_blocked_slots_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
    ) -> Result<Vec<BlockedTimeSlot>, StoreError> {
        let tables = self.tables.read().await;
        let found = tables
            .blocked_slots
            .values()
            .filter(|s| s.doctor_id == doctor_id && s.range().overlaps(range))
            .cloned()
            .collect();
        Ok(sorted_by_start(found, |s: &BlockedTimeSlot| s.start_time))
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;
        tables.overlap_guard(appointment.doctor_id, &appointment.range, None)?;

        let created = appointment.into_appointment(Uuid::new_v4());
        debug!("Stored appointment {}", created.id);
        tables.appointments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_appointment(&self, id: Uuid, changes: AppointmentChanges) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;
        let doctor_id = tables
            .appointments
            .get(&id)
            .map(|a| a.doctor_id)
            .ok_or(StoreError::NotFound { entity: "Appointment", id })?;

        if let Some(range) = changes.range {
            tables.overlap_guard(doctor_id, &range, Some(id))?;
        }

        let appointment = tables
            .appointments
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "Appointment", id })?;
        changes.apply_to(appointment);
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .appointments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { entity: "Appointment", id })
    }

    async fn count_active_appointments(&self, doctor_id: Uuid, patient_id: Uuid) -> Result<u32, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.patient_id == patient_id && a.status.is_active())
            .count();
        Ok(count as u32)
    }

    async fn create_blocked_slot(&self, slot: NewBlockedSlot) -> Result<BlockedTimeSlot, StoreError> {
        let created = slot.into_slot(Uuid::new_v4());
        self.tables.write().await.blocked_slots.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_blocked_slots(&self, slots: Vec<NewBlockedSlot>) -> Result<Vec<BlockedTimeSlot>, StoreError> {
        let mut tables = self.tables.write().await;
        let created: Vec<BlockedTimeSlot> = slots
            .into_iter()
            .map(|slot| slot.into_slot(Uuid::new_v4()))
            .collect();
        for slot in &created {
            tables.blocked_slots.insert(slot.id, slot.clone());
        }
        Ok(created)
    }

    async fn get_blocked_slot(&self, id: Uuid) -> Result<Option<BlockedTimeSlot>, StoreError> {
        Ok(self.tables.read().await.blocked_slots.get(&id).cloned())
    }

    async fn delete_blocked_slot(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .blocked_slots
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { entity: "Blocked time slot", id })
    }
}
