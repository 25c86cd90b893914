use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppointmentError;
use crate::models::{Appointment, ConflictReport, TimeRange};
use crate::services::store::AppointmentStore;

pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Active appointments and blocked slots of the doctor overlapping `range`.
    /// `exclude_appointment_id` lets a reschedule ignore its own record.
    pub async fn check_conflicts(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictReport, AppointmentError> {
        debug!("Checking conflicts for doctor {} in {}", doctor_id, range);

        let appointment_ids = self
            .conflicting_appointments(doctor_id, range, exclude_appointment_id)
            .await?
            .into_iter()
            .map(|appointment| appointment.id)
            .collect();

        let blocked_slot_ids = self
            .store
            .find_blocked_slots_by_doctor_in_range(doctor_id, range)
            .await?
            .into_iter()
            .filter(|slot| slot.range().overlaps(range))
            .map(|slot| slot.id)
            .collect();

        let report = ConflictReport::new(appointment_ids, blocked_slot_ids);
        if report.has_conflict {
            warn!(
                "Conflict detected for doctor {} - {} appointments, {} blocked slots",
                doctor_id,
                report.appointment_ids.len(),
                report.blocked_slot_ids.len()
            );
        }
        Ok(report)
    }

    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        Ok(self
            .check_conflicts(doctor_id, range, exclude_appointment_id)
            .await?
            .has_conflict)
    }

    /// Cancelled, completed and no-show records never block the calendar.
    pub async fn conflicting_appointments(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self
            .store
            .find_appointments_by_doctor_in_range(doctor_id, range, exclude_appointment_id)
            .await?;

        Ok(appointments
            .into_iter()
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .filter(|appointment| appointment.status.is_active() && appointment.range().overlaps(range))
            .collect())
    }

    /// Every range within `window` the doctor cannot be booked into, sorted by start.
    pub async fn occupied_ranges(
        &self,
        doctor_id: Uuid,
        window: &TimeRange,
    ) -> Result<Vec<TimeRange>, AppointmentError> {
        let mut occupied: Vec<TimeRange> = self
            .conflicting_appointments(doctor_id, window, None)
            .await?
            .iter()
            .map(Appointment::range)
            .collect();

        occupied.extend(
            self.store
                .find_blocked_slots_by_doctor_in_range(doctor_id, window)
                .await?
                .iter()
                .map(|slot| slot.range()),
        );
        occupied.sort_by_key(|range| range.start);
        Ok(occupied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::models::{AppointmentChanges, AppointmentStatus, AppointmentType, NewAppointment, NewBlockedSlot};
    use crate::services::store::InMemoryAppointmentStore;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, 6, hour, minute, 0).unwrap()
    }

    fn range(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
    }

    async fn seed(store: &InMemoryAppointmentStore, doctor_id: Uuid, range: TimeRange) -> Appointment {
        let patient_id = Uuid::new_v4();
        store
            .create_appointment(NewAppointment {
                patient_id,
                doctor_id,
                range,
                appointment_type: AppointmentType::Consultation,
                reason: "checkup".to_string(),
                patient_notes: None,
                booked_by: patient_id,
                created_at: at(0, 0),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reports_overlapping_appointments_and_blocks() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let doctor_id = Uuid::new_v4();
        let booked = seed(&store, doctor_id, range((10, 0), (10, 30))).await;
        let block = store
            .create_blocked_slot(NewBlockedSlot {
                doctor_id,
                range: range((12, 0), (13, 0)),
                reason: "Lunch".to_string(),
                recurrence: None,
                series_id: None,
                created_by: doctor_id,
                created_at: at(0, 0),
            })
            .await
            .unwrap();

        let detector = ConflictDetectionService::new(store.clone());
        let report = detector
            .check_conflicts(doctor_id, &range((10, 15), (12, 15)), None)
            .await
            .unwrap();

        assert!(report.has_conflict);
        assert_eq!(report.appointment_ids, vec![booked.id]);
        assert_eq!(report.blocked_slot_ids, vec![block.id]);

        let touching = detector
            .check_conflicts(doctor_id, &range((10, 30), (12, 0)), None)
            .await
            .unwrap();
        assert!(!touching.has_conflict);
    }

    #[tokio::test]
    async fn ignores_terminal_and_excluded_appointments() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        let doctor_id = Uuid::new_v4();
        let cancelled = seed(&store, doctor_id, range((9, 0), (9, 30))).await;
        let mut changes = AppointmentChanges::new(doctor_id, at(1, 0));
        changes.status = Some(AppointmentStatus::CancelledByClinic);
        store.update_appointment(cancelled.id, changes).await.unwrap();

        let own = seed(&store, doctor_id, range((11, 0), (11, 30))).await;

        let detector = ConflictDetectionService::new(store.clone());
        assert!(!detector
            .has_conflict(doctor_id, &range((9, 0), (9, 30)), None)
            .await
            .unwrap());
        assert!(!detector
            .has_conflict(doctor_id, &range((11, 15), (11, 45)), Some(own.id))
            .await
            .unwrap());
        assert!(detector
            .has_conflict(doctor_id, &range((11, 15), (11, 45)), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn other_doctors_do_not_conflict() {
        let store = Arc::new(InMemoryAppointmentStore::new());
        seed(&store, Uuid::new_v4(), range((9, 0), (10, 0))).await;

        let detector = ConflictDetectionService::new(store.clone());
        let occupied = detector
            .occupied_ranges(Uuid::new_v4(), &range((0, 0), (23, 0)))
            .await
            .unwrap();
        assert!(occupied.is_empty());
    }
}
