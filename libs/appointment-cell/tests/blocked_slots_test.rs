use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::{
    AppointmentEvent, ChannelEventSink, FixedClock, InMemoryAppointmentStore, InMemoryDoctorDirectory,
    SchedulingService,
};
use appointment_cell::AppointmentError;

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, day, hour, minute, 0).unwrap()
}

fn lunch(day: u32) -> TimeRange {
    TimeRange::new(at(day, 12, 0), at(day, 13, 0)).unwrap()
}

fn service(policy: SchedulingPolicy) -> (SchedulingService, tokio::sync::mpsc::UnboundedReceiver<AppointmentEvent>) {
    let (sink, events) = ChannelEventSink::channel();
    let service = SchedulingService::new(
        Arc::new(InMemoryAppointmentStore::new()),
        Arc::new(InMemoryDoctorDirectory::with_standard_hours()),
        Arc::new(sink),
        Arc::new(FixedClock::new(at(7, 6, 0))),
        policy,
    );
    (service, events)
}

fn block(range: TimeRange, recurrence: Option<Recurrence>) -> BlockTimeSlotsRequest {
    BlockTimeSlotsRequest {
        range,
        reason: "Lunch".to_string(),
        recurrence,
    }
}

fn booking(patient_id: Uuid, doctor_id: Uuid, range: TimeRange) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id,
        doctor_id,
        range,
        reason: "checkup".to_string(),
        appointment_type: None,
        patient_notes: None,
    }
}

#[tokio::test]
async fn test_blocked_slot_prevents_booking() {
    let (service, mut events) = service(SchedulingPolicy::default());
    let doctor = Actor::doctor(Uuid::new_v4());

    let result = service.block_time_slots(&doctor, doctor.id, block(lunch(7), None)).await.unwrap();
    assert_eq!(result.slots.len(), 1);
    assert!(result.overlapping_appointment_ids.is_empty());
    let slot = &result.slots[0];
    assert_eq!(slot.range(), lunch(7));
    assert_eq!(slot.series_id, None);
    assert_eq!(slot.created_by, doctor.id);

    assert_matches!(
        events.try_recv(),
        Ok(AppointmentEvent::TimeSlotsBlocked { doctor_id, slots, .. }) if doctor_id == doctor.id && slots.len() == 1
    );

    let patient = Actor::patient(Uuid::new_v4());
    let overlapping = TimeRange::new(at(7, 12, 30), at(7, 13, 30)).unwrap();
    assert_matches!(
        service.book(&patient, booking(patient.id, doctor.id, overlapping)).await,
        Err(AppointmentError::Conflict { appointment_ids, blocked_slot_ids })
            if appointment_ids.is_empty() && blocked_slot_ids == vec![slot.id]
    );

    let after_lunch = TimeRange::new(at(7, 13, 0), at(7, 13, 30)).unwrap();
    service.book(&patient, booking(patient.id, doctor.id, after_lunch)).await.unwrap();
}

#[tokio::test]
async fn test_recurring_block_materialises_each_occurrence() {
    let (service, _events) = service(SchedulingPolicy::default());
    let staff = Actor::staff(Uuid::new_v4());
    let doctor_id = Uuid::new_v4();

    let recurrence = Recurrence {
        frequency: Frequency::Daily,
        until: NaiveDate::from_ymd_opt(2030, 1, 11).unwrap(),
    };
    let result = service
        .block_time_slots(&staff, doctor_id, block(lunch(7), Some(recurrence)))
        .await
        .unwrap();

    assert_eq!(result.slots.len(), 5);
    let series_id = result.slots[0].series_id;
    assert!(series_id.is_some());
    assert!(result.slots.iter().all(|s| s.series_id == series_id));
    assert!(result.slots.iter().all(|s| s.recurrence == Some(recurrence)));

    let listed = service
        .list_blocked_slots(&staff, doctor_id, &TimeRange::new(at(9, 0, 0), at(10, 0, 0)).unwrap())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].range(), lunch(9));
}

#[tokio::test]
async fn test_excessive_recurrence_is_rejected() {
    let (service, _events) = service(SchedulingPolicy::default());
    let doctor = Actor::doctor(Uuid::new_v4());

    let recurrence = Recurrence {
        frequency: Frequency::Daily,
        until: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
    };
    assert_matches!(
        service.block_time_slots(&doctor, doctor.id, block(lunch(7), Some(recurrence))).await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn test_block_over_booked_appointment_is_rejected_by_default() {
    let (service, _events) = service(SchedulingPolicy::default());
    let doctor = Actor::doctor(Uuid::new_v4());
    let patient = Actor::patient(Uuid::new_v4());

    let booked = service
        .book(&patient, booking(patient.id, doctor.id, TimeRange::new(at(8, 12, 15), at(8, 12, 45)).unwrap()))
        .await
        .unwrap();

    let recurrence = Recurrence {
        frequency: Frequency::Daily,
        until: NaiveDate::from_ymd_opt(2030, 1, 9).unwrap(),
    };
    assert_matches!(
        service.block_time_slots(&doctor, doctor.id, block(lunch(7), Some(recurrence))).await,
        Err(AppointmentError::Conflict { appointment_ids, .. }) if appointment_ids == vec![booked.id]
    );

    let listed = service
        .list_blocked_slots(&doctor, doctor.id, &TimeRange::new(at(7, 0, 0), at(10, 0, 0)).unwrap())
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_allow_policy_blocks_and_reports_overlaps() {
    let policy = SchedulingPolicy {
        block_overlap_policy: BlockOverlapPolicy::Allow,
        ..SchedulingPolicy::default()
    };
    let (service, _events) = service(policy);
    let doctor = Actor::doctor(Uuid::new_v4());
    let patient = Actor::patient(Uuid::new_v4());

    let booked = service
        .book(&patient, booking(patient.id, doctor.id, TimeRange::new(at(7, 12, 0), at(7, 12, 30)).unwrap()))
        .await
        .unwrap();

    let result = service.block_time_slots(&doctor, doctor.id, block(lunch(7), None)).await.unwrap();
    assert_eq!(result.slots.len(), 1);
    assert_eq!(result.overlapping_appointment_ids, vec![booked.id]);

    // The existing appointment is untouched
    let still_there = service.get_appointment(&patient, booked.id).await.unwrap();
    assert_eq!(still_there.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_block_permissions() {
    let (service, _events) = service(SchedulingPolicy::default());
    let doctor_id = Uuid::new_v4();

    assert_matches!(
        service
            .block_time_slots(&Actor::patient(Uuid::new_v4()), doctor_id, block(lunch(7), None))
            .await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        service
            .block_time_slots(&Actor::doctor(Uuid::new_v4()), doctor_id, block(lunch(7), None))
            .await,
        Err(AppointmentError::Forbidden(_))
    );

    let mut no_reason = block(lunch(7), None);
    no_reason.reason = String::new();
    assert_matches!(
        service.block_time_slots(&Actor::doctor(doctor_id), doctor_id, no_reason).await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn test_delete_blocked_slot_reopens_time() {
    let (service, _events) = service(SchedulingPolicy::default());
    let doctor = Actor::doctor(Uuid::new_v4());
    let patient = Actor::patient(Uuid::new_v4());

    let slot = service
        .block_time_slots(&doctor, doctor.id, block(lunch(7), None))
        .await
        .unwrap()
        .slots
        .remove(0);

    assert_matches!(
        service.delete_blocked_slot(&Actor::doctor(Uuid::new_v4()), slot.id).await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        service.delete_blocked_slot(&doctor, Uuid::new_v4()).await,
        Err(AppointmentError::NotFound { entity: "Blocked time slot", .. })
    );

    service.delete_blocked_slot(&doctor, slot.id).await.unwrap();
    service.book(&patient, booking(patient.id, doctor.id, lunch(7))).await.unwrap();
}
