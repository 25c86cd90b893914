use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::{
    FixedClock, InMemoryAppointmentStore, InMemoryDoctorDirectory, SchedulingService, TracingEventSink,
};
use appointment_cell::AppointmentError;

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, day, hour, minute, 0).unwrap()
}

fn hours(weekday: Weekday, start: u32, end: u32) -> WorkingHours {
    WorkingHours {
        weekday,
        start: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
    }
}

async fn service(doctor_id: Uuid, working_hours: Vec<WorkingHours>, policy: SchedulingPolicy) -> SchedulingService {
    let directory = Arc::new(InMemoryDoctorDirectory::new());
    directory
        .upsert(DoctorSchedulingProfile {
            doctor_id,
            working_hours,
            max_patient_appointments: None,
        })
        .await;

    SchedulingService::new(
        Arc::new(InMemoryAppointmentStore::new()),
        directory,
        Arc::new(TracingEventSink),
        Arc::new(FixedClock::new(at(7, 6, 0))),
        policy,
    )
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

#[tokio::test]
async fn test_full_working_day_in_half_hour_slots() {
    let doctor_id = Uuid::new_v4();
    let service = service(doctor_id, vec![hours(Weekday::Mon, 9, 17)], SchedulingPolicy::default()).await;

    let slots = service.available_slots(doctor_id, monday()).await.unwrap();

    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0], TimeRange::new(at(7, 9, 0), at(7, 9, 30)).unwrap());
    assert_eq!(slots[15], TimeRange::new(at(7, 16, 30), at(7, 17, 0)).unwrap());
    assert!(slots.windows(2).all(|pair| pair[0].end == pair[1].start));
}

#[tokio::test]
async fn test_booked_and_blocked_time_is_subtracted() {
    let doctor_id = Uuid::new_v4();
    let service = service(doctor_id, vec![hours(Weekday::Mon, 9, 17)], SchedulingPolicy::default()).await;
    let staff = Actor::staff(Uuid::new_v4());

    // 10:15-10:45 knocks out both the 10:00 and the 10:30 slot
    service
        .book(
            &staff,
            BookAppointmentRequest {
                patient_id: Uuid::new_v4(),
                doctor_id,
                range: TimeRange::new(at(7, 10, 15), at(7, 10, 45)).unwrap(),
                reason: "checkup".to_string(),
                appointment_type: None,
                patient_notes: None,
            },
        )
        .await
        .unwrap();

    service
        .block_time_slots(
            &Actor::doctor(doctor_id),
            doctor_id,
            BlockTimeSlotsRequest {
                range: TimeRange::new(at(7, 12, 0), at(7, 13, 0)).unwrap(),
                reason: "Lunch".to_string(),
                recurrence: None,
            },
        )
        .await
        .unwrap();

    let slots = service.available_slots(doctor_id, monday()).await.unwrap();
    assert_eq!(slots.len(), 12);

    let starts: Vec<DateTime<Utc>> = slots.iter().map(|s| s.start).collect();
    for taken in [at(7, 10, 0), at(7, 10, 30), at(7, 12, 0), at(7, 12, 30)] {
        assert!(!starts.contains(&taken), "{} should not be offered", taken);
    }
    assert!(starts.contains(&at(7, 11, 0)));
    assert!(starts.contains(&at(7, 13, 0)));
}

#[tokio::test]
async fn test_cancelled_appointment_does_not_occupy_a_slot() {
    let doctor_id = Uuid::new_v4();
    let service = service(doctor_id, vec![hours(Weekday::Mon, 9, 17)], SchedulingPolicy::default()).await;
    let staff = Actor::staff(Uuid::new_v4());

    let booked = service
        .book(
            &staff,
            BookAppointmentRequest {
                patient_id: Uuid::new_v4(),
                doctor_id,
                range: TimeRange::new(at(7, 9, 0), at(7, 9, 30)).unwrap(),
                reason: "checkup".to_string(),
                appointment_type: None,
                patient_notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(service.available_slots(doctor_id, monday()).await.unwrap().len(), 15);

    service.cancel(&staff, booked.id, "doctor unavailable").await.unwrap();
    assert_eq!(service.available_slots(doctor_id, monday()).await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_non_working_day_has_no_slots() {
    let doctor_id = Uuid::new_v4();
    let service = service(doctor_id, vec![hours(Weekday::Mon, 9, 17)], SchedulingPolicy::default()).await;

    let sunday = NaiveDate::from_ymd_opt(2030, 1, 6).unwrap();
    assert!(service.available_slots(doctor_id, sunday).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_split_shift_offers_both_windows() {
    let doctor_id = Uuid::new_v4();
    let service = service(
        doctor_id,
        vec![hours(Weekday::Mon, 14, 16), hours(Weekday::Mon, 8, 10)],
        SchedulingPolicy::default(),
    )
    .await;

    let slots = service.available_slots(doctor_id, monday()).await.unwrap();
    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0].start, at(7, 8, 0));
    assert_eq!(slots[3].end, at(7, 10, 0));
    assert_eq!(slots[4].start, at(7, 14, 0));
}

#[tokio::test]
async fn test_configured_granularity() {
    let doctor_id = Uuid::new_v4();
    let policy = SchedulingPolicy {
        slot_granularity: Duration::minutes(45),
        ..SchedulingPolicy::default()
    };
    let service = service(doctor_id, vec![hours(Weekday::Mon, 9, 12)], policy).await;

    let slots = service.available_slots(doctor_id, monday()).await.unwrap();
    assert_eq!(slots.len(), 4);
    assert!(slots.iter().all(|s| s.duration() == Duration::minutes(45)));
    assert_eq!(slots[3].end, at(7, 12, 0));
}

#[tokio::test]
async fn test_unknown_doctor() {
    let service = service(Uuid::new_v4(), vec![], SchedulingPolicy::default()).await;

    assert_matches!(
        service.available_slots(Uuid::new_v4(), monday()).await,
        Err(AppointmentError::NotFound { entity: "Doctor", .. })
    );
}
