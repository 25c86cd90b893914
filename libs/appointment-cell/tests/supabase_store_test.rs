use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::*;
use appointment_cell::services::{
    AppointmentStore, DoctorDirectory, FixedClock, SchedulingService, StoreError,
    SupabaseAppointmentStore, SupabaseDoctorDirectory, TracingEventSink,
};
use appointment_cell::AppointmentError;
use shared_database::supabase::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, hour, minute, 0).unwrap()
}

fn client(mock_server: &MockServer) -> Arc<SupabaseClient> {
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    Arc::new(SupabaseClient::new(&config))
}

fn store(mock_server: &MockServer) -> SupabaseAppointmentStore {
    SupabaseAppointmentStore::new(client(mock_server), Some("service-token".to_string()))
}

#[tokio::test]
async fn test_overlap_query_uses_strict_bounds() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let existing_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("start_time", format!("lt.{}", at(11, 0).to_rfc3339())))
        .and(query_param("end_time", format!("gt.{}", at(10, 0).to_rfc3339())))
        .and(query_param("order", "start_time.asc"))
        .and(header("authorization", "Bearer service-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                existing_id,
                Uuid::new_v4(),
                doctor_id,
                "2030-01-07T10:30:00Z",
                "2030-01-07T11:00:00Z",
                "confirmed"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let range = TimeRange::new(at(10, 0), at(11, 0)).unwrap();
    let found = store(&mock_server)
        .find_appointments_by_doctor_in_range(doctor_id, &range, None)
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, existing_id);
    assert_eq!(found[0].status, AppointmentStatus::Confirmed);
    assert_eq!(found[0].range(), TimeRange::new(at(10, 30), at(11, 0)).unwrap());
}

#[tokio::test]
async fn test_reschedule_query_excludes_the_moving_appointment() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let moving_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("neq.{}", moving_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let range = TimeRange::new(at(10, 0), at(11, 0)).unwrap();
    let found = store(&mock_server)
        .find_appointments_by_doctor_in_range(doctor_id, &range, Some(moving_id))
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_count_only_considers_active_statuses() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", format!("eq.{}", patient_id)))
        .and(query_param("status", "in.(scheduled,confirmed)"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() }
        ])))
        .mount(&mock_server)
        .await;

    let count = store(&mock_server)
        .count_active_appointments(doctor_id, patient_id)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_exclusion_violation_maps_to_overlap() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({ "doctor_id": doctor_id, "status": "scheduled" })))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "conflicting key value violates exclusion constraint \"appointments_no_overlap\"",
            "23P01",
        )))
        .mount(&mock_server)
        .await;

    let result = store(&mock_server)
        .create_appointment(NewAppointment {
            patient_id,
            doctor_id,
            range: TimeRange::new(at(10, 0), at(10, 30)).unwrap(),
            appointment_type: AppointmentType::Consultation,
            reason: "checkup".to_string(),
            patient_notes: None,
            booked_by: patient_id,
            created_at: at(6, 0),
        })
        .await;

    assert_matches!(result, Err(StoreError::Overlap { .. }));
}

#[tokio::test]
async fn test_empty_patch_result_is_not_found() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id)))
        .and(body_partial_json(json!({ "status": "confirmed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let changes = AppointmentChanges {
        status: Some(AppointmentStatus::Confirmed),
        ..AppointmentChanges::new(Uuid::new_v4(), at(6, 0))
    };
    assert_matches!(
        store(&mock_server).update_appointment(id, changes).await,
        Err(StoreError::NotFound { entity: "Appointment", .. })
    );
}

#[tokio::test]
async fn test_server_errors_surface_as_backend_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/blocked_time_slots"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let range = TimeRange::new(at(10, 0), at(11, 0)).unwrap();
    assert_matches!(
        store(&mock_server).find_blocked_slots_by_doctor_in_range(Uuid::new_v4(), &range).await,
        Err(StoreError::Backend(_))
    );
}

#[tokio::test]
async fn test_blocked_slot_queries() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/blocked_time_slots"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("start_time", format!("lt.{}", at(13, 0).to_rfc3339())))
        .and(query_param("end_time", format!("gt.{}", at(12, 30).to_rfc3339())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::blocked_slot_row(slot_id, doctor_id, "2030-01-07T12:00:00Z", "2030-01-07T13:00:00Z")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/blocked_time_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::blocked_slot_row(slot_id, doctor_id, "2030-01-07T12:00:00Z", "2030-01-07T13:00:00Z")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/blocked_time_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store(&mock_server);
    let range = TimeRange::new(at(12, 30), at(13, 0)).unwrap();
    let slots = store.find_blocked_slots_by_doctor_in_range(doctor_id, &range).await.unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].id, slot_id);
    assert_eq!(slots[0].reason, "Lunch");
    assert_eq!(slots[0].range(), TimeRange::new(at(12, 0), at(13, 0)).unwrap());

    store.delete_blocked_slot(slot_id).await.unwrap();
    assert_matches!(
        store.delete_blocked_slot(Uuid::new_v4()).await,
        Err(StoreError::NotFound { entity: "Blocked time slot", .. })
    );
}

#[tokio::test]
async fn test_directory_reads_doctor_and_availability() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([MockSupabaseResponses::doctor_row(doctor_id, Some(4))])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("is_available", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_row(doctor_id, 1, "09:00:00", "12:00:00"),
            MockSupabaseResponses::availability_row(doctor_id, 1, "13:00", "17:00"),
            MockSupabaseResponses::availability_row(doctor_id, 9, "09:00:00", "17:00:00"),
        ])))
        .mount(&mock_server)
        .await;

    let directory = SupabaseDoctorDirectory::new(client(&mock_server), None);
    let profile = directory.scheduling_profile(doctor_id).await.unwrap();

    assert_eq!(profile.max_patient_appointments, Some(4));
    assert_eq!(profile.working_hours.len(), 2);
    let monday = profile.windows_for(Weekday::Mon);
    assert_eq!(monday[0].end, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    assert_eq!(monday[1].start, NaiveTime::from_hms_opt(13, 0, 0).unwrap());
}

#[tokio::test]
async fn test_directory_unknown_doctor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let directory = SupabaseDoctorDirectory::new(client(&mock_server), None);
    assert_matches!(
        directory.scheduling_profile(Uuid::new_v4()).await,
        Err(StoreError::NotFound { entity: "Doctor", .. })
    );
}

#[tokio::test]
async fn test_lost_race_reports_the_winning_appointment() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let winner_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([MockSupabaseResponses::doctor_row(doctor_id, None)])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_row(doctor_id, 1, "09:00:00", "17:00:00")
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/blocked_time_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // The pre-write check sees a free calendar; another process commits first
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                winner_id,
                Uuid::new_v4(),
                doctor_id,
                "2030-01-07T10:00:00Z",
                "2030-01-07T10:30:00Z",
                "scheduled"
            )
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "conflicting key value violates exclusion constraint",
            "23P01",
        )))
        .mount(&mock_server)
        .await;

    let supabase = client(&mock_server);
    let service = SchedulingService::new(
        Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase), None)),
        Arc::new(SupabaseDoctorDirectory::new(supabase, None)),
        Arc::new(TracingEventSink),
        Arc::new(FixedClock::new(at(6, 0))),
        SchedulingPolicy::default(),
    );

    let patient = Actor::patient(Uuid::new_v4());
    let result = service
        .book(
            &patient,
            BookAppointmentRequest {
                patient_id: patient.id,
                doctor_id,
                range: TimeRange::new(at(10, 0), at(10, 30)).unwrap(),
                reason: "checkup".to_string(),
                appointment_type: None,
                patient_notes: None,
            },
        )
        .await;

    assert_matches!(
        result,
        Err(AppointmentError::Conflict { appointment_ids, .. }) if appointment_ids == vec![winner_id]
    );
}
