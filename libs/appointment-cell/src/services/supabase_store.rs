// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{
    Appointment, AppointmentChanges, AppointmentStatus, BlockedTimeSlot, NewAppointment,
    NewBlockedSlot, TimeRange,
};
use crate::services::store::{AppointmentStore, StoreError};

const APPOINTMENTS: &str = "/rest/v1/appointments";
const BLOCKED_SLOTS: &str = "/rest/v1/blocked_time_slots";

/// PostgREST-backed store. Double-booking across processes is closed by a
/// range exclusion constraint on `appointments`; PostgREST reports its
/// violation as HTTP 409, which surfaces here as `StoreError::Overlap`.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    access_token: Option<String>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>, access_token: Option<String>) -> Self {
        Self {
            supabase,
            access_token: access_token.filter(|token| !token.is_empty()),
        }
    }

    fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    async fn get_rows<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, self.token(), None)
            .await
            .map_err(map_supabase_error)?;
        parse_rows(rows)
    }

    async fn write_rows<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                method,
                path,
                self.token(),
                body,
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(map_supabase_error)?;
        parse_rows(rows)
    }
}

fn encode_time(at: DateTime<Utc>) -> String {
    urlencoding::encode(&at.to_rfc3339()).into_owned()
}

/// Strict comparisons keep the half-open overlap law on the database side.
fn overlap_filter(range: &TimeRange) -> String {
    format!(
        "start_time=lt.{}&end_time=gt.{}",
        encode_time(range.end),
        encode_time(range.start)
    )
}

fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| StoreError::Backend(format!("Failed to parse rows: {}", e)))
}

fn map_supabase_error(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<SupabaseError>() {
        Some(SupabaseError::Conflict(body)) => {
            debug!("Exclusion constraint rejected write: {}", body);
            StoreError::Overlap {
                appointment_ids: vec![],
                blocked_slot_ids: vec![],
            }
        }
        _ => {
            error!("Supabase request failed: {}", err);
            StoreError::Backend(err.to_string())
        }
    }
}

fn changes_to_json(changes: &AppointmentChanges) -> Value {
    let mut update_data = serde_json::Map::new();

    if let Some(range) = changes.range {
        update_data.insert("start_time".to_string(), json!(range.start.to_rfc3339()));
        update_data.insert("end_time".to_string(), json!(range.end.to_rfc3339()));
    }
    if let Some(status) = changes.status {
        update_data.insert("status".to_string(), json!(status));
    }
    if let Some(notes) = &changes.patient_notes {
        update_data.insert("patient_notes".to_string(), json!(notes));
    }
    if let Some(notes) = &changes.staff_notes {
        update_data.insert("staff_notes".to_string(), json!(notes));
    }
    if let Some(reason) = &changes.cancellation_reason {
        update_data.insert("cancellation_reason".to_string(), json!(reason));
    }
    if let Some(at) = changes.cancelled_at {
        update_data.insert("cancelled_at".to_string(), json!(at.to_rfc3339()));
    }
    if let Some(reason) = &changes.reschedule_reason {
        update_data.insert("reschedule_reason".to_string(), json!(reason));
    }
    update_data.insert("updated_by".to_string(), json!(changes.updated_by));
    update_data.insert("updated_at".to_string(), json!(changes.updated_at.to_rfc3339()));

    Value::Object(update_data)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Backend(format!("Failed to encode row: {}", e)))
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        Ok(self.get_rows(&path).await?.into_iter().next())
    }

    async fn find_appointments_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut path = format!("{}?doctor_id=eq.{}&{}", APPOINTMENTS, doctor_id, overlap_filter(range));
        if let Some(exclude_id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", exclude_id));
        }
        path.push_str("&order=start_time.asc");
        self.get_rows(&path).await
    }

    async fn find_blocked_slots_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        range: &TimeRange,
    ) -> Result<Vec<BlockedTimeSlot>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&{}&order=start_time.asc",
            BLOCKED_SLOTS,
            doctor_id,
            overlap_filter(range)
        );
        self.get_rows(&path).await
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let record = appointment.into_appointment(Uuid::new_v4());
        let body = to_json(&record)?;
        let created: Vec<Appointment> = self.write_rows(Method::POST, APPOINTMENTS, Some(body)).await?;
        created
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Appointment insert returned no rows".to_string()))
    }

    async fn update_appointment(&self, id: Uuid, changes: AppointmentChanges) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        let updated: Vec<Appointment> = self
            .write_rows(Method::PATCH, &path, Some(changes_to_json(&changes)))
            .await?;
        updated
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { entity: "Appointment", id })
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        let deleted: Vec<Value> = self.write_rows(Method::DELETE, &path, None).await?;
        if deleted.is_empty() {
            return Err(StoreError::NotFound { entity: "Appointment", id });
        }
        Ok(())
    }

    async fn count_active_appointments(&self, doctor_id: Uuid, patient_id: Uuid) -> Result<u32, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&patient_id=eq.{}&status=in.({},{})&select=id",
            APPOINTMENTS,
            doctor_id,
            patient_id,
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed
        );
        let rows: Vec<Value> = self.get_rows(&path).await?;
        Ok(rows.len() as u32)
    }

    async fn create_blocked_slot(&self, slot: NewBlockedSlot) -> Result<BlockedTimeSlot, StoreError> {
        let mut created = self.create_blocked_slots(vec![slot]).await?;
        created
            .pop()
            .ok_or_else(|| StoreError::Backend("Blocked slot insert returned no rows".to_string()))
    }

    async fn create_blocked_slots(&self, slots: Vec<NewBlockedSlot>) -> Result<Vec<BlockedTimeSlot>, StoreError> {
        if slots.is_empty() {
            return Ok(vec![]);
        }
        let records: Vec<BlockedTimeSlot> = slots
            .into_iter()
            .map(|slot| slot.into_slot(Uuid::new_v4()))
            .collect();
        let body = to_json(&records)?;
        self.write_rows(Method::POST, BLOCKED_SLOTS, Some(body)).await
    }

    async fn get_blocked_slot(&self, id: Uuid) -> Result<Option<BlockedTimeSlot>, StoreError> {
        let path = format!("{}?id=eq.{}", BLOCKED_SLOTS, id);
        Ok(self.get_rows(&path).await?.into_iter().next())
    }

    async fn delete_blocked_slot(&self, id: Uuid) -> Result<(), StoreError> {
        let path = format!("{}?id=eq.{}", BLOCKED_SLOTS, id);
        let deleted: Vec<Value> = self.write_rows(Method::DELETE, &path, None).await?;
        if deleted.is_empty() {
            return Err(StoreError::NotFound { entity: "Blocked time slot", id });
        }
        Ok(())
    }
}
