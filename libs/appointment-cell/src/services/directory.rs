use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveTime, Weekday};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{DoctorSchedulingProfile, WorkingHours};
use crate::services::store::StoreError;

/// Doctor profile data the scheduler reads but does not own.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    /// Working hours and per-patient cap. `NotFound` for unknown doctors.
    async fn scheduling_profile(&self, doctor_id: Uuid) -> Result<DoctorSchedulingProfile, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDoctorDirectory {
    profiles: RwLock<HashMap<Uuid, DoctorSchedulingProfile>>,
    fallback_hours: Option<Vec<WorkingHours>>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown doctors work Monday to Friday, 09:00 to 17:00, with no cap.
    pub fn with_standard_hours() -> Self {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        let end = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default();
        let hours = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
            .into_iter()
            .map(|weekday| WorkingHours { weekday, start, end })
            .collect();

        Self {
            profiles: RwLock::default(),
            fallback_hours: Some(hours),
        }
    }

    pub async fn upsert(&self, profile: DoctorSchedulingProfile) {
        self.profiles.write().await.insert(profile.doctor_id, profile);
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn scheduling_profile(&self, doctor_id: Uuid) -> Result<DoctorSchedulingProfile, StoreError> {
        if let Some(profile) = self.profiles.read().await.get(&doctor_id) {
            return Ok(profile.clone());
        }
        self.fallback_hours
            .as_ref()
            .map(|hours| DoctorSchedulingProfile {
                doctor_id,
                working_hours: hours.clone(),
                max_patient_appointments: None,
            })
            .ok_or(StoreError::NotFound { entity: "Doctor", id: doctor_id })
    }
}

#[derive(Debug, Deserialize)]
struct DoctorRow {
    #[serde(default)]
    max_patient_appointments: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityRow {
    day_of_week: i32,
    start_time: String,
    end_time: String,
}

/// 0 = Sunday, as stored in `doctor_availability`.
fn weekday_from_index(day_of_week: i32) -> Option<Weekday> {
    match day_of_week {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

impl AvailabilityRow {
    fn into_working_hours(self) -> Option<WorkingHours> {
        Some(WorkingHours {
            weekday: weekday_from_index(self.day_of_week)?,
            start: parse_time(&self.start_time)?,
            end: parse_time(&self.end_time)?,
        })
    }
}

pub struct SupabaseDoctorDirectory {
    supabase: Arc<SupabaseClient>,
    access_token: Option<String>,
}

impl SupabaseDoctorDirectory {
    pub fn new(supabase: Arc<SupabaseClient>, access_token: Option<String>) -> Self {
        Self {
            supabase,
            access_token: access_token.filter(|token| !token.is_empty()),
        }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Value>, StoreError> {
        self.supabase
            .request(Method::GET, path, self.access_token.as_deref(), None)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn scheduling_profile(&self, doctor_id: Uuid) -> Result<DoctorSchedulingProfile, StoreError> {
        debug!("Fetching scheduling profile for doctor {}", doctor_id);

        let doctor_path = format!("/rest/v1/doctors?id=eq.{}&select=id,max_patient_appointments", doctor_id);
        let doctor: DoctorRow = self
            .fetch(&doctor_path)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound { entity: "Doctor", id: doctor_id })
            .and_then(|row| {
                serde_json::from_value(row)
                    .map_err(|e| StoreError::Backend(format!("Failed to parse doctor: {}", e)))
            })?;

        let availability_path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&is_available=eq.true&order=day_of_week.asc,start_time.asc",
            doctor_id
        );
        let working_hours = self
            .fetch(&availability_path)
            .await?
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<AvailabilityRow>(row) {
                Ok(row) => row.into_working_hours(),
                Err(e) => {
                    warn!("Skipping malformed availability row for doctor {}: {}", doctor_id, e);
                    None
                }
            })
            .collect();

        Ok(DoctorSchedulingProfile {
            doctor_id,
            working_hours,
            max_patient_appointments: doctor.max_patient_appointments,
        })
    }
}
