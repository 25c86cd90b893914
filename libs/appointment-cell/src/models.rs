// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::AppointmentError;

// ==============================================================================
// TIME RANGE
// ==============================================================================

/// Half-open interval `[start, end)` used for both appointment and blocked-slot
/// occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(rename = "start_time")]
    pub start: DateTime<Utc>,
    #[serde(rename = "end_time")]
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AppointmentError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn from_duration(start: DateTime<Utc>, minutes: i64) -> Result<Self, AppointmentError> {
        let end = Duration::try_minutes(minutes)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or_else(|| {
                AppointmentError::ValidationError(format!(
                    "Duration of {} minutes from {} is out of range",
                    minutes,
                    start.to_rfc3339()
                ))
            })?;
        Self::new(start, end)
    }

    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.end <= self.start {
            return Err(AppointmentError::ValidationError(format!(
                "End time {} must be after start time {}",
                self.end.to_rfc3339(),
                self.start.to_rfc3339()
            )));
        }
        Ok(())
    }

    /// `A.start < B.end && B.start < A.end`. Touching ranges do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub reason: String,
    #[serde(default)]
    pub patient_notes: Option<String>,
    #[serde(default)]
    pub staff_notes: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reschedule_reason: Option<String>,
    pub booked_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    CancelledByPatient,
    CancelledByClinic,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::CancelledByPatient => "cancelled_by_patient",
            AppointmentStatus::CancelledByClinic => "cancelled_by_clinic",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Only scheduled and confirmed appointments occupy the doctor's calendar.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    #[serde(alias = "general_consultation", alias = "general")]
    Consultation,

    #[serde(alias = "follow-up", alias = "followup")]
    FollowUp,

    Procedure,

    #[serde(alias = "urgent")]
    Emergency,

    Therapy,

    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
            AppointmentType::Procedure => write!(f, "procedure"),
            AppointmentType::Emergency => write!(f, "emergency"),
            AppointmentType::Therapy => write!(f, "therapy"),
            AppointmentType::Other(other) => write!(f, "{}", other),
        }
    }
}

/// Insert payload; the store assigns the id and starts the record as `scheduled`.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub range: TimeRange,
    pub appointment_type: AppointmentType,
    pub reason: String,
    pub patient_notes: Option<String>,
    pub booked_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl NewAppointment {
    pub fn into_appointment(self, id: Uuid) -> Appointment {
        Appointment {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            start_time: self.range.start,
            end_time: self.range.end,
            appointment_type: self.appointment_type,
            status: AppointmentStatus::Scheduled,
            reason: self.reason,
            patient_notes: self.patient_notes,
            staff_notes: None,
            cancellation_reason: None,
            cancelled_at: None,
            reschedule_reason: None,
            booked_by: self.booked_by,
            updated_by: self.booked_by,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone)]
pub struct AppointmentChanges {
    pub range: Option<TimeRange>,
    pub status: Option<AppointmentStatus>,
    pub patient_notes: Option<String>,
    pub staff_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub reschedule_reason: Option<String>,
    pub updated_by: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentChanges {
    pub fn new(updated_by: Uuid, updated_at: DateTime<Utc>) -> Self {
        Self {
            range: None,
            status: None,
            patient_notes: None,
            staff_notes: None,
            cancellation_reason: None,
            cancelled_at: None,
            reschedule_reason: None,
            updated_by,
            updated_at,
        }
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(range) = self.range {
            appointment.start_time = range.start;
            appointment.end_time = range.end;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(notes) = &self.patient_notes {
            appointment.patient_notes = Some(notes.clone());
        }
        if let Some(notes) = &self.staff_notes {
            appointment.staff_notes = Some(notes.clone());
        }
        if let Some(reason) = &self.cancellation_reason {
            appointment.cancellation_reason = Some(reason.clone());
        }
        if let Some(at) = self.cancelled_at {
            appointment.cancelled_at = Some(at);
        }
        if let Some(reason) = &self.reschedule_reason {
            appointment.reschedule_reason = Some(reason.clone());
        }
        appointment.updated_by = self.updated_by;
        appointment.updated_at = self.updated_at;
    }
}

// ==============================================================================
// BLOCKED TIME SLOTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedTimeSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub series_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl BlockedTimeSlot {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// Repeat the block every `frequency` until (and including) `until`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub until: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewBlockedSlot {
    pub doctor_id: Uuid,
    pub range: TimeRange,
    pub reason: String,
    pub recurrence: Option<Recurrence>,
    pub series_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl NewBlockedSlot {
    pub fn into_slot(self, id: Uuid) -> BlockedTimeSlot {
        BlockedTimeSlot {
            id,
            doctor_id: self.doctor_id,
            start_time: self.range.start,
            end_time: self.range.end,
            reason: self.reason,
            recurrence: self.recurrence,
            series_id: self.series_id,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTimeSlotsResult {
    pub slots: Vec<BlockedTimeSlot>,
    /// Active appointments the new blocks overlap. Only non-empty when the
    /// overlap policy is `allow`.
    pub overlapping_appointment_ids: Vec<Uuid>,
}

// ==============================================================================
// RECURRING SERIES
// ==============================================================================

/// Longest single session a recurring series may request.
pub const MAX_SESSION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPattern {
    pub frequency: Frequency,
    pub total_sessions: u32,
    pub duration_minutes: i64,
    pub time_of_day: NaiveTime,
    pub day_of_week: Option<Weekday>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSeriesRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub start_date: NaiveDate,
    pub pattern: SeriesPattern,
    pub reason: String,
    pub appointment_type: Option<AppointmentType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesError {
    /// 1-based position of the session within the series.
    pub session: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringSeriesResult {
    pub created: Vec<Appointment>,
    pub errors: Vec<SeriesError>,
    pub total_requested: u32,
    pub total_created: u32,
}

// ==============================================================================
// CONFLICT DETECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub appointment_ids: Vec<Uuid>,
    pub blocked_slot_ids: Vec<Uuid>,
}

impl ConflictReport {
    pub fn new(appointment_ids: Vec<Uuid>, blocked_slot_ids: Vec<Uuid>) -> Self {
        Self {
            has_conflict: !appointment_ids.is_empty() || !blocked_slot_ids.is_empty(),
            appointment_ids,
            blocked_slot_ids,
        }
    }

    /// Keeps the verdict but drops the ids of other people's bookings.
    pub fn redacted(self) -> Self {
        Self {
            has_conflict: self.has_conflict,
            ..Self::default()
        }
    }

    pub fn into_result(self) -> Result<(), AppointmentError> {
        if self.has_conflict {
            return Err(AppointmentError::Conflict {
                appointment_ids: self.appointment_ids,
                blocked_slot_ids: self.blocked_slot_ids,
            });
        }
        Ok(())
    }
}

// ==============================================================================
// ACTORS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Patient,
    Doctor,
    Staff,
    Admin,
}

impl FromStr for ActorRole {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(ActorRole::Patient),
            "doctor" => Ok(ActorRole::Doctor),
            "staff" | "receptionist" | "nurse" => Ok(ActorRole::Staff),
            "admin" => Ok(ActorRole::Admin),
            other => Err(AppointmentError::Forbidden(format!("Unknown role '{}'", other))),
        }
    }
}

/// The authenticated caller of a scheduling operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn patient(id: Uuid) -> Self {
        Self::new(id, ActorRole::Patient)
    }

    pub fn doctor(id: Uuid) -> Self {
        Self::new(id, ActorRole::Doctor)
    }

    pub fn staff(id: Uuid) -> Self {
        Self::new(id, ActorRole::Staff)
    }

    /// Staff and admins act on behalf of the clinic for any doctor.
    pub fn is_clinic_staff(&self) -> bool {
        matches!(self.role, ActorRole::Staff | ActorRole::Admin)
    }
}

// ==============================================================================
// DOCTOR PROFILE (external collaborator data)
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorSchedulingProfile {
    pub doctor_id: Uuid,
    pub working_hours: Vec<WorkingHours>,
    pub max_patient_appointments: Option<u32>,
}

impl DoctorSchedulingProfile {
    /// Working windows for a weekday, earliest first. Empty on days off.
    pub fn windows_for(&self, weekday: Weekday) -> Vec<&WorkingHours> {
        let mut windows: Vec<&WorkingHours> = self
            .working_hours
            .iter()
            .filter(|hours| hours.weekday == weekday && hours.start < hours.end)
            .collect();
        windows.sort_by_key(|hours| hours.start);
        windows
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(flatten)]
    pub range: TimeRange,
    pub reason: String,
    pub appointment_type: Option<AppointmentType>,
    pub patient_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    #[serde(flatten)]
    pub range: TimeRange,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompleteAppointmentRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateNotesRequest {
    pub patient_notes: Option<String>,
    pub staff_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTimeSlotsRequest {
    #[serde(flatten)]
    pub range: TimeRange,
    pub reason: String,
    pub recurrence: Option<Recurrence>,
}

// ==============================================================================
// VALIDATION MODELS
// ==============================================================================

/// What to do when a new blocked slot overlaps an already booked appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockOverlapPolicy {
    /// Refuse the whole block request with a conflict.
    Reject,
    /// Create the blocks and report the overlapped appointments.
    Allow,
}

impl FromStr for BlockOverlapPolicy {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(BlockOverlapPolicy::Reject),
            "allow" | "warn" => Ok(BlockOverlapPolicy::Allow),
            other => Err(AppointmentError::ValidationError(format!(
                "Unknown block overlap policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulingPolicy {
    pub patient_min_lead_time: Duration,
    pub clinic_min_lead_time: Duration,
    pub slot_granularity: Duration,
    pub max_recurring_occurrences: u32,
    pub block_overlap_policy: BlockOverlapPolicy,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            patient_min_lead_time: Duration::hours(2),
            clinic_min_lead_time: Duration::zero(),
            slot_granularity: Duration::minutes(30),
            max_recurring_occurrences: 366,
            block_overlap_policy: BlockOverlapPolicy::Reject,
        }
    }
}

const MAX_LEAD_MINUTES: i64 = 365 * 24 * 60;

fn minutes_within(value: i64, min: i64, max: i64) -> Option<Duration> {
    if (min..=max).contains(&value) {
        Duration::try_minutes(value)
    } else {
        tracing::warn!("Ignoring out-of-range scheduling setting of {} minutes", value);
        None
    }
}

impl SchedulingPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = Self::default();
        let block_overlap_policy = config
            .block_overlap_policy
            .parse()
            .unwrap_or_else(|e: AppointmentError| {
                tracing::warn!("{}; falling back to reject", e);
                defaults.block_overlap_policy
            });

        Self {
            patient_min_lead_time: minutes_within(config.patient_min_lead_minutes, 0, MAX_LEAD_MINUTES)
                .unwrap_or(defaults.patient_min_lead_time),
            clinic_min_lead_time: minutes_within(config.clinic_min_lead_minutes, 0, MAX_LEAD_MINUTES)
                .unwrap_or(defaults.clinic_min_lead_time),
            slot_granularity: minutes_within(config.slot_granularity_minutes, 1, MAX_SESSION_MINUTES)
                .unwrap_or(defaults.slot_granularity),
            max_recurring_occurrences: config.max_recurring_occurrences.max(1),
            block_overlap_policy,
        }
    }

    /// Patients book with a lead time; doctors and staff use the clinic one.
    pub fn min_lead_time_for(&self, actor: &Actor) -> Duration {
        match actor.role {
            ActorRole::Patient => self.patient_min_lead_time,
            ActorRole::Doctor | ActorRole::Staff | ActorRole::Admin => self.clinic_min_lead_time,
        }
    }
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RangeQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl RangeQuery {
    pub fn range(&self) -> Result<TimeRange, AppointmentError> {
        TimeRange::new(self.from, self.to)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: NaiveDate,
}
