// libs/appointment-cell/src/services/scheduling.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::AppointmentError;
use crate::models::{
    Actor, Appointment, AppointmentChanges, AppointmentStatus, BlockOverlapPolicy,
    BlockTimeSlotsRequest, BlockTimeSlotsResult, BlockedTimeSlot, BookAppointmentRequest,
    ConflictReport, DoctorSchedulingProfile, NewAppointment, NewBlockedSlot,
    RecurringSeriesRequest, RecurringSeriesResult, RescheduleAppointmentRequest, SchedulingPolicy,
    SeriesError, TimeRange, UpdateNotesRequest,
};
use crate::services::access;
use crate::services::clock::{Clock, SystemClock};
use crate::services::conflict::ConflictDetectionService;
use crate::services::directory::{DoctorDirectory, InMemoryDoctorDirectory, SupabaseDoctorDirectory};
use crate::services::events::{AppointmentEvent, EventSink, TracingEventSink};
use crate::services::lifecycle::{AppointmentStateMachine, TransitionTrigger};
use crate::services::locks::DoctorLocks;
use crate::services::recurrence;
use crate::services::store::{AppointmentStore, InMemoryAppointmentStore, StoreError};
use crate::services::supabase_store::SupabaseAppointmentStore;

type AccessCheck = fn(&Actor, &Appointment) -> bool;

/// Orchestrates every scheduling write. Each operation that creates or moves
/// occupied time runs its conflict check and write under the doctor's lock,
/// and the store's own overlap guard backs that up across processes.
pub struct SchedulingService {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn DoctorDirectory>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    conflicts: ConflictDetectionService,
    state_machine: AppointmentStateMachine,
    policy: SchedulingPolicy,
    locks: DoctorLocks,
}

impl SchedulingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn DoctorDirectory>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            conflicts: ConflictDetectionService::new(Arc::clone(&store)),
            store,
            directory,
            events,
            clock,
            state_machine: AppointmentStateMachine::new(),
            policy,
            locks: DoctorLocks::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let policy = SchedulingPolicy::from_config(config);

        let (store, directory): (Arc<dyn AppointmentStore>, Arc<dyn DoctorDirectory>) =
            if config.uses_supabase_store() {
                info!("Using Supabase scheduling store at {}", config.supabase_url);
                let supabase = Arc::new(SupabaseClient::new(config));
                let token = Some(config.supabase_anon_key.clone());
                (
                    Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase), token.clone())),
                    Arc::new(SupabaseDoctorDirectory::new(supabase, token)),
                )
            } else {
                info!("Using in-memory scheduling store");
                (
                    Arc::new(InMemoryAppointmentStore::new()),
                    Arc::new(InMemoryDoctorDirectory::with_standard_hours()),
                )
            };

        Self::new(store, directory, Arc::new(TracingEventSink), Arc::new(SystemClock), policy)
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    #[instrument(skip(self, actor, request), fields(doctor_id = %request.doctor_id, patient_id = %request.patient_id))]
    pub async fn book(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking {} for actor {} ({:?})", request.range, actor.id, actor.role);

        if !access::can_book(actor, request.patient_id, request.doctor_id) {
            return Err(AppointmentError::Forbidden(
                "Not allowed to book appointments for this patient and doctor".to_string(),
            ));
        }

        let reason = required_text(&request.reason, "reason")?;
        request.range.validate()?;
        let now = self.clock.now();
        self.validate_lead_time(actor, &request.range, now)?;

        let profile = self.profile(request.doctor_id).await?;

        let _guard = self.locks.acquire(request.doctor_id).await;

        self.conflicts
            .check_conflicts(request.doctor_id, &request.range, None)
            .await?
            .into_result()?;

        if let Some(cap) = profile.max_patient_appointments {
            let active = self
                .store
                .count_active_appointments(request.doctor_id, request.patient_id)
                .await?;
            if active >= cap {
                warn!(
                    "Patient {} reached the cap of {} active appointments with doctor {}",
                    request.patient_id, cap, request.doctor_id
                );
                return Err(AppointmentError::CapacityExceeded {
                    patient_id: request.patient_id,
                    doctor_id: request.doctor_id,
                    cap,
                    active,
                });
            }
        }

        let created = match self
            .store
            .create_appointment(NewAppointment {
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                range: request.range,
                appointment_type: request.appointment_type.unwrap_or_default(),
                reason,
                patient_notes: request.patient_notes,
                booked_by: actor.id,
                created_at: now,
            })
            .await
        {
            Ok(created) => created,
            Err(err) => return Err(self.overlap_error(err, request.doctor_id, &request.range, None).await),
        };

        info!("Booked appointment {} for doctor {} at {}", created.id, created.doctor_id, created.range());
        self.events.publish(AppointmentEvent::AppointmentBooked {
            appointment: created.clone(),
        });

        Ok(created)
    }

    /// Books every session of a series independently. Failed sessions are
    /// reported in `errors`; the successful ones stay booked.
    pub async fn create_recurring_series(
        &self,
        actor: &Actor,
        request: RecurringSeriesRequest,
    ) -> Result<RecurringSeriesResult, AppointmentError> {
        debug!(
            "Creating {} session series for patient {} with doctor {}",
            request.pattern.total_sessions, request.patient_id, request.doctor_id
        );

        if !access::can_book(actor, request.patient_id, request.doctor_id) {
            return Err(AppointmentError::Forbidden(
                "Not allowed to book appointments for this patient and doctor".to_string(),
            ));
        }
        required_text(&request.reason, "reason")?;

        let ranges = recurrence::series_ranges(
            request.start_date,
            &request.pattern,
            self.policy.max_recurring_occurrences,
        )?;
        self.profile(request.doctor_id).await?;

        let mut created = Vec::new();
        let mut errors = Vec::new();

        for (index, range) in ranges.into_iter().enumerate() {
            let session = index as u32 + 1;
            let booking = BookAppointmentRequest {
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                range,
                reason: request.reason.clone(),
                appointment_type: request.appointment_type.clone(),
                patient_notes: None,
            };

            match self.book(actor, booking).await {
                Ok(appointment) => created.push(appointment),
                Err(err) => {
                    warn!("Series session {} at {} failed: {}", session, range, err);
                    errors.push(SeriesError {
                        session,
                        start_time: Some(range.start),
                        kind: err.kind().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            "Recurring series for patient {}: {} of {} sessions booked",
            request.patient_id,
            created.len(),
            request.pattern.total_sessions
        );

        Ok(RecurringSeriesResult {
            total_requested: request.pattern.total_sessions,
            total_created: created.len() as u32,
            created,
            errors,
        })
    }

    // ==============================================================================
    // RESCHEDULING AND STATUS CHANGES
    // ==============================================================================

    #[instrument(skip(self, actor, request), fields(appointment_id = %appointment_id))]
    pub async fn reschedule(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.load(appointment_id).await?;
        if !access::can_reschedule(actor, &existing) {
            return Err(AppointmentError::Forbidden(
                "Only the patient, the doctor or clinic staff can reschedule this appointment".to_string(),
            ));
        }
        request.range.validate()?;

        let _guard = self.locks.acquire(existing.doctor_id).await;
        let appointment = self.load(appointment_id).await?;

        let status = self.state_machine.status_after_reschedule(appointment.status)?;
        let now = self.clock.now();
        self.validate_lead_time(actor, &request.range, now)?;

        self.conflicts
            .check_conflicts(appointment.doctor_id, &request.range, Some(appointment_id))
            .await?
            .into_result()?;

        let mut changes = AppointmentChanges::new(actor.id, now);
        changes.range = Some(request.range);
        if status != appointment.status {
            changes.status = Some(status);
        }
        changes.reschedule_reason = request
            .reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());

        let updated = match self.store.update_appointment(appointment_id, changes).await {
            Ok(updated) => updated,
            Err(err) => {
                return Err(self
                    .overlap_error(err, appointment.doctor_id, &request.range, Some(appointment_id))
                    .await)
            }
        };

        info!("Rescheduled appointment {} from {} to {}", appointment_id, appointment.range(), updated.range());
        self.events.publish(AppointmentEvent::AppointmentRescheduled {
            appointment: updated.clone(),
            previous: appointment.range(),
        });

        Ok(updated)
    }

    pub async fn cancel(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        reason: &str,
    ) -> Result<Appointment, AppointmentError> {
        let reason = required_text(reason, "cancellation reason")?;
        let requested = TransitionTrigger::for_actor(actor).cancellation_status();

        let cancelled = self
            .apply_transition(actor, appointment_id, requested, access::can_cancel, move |changes, now| {
                changes.cancellation_reason = Some(reason);
                changes.cancelled_at = Some(now);
            })
            .await?;

        self.events.publish(AppointmentEvent::AppointmentCancelled {
            cancelled_status: cancelled.status,
            appointment: cancelled.clone(),
        });
        Ok(cancelled)
    }

    pub async fn confirm(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let confirmed = self
            .apply_transition(
                actor,
                appointment_id,
                AppointmentStatus::Confirmed,
                access::can_manage_status,
                |_, _| {},
            )
            .await?;

        self.events.publish(AppointmentEvent::AppointmentConfirmed {
            appointment: confirmed.clone(),
        });
        Ok(confirmed)
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        notes: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let completed = self
            .apply_transition(
                actor,
                appointment_id,
                AppointmentStatus::Completed,
                access::can_manage_status,
                move |changes, _| changes.staff_notes = notes,
            )
            .await?;

        self.events.publish(AppointmentEvent::AppointmentCompleted {
            appointment: completed.clone(),
        });
        Ok(completed)
    }

    pub async fn mark_no_show(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let no_show = self
            .apply_transition(
                actor,
                appointment_id,
                AppointmentStatus::NoShow,
                access::can_manage_status,
                |_, _| {},
            )
            .await?;

        self.events.publish(AppointmentEvent::AppointmentNoShow {
            appointment: no_show.clone(),
        });
        Ok(no_show)
    }

    async fn apply_transition<F>(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        requested: AppointmentStatus,
        authorized: AccessCheck,
        extra: F,
    ) -> Result<Appointment, AppointmentError>
    where
        F: FnOnce(&mut AppointmentChanges, DateTime<Utc>),
    {
        let existing = self.load(appointment_id).await?;
        if !authorized(actor, &existing) {
            return Err(AppointmentError::Forbidden(format!(
                "Not allowed to move appointment {} to '{}'",
                appointment_id, requested
            )));
        }

        let _guard = self.locks.acquire(existing.doctor_id).await;
        let appointment = self.load(appointment_id).await?;
        let now = self.clock.now();

        let status = self.state_machine.transition(
            &appointment,
            requested,
            TransitionTrigger::for_actor(actor),
            now,
        )?;

        let mut changes = AppointmentChanges::new(actor.id, now);
        changes.status = Some(status);
        extra(&mut changes, now);

        let updated = self.store.update_appointment(appointment_id, changes).await?;
        info!("Appointment {} moved {} -> {}", appointment_id, appointment.status, updated.status);
        Ok(updated)
    }

    pub async fn update_notes(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: UpdateNotesRequest,
    ) -> Result<Appointment, AppointmentError> {
        if request.patient_notes.is_none() && request.staff_notes.is_none() {
            return Err(AppointmentError::ValidationError(
                "At least one of patient_notes or staff_notes is required".to_string(),
            ));
        }

        let appointment = self.load(appointment_id).await?;
        if !access::can_update_notes(actor, &appointment, request.staff_notes.is_some()) {
            return Err(AppointmentError::Forbidden(
                "Not allowed to update these notes".to_string(),
            ));
        }

        let mut changes = AppointmentChanges::new(actor.id, self.clock.now());
        changes.patient_notes = request.patient_notes;
        changes.staff_notes = request.staff_notes;

        let updated = self.store.update_appointment(appointment_id, changes).await?;
        debug!("Updated notes on appointment {}", appointment_id);
        Ok(updated)
    }

    /// Hard delete, only for appointments that no longer occupy time.
    pub async fn delete_appointment(&self, actor: &Actor, appointment_id: Uuid) -> Result<(), AppointmentError> {
        if !access::can_delete(actor) {
            return Err(AppointmentError::Forbidden(
                "Only clinic staff can delete appointments".to_string(),
            ));
        }

        let appointment = self.load(appointment_id).await?;
        if !appointment.status.is_terminal() {
            return Err(AppointmentError::illegal_transition(
                appointment.status,
                "deleted",
                "only completed, cancelled or no-show appointments can be deleted",
            ));
        }

        self.store.delete_appointment(appointment_id).await?;
        info!("Deleted appointment {}", appointment_id);
        Ok(())
    }

    // ==============================================================================
    // READS
    // ==============================================================================

    pub async fn get_appointment(&self, actor: &Actor, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        if !access::can_view(actor, &appointment) {
            return Err(AppointmentError::Forbidden(
                "Not allowed to view this appointment".to_string(),
            ));
        }
        Ok(appointment)
    }

    /// All of the doctor's appointments overlapping `range`, any status.
    pub async fn list_doctor_appointments(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        range: &TimeRange,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !access::can_view_calendar(actor, doctor_id) {
            return Err(AppointmentError::Forbidden(
                "Not allowed to view this doctor's calendar".to_string(),
            ));
        }
        range.validate()?;
        Ok(self
            .store
            .find_appointments_by_doctor_in_range(doctor_id, range, None)
            .await?)
    }

    /// Callers outside the doctor's clinic side only learn whether the range
    /// is taken, not by which appointments or blocks.
    pub async fn check_conflicts(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictReport, AppointmentError> {
        range.validate()?;
        let report = self
            .conflicts
            .check_conflicts(doctor_id, range, exclude_appointment_id)
            .await?;

        if access::can_inspect_conflicts(actor, doctor_id) {
            Ok(report)
        } else {
            Ok(report.redacted())
        }
    }

    /// Free `[t, t + granularity)` slices of the doctor's working windows on
    /// `date` (UTC). Days without working hours yield nothing.
    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeRange>, AppointmentError> {
        let profile = self.profile(doctor_id).await?;
        let windows = profile.windows_for(date.weekday());
        if windows.is_empty() {
            debug!("Doctor {} does not work on {}", doctor_id, date);
            return Ok(vec![]);
        }

        let day = day_range(date)?;
        let occupied = self.conflicts.occupied_ranges(doctor_id, &day).await?;
        let step = self.policy.slot_granularity;

        let mut slots = Vec::new();
        for window in windows {
            let window_end = Utc.from_utc_datetime(&date.and_time(window.end));
            let mut cursor = Utc.from_utc_datetime(&date.and_time(window.start));

            while cursor + step <= window_end {
                let candidate = TimeRange {
                    start: cursor,
                    end: cursor + step,
                };
                if !occupied.iter().any(|busy| busy.overlaps(&candidate)) {
                    slots.push(candidate);
                }
                cursor += step;
            }
        }

        Ok(slots)
    }

    // ==============================================================================
    // BLOCKED TIME
    // ==============================================================================

    pub async fn block_time_slots(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        request: BlockTimeSlotsRequest,
    ) -> Result<BlockTimeSlotsResult, AppointmentError> {
        if !access::can_manage_blocks(actor, doctor_id) {
            return Err(AppointmentError::Forbidden(
                "Only the doctor or clinic staff can block this calendar".to_string(),
            ));
        }

        let reason = required_text(&request.reason, "reason")?;
        let occurrences = recurrence::expand_block_occurrences(
            &request.range,
            request.recurrence.as_ref(),
            self.policy.max_recurring_occurrences,
        )?;
        self.profile(doctor_id).await?;

        let _guard = self.locks.acquire(doctor_id).await;

        let overlapping_appointment_ids = self.appointments_under(doctor_id, &occurrences).await?;
        if !overlapping_appointment_ids.is_empty() {
            match self.policy.block_overlap_policy {
                BlockOverlapPolicy::Reject => {
                    warn!(
                        "Refusing to block time for doctor {}: {} booked appointments overlap",
                        doctor_id,
                        overlapping_appointment_ids.len()
                    );
                    return Err(AppointmentError::Conflict {
                        appointment_ids: overlapping_appointment_ids,
                        blocked_slot_ids: vec![],
                    });
                }
                BlockOverlapPolicy::Allow => {
                    warn!(
                        "Blocking time for doctor {} over {} booked appointments",
                        doctor_id,
                        overlapping_appointment_ids.len()
                    );
                }
            }
        }

        let now = self.clock.now();
        let series_id = (occurrences.len() > 1).then(Uuid::new_v4);
        let new_slots = occurrences
            .into_iter()
            .map(|range| NewBlockedSlot {
                doctor_id,
                range,
                reason: reason.clone(),
                recurrence: request.recurrence,
                series_id,
                created_by: actor.id,
                created_at: now,
            })
            .collect();

        let slots = self.store.create_blocked_slots(new_slots).await?;
        info!("Blocked {} slot(s) for doctor {}", slots.len(), doctor_id);

        self.events.publish(AppointmentEvent::TimeSlotsBlocked {
            doctor_id,
            slots: slots.clone(),
            at: now,
        });

        Ok(BlockTimeSlotsResult {
            slots,
            overlapping_appointment_ids,
        })
    }

    pub async fn list_blocked_slots(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        range: &TimeRange,
    ) -> Result<Vec<BlockedTimeSlot>, AppointmentError> {
        if !access::can_view_calendar(actor, doctor_id) {
            return Err(AppointmentError::Forbidden(
                "Not allowed to view this doctor's calendar".to_string(),
            ));
        }
        range.validate()?;
        Ok(self
            .store
            .find_blocked_slots_by_doctor_in_range(doctor_id, range)
            .await?)
    }

    pub async fn delete_blocked_slot(&self, actor: &Actor, slot_id: Uuid) -> Result<(), AppointmentError> {
        let slot = self
            .store
            .get_blocked_slot(slot_id)
            .await?
            .ok_or_else(|| AppointmentError::blocked_slot_not_found(slot_id))?;

        if !access::can_manage_blocks(actor, slot.doctor_id) {
            return Err(AppointmentError::Forbidden(
                "Only the doctor or clinic staff can remove this blocked slot".to_string(),
            ));
        }

        self.store.delete_blocked_slot(slot_id).await?;
        info!("Deleted blocked slot {} for doctor {}", slot_id, slot.doctor_id);
        Ok(())
    }

    // ==============================================================================
    // HELPERS
    // ==============================================================================

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| AppointmentError::appointment_not_found(appointment_id))
    }

    async fn profile(&self, doctor_id: Uuid) -> Result<DoctorSchedulingProfile, AppointmentError> {
        self.directory.scheduling_profile(doctor_id).await.map_err(|err| match err {
            StoreError::NotFound { .. } => AppointmentError::doctor_not_found(doctor_id),
            other => other.into(),
        })
    }

    fn validate_lead_time(
        &self,
        actor: &Actor,
        range: &TimeRange,
        now: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if range.start <= now {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment start {} must be in the future",
                range.start.to_rfc3339()
            )));
        }

        let lead = self.policy.min_lead_time_for(actor);
        let earliest = now.checked_add_signed(lead).unwrap_or(DateTime::<Utc>::MAX_UTC);
        if range.start < earliest {
            return Err(AppointmentError::ValidationError(format!(
                "Appointments must start at least {} minutes from now",
                lead.num_minutes()
            )));
        }
        Ok(())
    }

    /// Active appointment ids overlapping any of `ranges`, deduplicated.
    async fn appointments_under(
        &self,
        doctor_id: Uuid,
        ranges: &[TimeRange],
    ) -> Result<Vec<Uuid>, AppointmentError> {
        let (first, last) = match (ranges.first(), ranges.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(vec![]),
        };
        let span = TimeRange {
            start: first.start,
            end: last.end.max(first.end),
        };

        let ids: BTreeSet<Uuid> = self
            .conflicts
            .conflicting_appointments(doctor_id, &span, None)
            .await?
            .into_iter()
            .filter(|appointment| ranges.iter().any(|range| range.overlaps(&appointment.range())))
            .map(|appointment| appointment.id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    /// Stores that cannot name the colliding rows report an empty overlap;
    /// the detector fills the ids back in.
    async fn overlap_error(
        &self,
        err: StoreError,
        doctor_id: Uuid,
        range: &TimeRange,
        exclude_id: Option<Uuid>,
    ) -> AppointmentError {
        match err {
            StoreError::Overlap {
                appointment_ids,
                blocked_slot_ids,
            } if appointment_ids.is_empty() && blocked_slot_ids.is_empty() => {
                warn!("Store rejected overlapping write for doctor {} at {}", doctor_id, range);
                match self.conflicts.check_conflicts(doctor_id, range, exclude_id).await {
                    Ok(report) => AppointmentError::Conflict {
                        appointment_ids: report.appointment_ids,
                        blocked_slot_ids: report.blocked_slot_ids,
                    },
                    Err(_) => AppointmentError::Conflict {
                        appointment_ids,
                        blocked_slot_ids,
                    },
                }
            }
            other => other.into(),
        }
    }
}

fn required_text(value: &str, field: &str) -> Result<String, AppointmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppointmentError::ValidationError(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn day_range(date: NaiveDate) -> Result<TimeRange, AppointmentError> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppointmentError::ValidationError(format!("Date {} is out of range", date)))?;
    TimeRange::new(
        Utc.from_utc_datetime(&date.and_time(NaiveTime::default())),
        Utc.from_utc_datetime(&next.and_time(NaiveTime::default())),
    )
}
