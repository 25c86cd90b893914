// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Actor, ActorRole, AvailableSlotsQuery, BlockTimeSlotsRequest, BookAppointmentRequest,
    CancelAppointmentRequest, CompleteAppointmentRequest, ConflictCheckQuery, RangeQuery,
    RecurringSeriesRequest, RescheduleAppointmentRequest, TimeRange, UpdateNotesRequest,
};
use crate::router::AppointmentState;

/// Maps the authenticated token subject onto a scheduling actor.
fn actor_from_user(user: &User) -> Result<Actor, AppError> {
    let id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))?;
    let role: ActorRole = user
        .effective_role()
        .ok_or_else(|| AppError::Forbidden("Token carries no role".to_string()))?
        .parse()?;
    Ok(Actor::new(id, role))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state.service.book(&actor, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state.service.get_appointment(&actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    state.service.delete_appointment(&actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state.service.reschedule(&actor, appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state.service.cancel(&actor, appointment_id, &request.reason).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state.service.confirm(&actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state
        .service
        .complete(&actor, appointment_id, request.notes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state.service.mark_no_show(&actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_notes(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let appointment = state.service.update_notes(&actor, appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

/// Partial success still answers 200; failed sessions are listed in `errors`.
#[axum::debug_handler]
pub async fn create_recurring_series(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<RecurringSeriesRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let result = state.service.create_recurring_series(&actor, request).await?;

    Ok(Json(json!({
        "success": result.errors.is_empty(),
        "series": result
    })))
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<AppointmentState>,
    Query(query): Query<ConflictCheckQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    debug!("Conflict check by {} for doctor {}", actor.id, query.doctor_id);

    let range = TimeRange::new(query.start_time, query.end_time)?;
    let report = state
        .service
        .check_conflicts(&actor, query.doctor_id, &range, query.exclude_appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "conflicts": report
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let range = query.range()?;
    let appointments = state
        .service
        .list_doctor_appointments(&actor, doctor_id, &range)
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state.service.available_slots(doctor_id, query.date).await?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn block_time_slots(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<BlockTimeSlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let result = state.service.block_time_slots(&actor, doctor_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "blocked_slots": result.slots,
        "overlapping_appointment_ids": result.overlapping_appointment_ids
    })))
}

#[axum::debug_handler]
pub async fn get_blocked_slots(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    let range = query.range()?;
    let slots = state.service.list_blocked_slots(&actor, doctor_id, &range).await?;

    Ok(Json(json!({
        "success": true,
        "blocked_slots": slots
    })))
}

#[axum::debug_handler]
pub async fn delete_blocked_slot(
    State(state): State<AppointmentState>,
    Path(slot_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_from_user(&user)?;
    state.service.delete_blocked_slot(&actor, slot_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Blocked slot removed"
    })))
}
