// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::SchedulingService;

#[derive(Clone)]
pub struct AppointmentState {
    pub service: Arc<SchedulingService>,
    pub config: Arc<AppConfig>,
}

impl AppointmentState {
    pub fn new(service: Arc<SchedulingService>, config: Arc<AppConfig>) -> Self {
        Self { service, config }
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let service = Arc::new(SchedulingService::from_config(&config));
        Self { service, config }
    }
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    // Every scheduling operation requires an authenticated actor
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/recurring", post(handlers::create_recurring_series))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/reschedule", patch(handlers::reschedule_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/confirm", post(handlers::confirm_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/no-show", post(handlers::mark_no_show))
        .route("/{appointment_id}/notes", patch(handlers::update_notes))

        // Doctor calendars
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .route("/doctors/{doctor_id}/available-slots", get(handlers::get_available_slots))
        .route(
            "/doctors/{doctor_id}/blocked-slots",
            post(handlers::block_time_slots).get(handlers::get_blocked_slots),
        )
        .route("/blocked-slots/{slot_id}", delete(handlers::delete_blocked_slot))

        // Utility endpoints
        .route("/conflicts/check", get(handlers::check_appointment_conflicts))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
