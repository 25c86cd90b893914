use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, AppointmentState};

pub fn create_router(state: AppointmentState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/appointments", appointment_routes(state))
}
