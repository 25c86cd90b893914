pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::AppointmentError;
pub use models::*;
pub use router::{appointment_routes, AppointmentState};
pub use services::*;
