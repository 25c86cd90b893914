pub mod access;
pub mod clock;
pub mod conflict;
pub mod directory;
pub mod events;
pub mod lifecycle;
pub mod locks;
pub mod recurrence;
pub mod scheduling;
pub mod store;
pub mod supabase_store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::ConflictDetectionService;
pub use directory::{DoctorDirectory, InMemoryDoctorDirectory, SupabaseDoctorDirectory};
pub use events::{AppointmentEvent, ChannelEventSink, EventSink, TracingEventSink};
pub use lifecycle::{AppointmentStateMachine, TransitionTrigger};
pub use locks::DoctorLocks;
pub use scheduling::SchedulingService;
pub use store::{AppointmentStore, InMemoryAppointmentStore, StoreError};
pub use supabase_store::SupabaseAppointmentStore;
