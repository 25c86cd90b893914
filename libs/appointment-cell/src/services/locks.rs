use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// One async mutex per doctor. Holding the guard serialises every
/// check-then-write against that doctor's calendar inside this process.
///
/// Entries are never evicted; the map grows to the number of distinct doctors
/// scheduled against, which the doctor roster bounds.
#[derive(Debug, Default)]
pub struct DoctorLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl DoctorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(doctor_id).or_default())
        };
        debug!("Acquiring scheduling lock for doctor {}", doctor_id);
        lock.lock_owned().await
    }
}
