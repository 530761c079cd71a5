use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Serializes status writes per animal. Two analyses for different videos
/// of the same animal may run concurrently, but their derive-and-persist
/// sections take this lock so the later transaction sees the earlier one.
#[derive(Default)]
pub struct AnimalLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AnimalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, animal_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(animal_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
