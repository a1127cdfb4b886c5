use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key. Entries nobody holds are pruned on the next
/// acquire so the map stays proportional to in-flight work.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub(crate) async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.retain(|existing, slot| existing == key || Arc::strong_count(slot) > 1);
            slots.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) async fn tracked_keys(&self) -> usize {
        self.slots.lock().await.len()
    }
}
