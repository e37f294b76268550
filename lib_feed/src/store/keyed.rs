//! Striped async mutexes giving per-key mutual exclusion within one process.
//!
//! Two keys may share a stripe, which only costs a little parallelism; a key
//! never maps to two stripes.

use tokio::sync::{Mutex, MutexGuard};

const DEFAULT_STRIPES: usize = 64;

pub struct KeyedLocks {
    stripes: Vec<Mutex<()>>,
}

impl KeyedLocks {
    pub async fn lock(&self, key: i64) -> MutexGuard<'_, ()> {
        let idx = key.rem_euclid(self.stripes.len() as i64) as usize;
        self.stripes[idx].lock().await
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self {
            stripes: (0..DEFAULT_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }
}
