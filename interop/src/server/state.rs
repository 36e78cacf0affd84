use std::sync::{Mutex, MutexGuard, PoisonError};

use interop_proto::BLANK;

/// The last description recorded by a server
///
/// Every description is fully rendered before the lock is taken, so a
/// reader never observes a partially written one.
#[derive(Debug)]
pub struct ServerState {
    last_description: Mutex<String>,
}

impl ServerState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_description: Mutex::new(BLANK.to_owned()),
        }
    }

    pub fn record(&self, description: String) {
        *self.lock() = description;
    }

    #[must_use]
    pub fn peek(&self) -> String {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.last_description
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
