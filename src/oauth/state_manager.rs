//! CSRF `state` values for the OAuth redirect round-trip.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Issues single-use state tokens that expire after a fixed duration.
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    expiry_duration: Duration,
}

impl StateManager {
    pub fn new(expiry_seconds: i64) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            expiry_duration: Duration::seconds(expiry_seconds),
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        // The map holds no invariants a panicking holder could break.
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generates and remembers a new state token (UUID v4).
    pub fn create_state(&self) -> String {
        let state = Uuid::new_v4().to_string();
        self.states().insert(state.clone(), Utc::now());
        state
    }

    /// Returns true if `state` was issued and has not expired.
    ///
    /// The state is removed whether or not it is still valid.
    pub fn validate_and_consume(&self, state: &str) -> bool {
        match self.states().remove(state) {
            Some(created_at) => Utc::now() - created_at <= self.expiry_duration,
            None => false,
        }
    }

    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        let expiry = self.expiry_duration;
        self.states()
            .retain(|_, created_at| now - *created_at <= expiry);
    }

    /// Number of outstanding states.
    pub fn count(&self) -> usize {
        self.states().len()
    }
}

/// Periodically drops expired states. Runs until the task is aborted.
pub async fn run_state_cleanup(manager: StateManager, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        manager.cleanup_expired();
        tracing::debug!(remaining = manager.count(), "OAuth state cleanup complete");
    }
}
