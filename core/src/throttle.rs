//! Per-form submission cooldown.
//!
//! Checking and recording are separate steps: the session checks before
//! dispatch and records only once a dispatch attempt has been made, so a
//! submission rejected earlier in the pipeline never consumes the cooldown.

use formgate_types::EpochMs;

use crate::storage::{KeyValueStore, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Denied { remaining_ms: i64 },
}

/// Storage key holding a form's last submission time.
#[must_use]
pub fn storage_key(form_id: &str) -> String {
    format!("last_submission:{form_id}")
}

#[derive(Debug)]
pub struct Throttle<S> {
    store: S,
    cooldown_ms: i64,
}

impl<S: KeyValueStore> Throttle<S> {
    pub fn new(store: S, cooldown_ms: i64) -> Self {
        Self { store, cooldown_ms }
    }

    #[must_use]
    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_ms
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Last recorded submission for `form_id`. Unparseable values read as absent.
    #[must_use]
    pub fn last_submitted_at(&self, form_id: &str) -> Option<EpochMs> {
        let raw = self.store.get(&storage_key(form_id))?;
        match raw.trim().parse::<EpochMs>() {
            Ok(at) => Some(at),
            Err(_) => {
                tracing::warn!(form = form_id, "Ignoring unparseable throttle record");
                None
            }
        }
    }

    /// Whether `form_id` may submit at `now`. Does not write anything.
    #[must_use]
    pub fn check(&self, form_id: &str, now: EpochMs) -> ThrottleDecision {
        let Some(last) = self.last_submitted_at(form_id) else {
            return ThrottleDecision::Allowed;
        };

        let elapsed = now.saturating_sub(last);
        if elapsed >= self.cooldown_ms {
            ThrottleDecision::Allowed
        } else {
            // A clock that moved backwards still yields at most one full window.
            let remaining_ms = (self.cooldown_ms - elapsed).min(self.cooldown_ms);
            ThrottleDecision::Denied { remaining_ms }
        }
    }

    /// Persist `now` as the last submission time for `form_id`.
    pub fn record(&mut self, form_id: &str, now: EpochMs) -> Result<(), StorageError> {
        self.store.set(&storage_key(form_id), now.to_string())
    }

    /// [`check`](Self::check), recording `now` when allowed.
    ///
    /// For callers with no failure path between the check and the send.
    pub fn check_and_record(
        &mut self,
        form_id: &str,
        now: EpochMs,
    ) -> Result<ThrottleDecision, StorageError> {
        let decision = self.check(form_id, now);
        if decision == ThrottleDecision::Allowed {
            self.record(form_id, now)?;
        }
        Ok(decision)
    }
}
