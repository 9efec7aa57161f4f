use std::sync::Arc;

use super::domain::SubmissionOutcome;
use crate::session::storage::{read_json, write_json, KeyValueStore, StorageError};

/// Well-known session storage key holding the latest outcome.
pub const SCREENING_RESULTS_KEY: &str = "screeningResults";

/// Single overwritten outcome record in a session-scoped store.
#[derive(Debug)]
pub struct OutcomeStore<S> {
    store: Arc<S>,
}

impl<S> Clone for OutcomeStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore> OutcomeStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn save(&self, outcome: &SubmissionOutcome) -> Result<(), StorageError> {
        write_json(self.store.as_ref(), SCREENING_RESULTS_KEY, outcome)
    }

    /// `None` until the first successful submission of the session.
    pub fn load(&self) -> Result<Option<SubmissionOutcome>, StorageError> {
        read_json(self.store.as_ref(), SCREENING_RESULTS_KEY)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(SCREENING_RESULTS_KEY)
    }
}
