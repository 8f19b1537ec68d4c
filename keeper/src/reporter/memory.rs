use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::reporter::base::ErrorReporter;
use crate::types::JobId;

/// In-memory [`ErrorReporter`] counting occurrences per `(job, description)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryErrorReporter {
    errors: Arc<Mutex<BTreeMap<(JobId, String), u32>>>,
}

impl MemoryErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded descriptions of a job with their occurrence counts.
    pub fn errors_for_job(&self, job_id: JobId) -> Vec<(String, u32)> {
        let Ok(errors) = self.errors.lock() else {
            return Vec::new();
        };

        errors
            .iter()
            .filter(|((job, _), _)| *job == job_id)
            .map(|((_, description), count)| (description.clone(), *count))
            .collect()
    }
}

impl ErrorReporter for MemoryErrorReporter {
    fn try_record_error(&self, job_id: JobId, description: String) {
        match self.errors.lock() {
            Ok(mut errors) => *errors.entry((job_id, description)).or_insert(0) += 1,
            Err(_) => warn!(job_id, "job error reporter lock is poisoned, dropping error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_descriptions_increment_occurrences() {
        let reporter = MemoryErrorReporter::new();
        reporter.try_record_error(1, "rpc down".to_owned());
        reporter.try_record_error(1, "rpc down".to_owned());
        reporter.try_record_error(1, "bad config".to_owned());
        reporter.try_record_error(2, "rpc down".to_owned());

        assert_eq!(
            reporter.errors_for_job(1),
            vec![("bad config".to_owned(), 1), ("rpc down".to_owned(), 2)]
        );
        assert_eq!(reporter.errors_for_job(2), vec![("rpc down".to_owned(), 1)]);
    }
}
