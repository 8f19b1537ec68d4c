use crate::types::JobId;

/// Best-effort recording of errors against a job, for display next to the job.
///
/// Recording never blocks the caller and never fails it. Implementations that perform I/O do so
/// in the background and log their own failures.
pub trait ErrorReporter {
    fn try_record_error(&self, job_id: JobId, description: String);
}

/// Reporter that discards every error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopErrorReporter;

impl ErrorReporter for NoopErrorReporter {
    fn try_record_error(&self, _job_id: JobId, _description: String) {}
}
