use keeper_postgres::keeper::record_job_error;
use sqlx::PgPool;
use tracing::error;

use crate::reporter::base::ErrorReporter;
use crate::types::JobId;

/// [`ErrorReporter`] writing to `keeper.job_errors`.
///
/// Each record spawns its own insert on the current tokio runtime, so this must be called from
/// within one.
#[derive(Debug, Clone)]
pub struct PostgresErrorReporter {
    pool: PgPool,
}

impl PostgresErrorReporter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ErrorReporter for PostgresErrorReporter {
    fn try_record_error(&self, job_id: JobId, description: String) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(err) = record_job_error(&pool, job_id, &description).await {
                error!(job_id, error = %err, "failed to record job error");
            }
        });
    }
}
