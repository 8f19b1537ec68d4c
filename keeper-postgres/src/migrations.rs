use keeper_config::shared::PgConnectionConfig;
use sqlx::{Executor, postgres::PgPoolOptions};
use tracing::info;

const NUM_POOL_CONNECTIONS: u32 = 1;

/// Applies the keeper migrations to the `keeper` schema of the configured database.
///
/// The search path is pinned to `keeper` so that the `_sqlx_migrations` bookkeeping table
/// is created there instead of in `public`.
pub async fn apply_keeper_migrations(
    connection_config: &PgConnectionConfig,
) -> Result<(), sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(NUM_POOL_CONNECTIONS)
        .min_connections(NUM_POOL_CONNECTIONS)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("create schema if not exists keeper;").await?;
                conn.execute("set search_path = 'keeper';").await?;

                Ok(())
            })
        })
        .connect_with(connection_config.connect_options())
        .await?;

    info!("applying keeper migrations");

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("keeper migrations successfully applied");

    Ok(())
}
