use sqlx::{PgPool, prelude::FromRow};

/// A row from the keeper.registries table
#[derive(Debug, Clone, FromRow)]
pub struct RegistryRow {
    pub id: i64,
    pub job_id: i32,
    pub contract_address: Vec<u8>,
    pub from_address: Vec<u8>,
    pub check_gas: i32,
    pub block_count_per_turn: i32,
    pub keeper_index: i32,
    pub num_keepers: i32,
    pub keeper_index_map: serde_json::Value,
}

/// A row from the keeper.upkeep_registrations table
#[derive(Debug, Clone, FromRow)]
pub struct UpkeepRegistrationRow {
    pub registry_id: i64,
    pub upkeep_id: i64,
    pub execute_gas: i64,
    pub check_data: Vec<u8>,
    pub positioning_constant: i32,
}

/// A row from the keeper.job_errors table
#[derive(Debug, Clone, FromRow)]
pub struct JobErrorRow {
    pub job_id: i32,
    pub description: String,
    pub occurrences: i32,
}

/// Inserts or overwrites the registry of `row.job_id` and returns its id.
///
/// `row.id` is ignored, the surrogate id is assigned on first insert and kept afterwards.
pub async fn upsert_registry(pool: &PgPool, row: &RegistryRow) -> sqlx::Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        insert into keeper.registries (
            job_id, contract_address, from_address, check_gas,
            block_count_per_turn, keeper_index, num_keepers, keeper_index_map
        )
        values ($1, $2, $3, $4, $5, $6, $7, $8)
        on conflict (job_id) do update set
            contract_address = excluded.contract_address,
            from_address = excluded.from_address,
            check_gas = excluded.check_gas,
            block_count_per_turn = excluded.block_count_per_turn,
            keeper_index = excluded.keeper_index,
            num_keepers = excluded.num_keepers,
            keeper_index_map = excluded.keeper_index_map,
            updated_at = now()
        returning id
        "#,
    )
    .bind(row.job_id)
    .bind(&row.contract_address)
    .bind(&row.from_address)
    .bind(row.check_gas)
    .bind(row.block_count_per_turn)
    .bind(row.keeper_index)
    .bind(row.num_keepers)
    .bind(&row.keeper_index_map)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Inserts or updates an upkeep registration keyed by `(registry_id, upkeep_id)`.
pub async fn upsert_upkeep(pool: &PgPool, row: &UpkeepRegistrationRow) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        insert into keeper.upkeep_registrations (
            registry_id, upkeep_id, execute_gas, check_data, positioning_constant
        )
        values ($1, $2, $3, $4, $5)
        on conflict (registry_id, upkeep_id) do update set
            execute_gas = excluded.execute_gas,
            check_data = excluded.check_data,
            positioning_constant = excluded.positioning_constant
        "#,
    )
    .bind(row.registry_id)
    .bind(row.upkeep_id)
    .bind(row.execute_gas)
    .bind(&row.check_data)
    .bind(row.positioning_constant)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns one past the highest stored upkeep id of the registry, or 0 when it has none.
pub async fn lowest_unsynced_id(pool: &PgPool, registry_id: i64) -> sqlx::Result<i64> {
    let next_id: i64 = sqlx::query_scalar(
        r#"
        select coalesce(max(upkeep_id), -1) + 1
        from keeper.upkeep_registrations
        where registry_id = $1
        "#,
    )
    .bind(registry_id)
    .fetch_one(pool)
    .await?;

    Ok(next_id)
}

/// Deletes the given upkeeps of the registry owned by `job_id` and returns the deleted count.
pub async fn batch_delete_upkeeps_for_job(
    pool: &PgPool,
    job_id: i32,
    upkeep_ids: &[i64],
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        delete from keeper.upkeep_registrations u
        using keeper.registries r
        where u.registry_id = r.id
          and r.job_id = $1
          and u.upkeep_id = any($2)
        "#,
    )
    .bind(job_id)
    .bind(upkeep_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn get_registry_for_job(pool: &PgPool, job_id: i32) -> sqlx::Result<Option<RegistryRow>> {
    let row = sqlx::query_as::<_, RegistryRow>(
        r#"
        select id, job_id, contract_address, from_address, check_gas,
               block_count_per_turn, keeper_index, num_keepers, keeper_index_map
        from keeper.registries
        where job_id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches the registrations of a registry ordered by upkeep id.
pub async fn get_upkeeps_for_registry(
    pool: &PgPool,
    registry_id: i64,
) -> sqlx::Result<Vec<UpkeepRegistrationRow>> {
    let rows = sqlx::query_as::<_, UpkeepRegistrationRow>(
        r#"
        select registry_id, upkeep_id, execute_gas, check_data, positioning_constant
        from keeper.upkeep_registrations
        where registry_id = $1
        order by upkeep_id
        "#,
    )
    .bind(registry_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Records an error for a job, bumping the occurrence counter when the same description exists.
pub async fn record_job_error(pool: &PgPool, job_id: i32, description: &str) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        insert into keeper.job_errors (job_id, description)
        values ($1, $2)
        on conflict (job_id, description) do update set
            occurrences = keeper.job_errors.occurrences + 1,
            updated_at = now()
        "#,
    )
    .bind(job_id)
    .bind(description)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_job_errors(pool: &PgPool, job_id: i32) -> sqlx::Result<Vec<JobErrorRow>> {
    let rows = sqlx::query_as::<_, JobErrorRow>(
        r#"
        select job_id, description, occurrences
        from keeper.job_errors
        where job_id = $1
        order by id
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
