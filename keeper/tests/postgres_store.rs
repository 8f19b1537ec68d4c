#![cfg(feature = "test-utils")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use keeper::chain::{ChainReader, UpkeepConfig};
use keeper::concurrency::shutdown::create_shutdown_channel;
use keeper::error::ErrorKind;
use keeper::reporter::{ErrorReporter, PostgresErrorReporter};
use keeper::state::{Registry, UpkeepRegistration};
use keeper::store::{KeeperStore, PostgresStore};
use keeper::sync::{FullSyncEngine, SyncOutcome};
use keeper::test_utils::{TEST_JOB_ID, test_chain, test_job, test_registry_config};
use keeper::types::Address;
use keeper_config::shared::PgConnectionConfig;
use keeper_postgres::keeper::get_job_errors;
use keeper_postgres::migrations::apply_keeper_migrations;
use keeper_telemetry::tracing::init_test_tracing;
use sqlx::{Connection, Executor, PgConnection};

static DATABASE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated database created on the server described by the `TESTS_DATABASE_*` variables.
struct TestDatabase {
    config: PgConnectionConfig,
}

impl TestDatabase {
    /// Creates and migrates a fresh database, or returns `None` when no test server is
    /// configured through `TESTS_DATABASE_HOST`, `TESTS_DATABASE_PORT`,
    /// `TESTS_DATABASE_USERNAME` and the optional `TESTS_DATABASE_PASSWORD`.
    async fn create() -> Option<Self> {
        let Ok(host) = std::env::var("TESTS_DATABASE_HOST") else {
            eprintln!("TESTS_DATABASE_HOST is not set, skipping postgres store test");
            return None;
        };
        let port: u16 = std::env::var("TESTS_DATABASE_PORT")
            .expect("TESTS_DATABASE_PORT must be set")
            .parse()
            .expect("TESTS_DATABASE_PORT must be a valid port number");
        let username =
            std::env::var("TESTS_DATABASE_USERNAME").expect("TESTS_DATABASE_USERNAME must be set");
        let password = std::env::var("TESTS_DATABASE_PASSWORD").ok();

        let name = format!(
            "keeper_test_{}_{}",
            std::process::id(),
            DATABASE_COUNTER.fetch_add(1, Ordering::SeqCst)
        );
        let config: PgConnectionConfig = serde_json::from_value(serde_json::json!({
            "host": host,
            "port": port,
            "name": name,
            "username": username,
            "password": password,
        }))
        .expect("Failed to build test connection config");

        let mut connection = PgConnection::connect_with(&config.connect_options().database("postgres"))
            .await
            .expect("Failed to connect to the test server");
        connection
            .execute(format!(r#"drop database if exists "{name}""#).as_str())
            .await
            .expect("Failed to drop stale test database");
        connection
            .execute(format!(r#"create database "{name}""#).as_str())
            .await
            .expect("Failed to create test database");
        connection.close().await.expect("Failed to close connection");

        apply_keeper_migrations(&config)
            .await
            .expect("Failed to apply keeper migrations");

        Some(Self { config })
    }

    fn store(&self) -> PostgresStore {
        PostgresStore::new(&self.config)
    }

    async fn drop_database(self, store: PostgresStore) {
        store.pool().close().await;

        let mut connection =
            PgConnection::connect_with(&self.config.connect_options().database("postgres"))
                .await
                .expect("Failed to connect to the test server");
        connection
            .execute(format!(r#"drop database if exists "{}" with (force)"#, self.config.name).as_str())
            .await
            .expect("Failed to drop test database");
    }
}

fn registry(keepers: &[Address]) -> Registry {
    Registry::from_chain(
        TEST_JOB_ID,
        test_job().contract_address,
        test_job().from_address,
        &test_registry_config(),
        keepers,
    )
    .unwrap()
}

fn test_keepers() -> Vec<Address> {
    vec![
        Address::repeat_byte(0xaa),
        Address::repeat_byte(0xbb),
        test_job().from_address,
    ]
}

#[tokio::test(flavor = "multi_thread")]
async fn registry_upsert_keeps_a_stable_id() {
    init_test_tracing();
    let Some(database) = TestDatabase::create().await else {
        return;
    };
    let store = database.store();

    assert!(store.get_registry_for_job(TEST_JOB_ID).await.unwrap().is_none());

    let first = store.upsert_registry(registry(&test_keepers())).await.unwrap();
    let second = store
        .upsert_registry(registry(&[test_job().from_address]))
        .await
        .unwrap();

    assert!(first.id > 0);
    assert_eq!(first.id, second.id);

    let loaded = store.get_registry_for_job(TEST_JOB_ID).await.unwrap().unwrap();
    assert_eq!(loaded, second);
    assert_eq!(loaded.keeper_index, 0);
    assert_eq!(loaded.num_keepers, 1);

    database.drop_database(store).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn upkeeps_round_trip_and_drive_the_lowest_unsynced_id() {
    init_test_tracing();
    let Some(database) = TestDatabase::create().await else {
        return;
    };
    let store = database.store();
    let registry = store.upsert_registry(registry(&test_keepers())).await.unwrap();

    assert_eq!(store.lowest_unsynced_id(registry.id).await.unwrap(), 0);

    for upkeep_id in [0, 1, 5] {
        let upkeep = UpkeepRegistration::new(
            &registry,
            upkeep_id,
            UpkeepConfig {
                execute_gas: 400_000,
                check_data: vec![0xde, 0xad, upkeep_id as u8],
            },
        );
        store.upsert_upkeep(upkeep).await.unwrap();
    }

    assert_eq!(store.lowest_unsynced_id(registry.id).await.unwrap(), 6);

    let updated = UpkeepRegistration::new(
        &registry,
        1,
        UpkeepConfig {
            execute_gas: 900_000,
            check_data: vec![],
        },
    );
    store.upsert_upkeep(updated.clone()).await.unwrap();

    let upkeeps = store.get_upkeeps_for_registry(registry.id).await.unwrap();
    assert_eq!(
        upkeeps.iter().map(|u| u.upkeep_id).collect::<Vec<_>>(),
        vec![0, 1, 5]
    );
    assert_eq!(upkeeps[1], updated);
    assert_eq!(upkeeps[2].check_data, vec![0xde, 0xad, 5]);

    database.drop_database(store).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn negative_upkeep_id_is_rejected() {
    init_test_tracing();
    let Some(database) = TestDatabase::create().await else {
        return;
    };
    let store = database.store();
    let registry = store.upsert_registry(registry(&test_keepers())).await.unwrap();

    let err = store
        .upsert_upkeep(UpkeepRegistration::new(
            &registry,
            -1,
            UpkeepConfig {
                execute_gas: 1,
                check_data: vec![],
            },
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StoreQueryFailed);

    database.drop_database(store).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_delete_is_scoped_to_the_job() {
    init_test_tracing();
    let Some(database) = TestDatabase::create().await else {
        return;
    };
    let store = database.store();
    let registry = store.upsert_registry(registry(&test_keepers())).await.unwrap();
    for upkeep_id in 0..4 {
        store
            .upsert_upkeep(UpkeepRegistration::new(
                &registry,
                upkeep_id,
                UpkeepConfig {
                    execute_gas: 1,
                    check_data: vec![],
                },
            ))
            .await
            .unwrap();
    }

    assert_eq!(
        store
            .batch_delete_upkeeps_for_job(TEST_JOB_ID + 1, vec![0, 1])
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        store.batch_delete_upkeeps_for_job(TEST_JOB_ID, vec![]).await.unwrap(),
        0
    );
    assert_eq!(
        store
            .batch_delete_upkeeps_for_job(TEST_JOB_ID, vec![1, 3, 99])
            .await
            .unwrap(),
        2
    );

    let remaining = store.get_upkeeps_for_registry(registry.id).await.unwrap();
    assert_eq!(
        remaining.iter().map(|u| u.upkeep_id).collect::<Vec<_>>(),
        vec![0, 2]
    );

    database.drop_database(store).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn error_reporter_counts_repeated_errors() {
    init_test_tracing();
    let Some(database) = TestDatabase::create().await else {
        return;
    };
    let store = database.store();
    let reporter = PostgresErrorReporter::new(store.pool().clone());

    reporter.try_record_error(TEST_JOB_ID, "failed to read config".to_string());
    reporter.try_record_error(TEST_JOB_ID, "failed to read config".to_string());

    let errors = tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let errors = get_job_errors(store.pool(), TEST_JOB_ID).await.unwrap();
            if errors.first().is_some_and(|e| e.occurrences == 2) {
                return errors;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("job errors were never recorded");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].description, "failed to read config");

    database.drop_database(store).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn full_sync_mirrors_the_chain() {
    init_test_tracing();
    let Some(database) = TestDatabase::create().await else {
        return;
    };
    let store = database.store();
    let chain = test_chain(5).await;
    chain.cancel_upkeep(2).await;
    let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
    let engine = FullSyncEngine::new(
        test_job(),
        chain.clone(),
        store.clone(),
        PostgresErrorReporter::new(store.pool().clone()),
        3,
        shutdown_rx,
    );

    assert_eq!(engine.full_sync().await, SyncOutcome::Success);
    assert_eq!(engine.full_sync().await, SyncOutcome::Success);

    let registry = store.get_registry_for_job(TEST_JOB_ID).await.unwrap().unwrap();
    assert_eq!(registry.keeper_index, 2);
    assert_eq!(
        registry.keeper_index_map.len(),
        chain.get_keeper_list().await.unwrap().len()
    );

    let upkeeps = store.get_upkeeps_for_registry(registry.id).await.unwrap();
    assert_eq!(
        upkeeps.iter().map(|u| u.upkeep_id).collect::<Vec<_>>(),
        vec![0, 1, 3, 4]
    );

    database.drop_database(store).await;
}
