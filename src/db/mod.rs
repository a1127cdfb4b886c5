pub(crate) mod models;
pub(crate) mod types;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};

use crate::core::config::StoreSettings;

/// Postgres pool sized by the `KAMBAZ_DB_*` settings.
pub(crate) async fn init_pool(store: &StoreSettings) -> Result<PgPool, sqlx::Error> {
    let connect_options = store
        .database_url()
        .parse::<PgConnectOptions>()?
        .application_name("kambaz-api")
        .log_statements(tracing::log::LevelFilter::Off);

    PgPoolOptions::new()
        .min_connections(store.pool_min_connections)
        .max_connections(store.pool_max_connections)
        .acquire_timeout(Duration::from_secs(store.acquire_timeout_secs))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
}

pub(crate) async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
