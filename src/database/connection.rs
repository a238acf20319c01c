use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};

use super::retry::RetryPolicy;
use crate::config::DatabaseConfig;
use crate::errors::Result;

pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let ssl_mode = if config.ssl {
        MySqlSslMode::Required
    } else {
        MySqlSslMode::Disabled
    };

    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(ssl_mode)
}

/// Build the bounded pool. Connections are opened lazily; callers beyond
/// `pool_size` wait up to the connect timeout for a free slot.
pub fn create_pool(config: &DatabaseConfig) -> MySqlPool {
    tracing::info!(
        host = %config.host,
        port = config.port,
        user = %config.user,
        database = %config.name,
        ssl = config.ssl,
        pool_size = config.pool_size,
        "configuring database pool"
    );

    MySqlPoolOptions::new()
        .max_connections(config.pool_size.max(1))
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(Some(std::time::Duration::from_secs(300)))
        .connect_lazy_with(connect_options(config))
}

/// Check reachability at startup, retrying a few times before giving up.
pub async fn test_connection(pool: &MySqlPool, policy: RetryPolicy) -> Result<()> {
    policy
        .run(
            "startup",
            move || async move {
                let result = sqlx::query("SELECT 1").execute(pool).await;
                match &result {
                    Ok(_) => tracing::info!("✅ MySQL connected"),
                    Err(e) => tracing::error!(error = %e, "❌ MySQL connection attempt failed"),
                }
                result
            },
            |_: &sqlx::Error| true,
        )
        .await?;
    Ok(())
}
