use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use portal_api::config::{AppConfig, Environment};
use portal_api::database::{connection, retry::RetryPolicy, Store};
use portal_api::services::clock::SystemClock;
use portal_api::services::notification::{Mailer, SmtpMailer};
use portal_api::{build_router, migrate, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(config = %config.summary(), "configuration loaded");

    let pool = connection::create_pool(&config.database);
    if let Err(e) = connection::test_connection(&pool, RetryPolicy::startup_default()).await {
        tracing::error!(error = %e, "❌ MySQL unreachable after retries; exiting");
        return Err(e.into());
    }

    migrate::ensure_schema(&pool, config.database.bootstrap_user_tables).await?;

    let mailer: Option<Arc<dyn Mailer>> = match &config.mail {
        Some(mail) => {
            tracing::info!(smtp_host = %mail.smtp_host, smtp_port = mail.smtp_port, "✅ SMTP mailer configured");
            Some(Arc::new(SmtpMailer::new(mail)?))
        }
        None => {
            tracing::warn!("EMAIL_USER/EMAIL_PASS not set; outbound email disabled");
            None
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let store = Store::mysql(pool, RetryPolicy::query_default());
    let state = AppState::new(config, store, mailer, Arc::new(SystemClock));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Server starting on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// `RUST_LOG` wins; otherwise debug in development and info in production.
fn init_tracing() {
    let environment = Environment::from_name(
        &std::env::var("APP_ENV")
            .or_else(|_| std::env::var("NODE_ENV"))
            .unwrap_or_default(),
    );
    let default_level = match environment {
        Environment::Production => "info",
        Environment::Development => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{default_level},tower_http={default_level},sqlx=warn"))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
