use anyhow::Context;

use wareflow_infra::{AppConfig, Stores, apply_schema};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wareflow_observability::init();

    let config = AppConfig::from_env().context("loading configuration")?;

    let pool = config.connect().await.context("connecting to postgres")?;
    let stores = match &pool {
        Some(pool) => {
            apply_schema(pool).await.context("applying schema")?;
            Stores::postgres(pool.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Stores::in_memory()
        }
    };

    let app = wareflow_api::app::build_app(&stores);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
