use std::sync::Arc;

use otr_shared::clients::db::create_pool;
use otr_shared::middleware::SessionKeys;
use otr_tournaments::config::AppConfig;
use otr_tournaments::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    otr_shared::middleware::init_tracing("otr-tournaments");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let metrics_handle = otr_shared::middleware::init_metrics()?;
    let session_keys = SessionKeys::new(&config.jwt_secret, &config.session_cookie);

    let state = Arc::new(AppState {
        db,
        config,
        session_keys,
        metrics_handle,
    });

    let app = routes::router(state)?;

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "otr-tournaments starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
