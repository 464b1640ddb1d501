pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;

use metrics_exporter_prometheus::PrometheusHandle;
use otr_shared::clients::db::DbPool;
use otr_shared::middleware::{SessionKeys, SessionState};

pub struct AppState {
    pub db: DbPool,
    pub config: config::AppConfig,
    pub session_keys: SessionKeys,
    pub metrics_handle: PrometheusHandle,
}

impl SessionState for AppState {
    fn session_keys(&self) -> &SessionKeys {
        &self.session_keys
    }
}
