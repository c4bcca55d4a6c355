use std::sync::Arc;

use parking_lot::Mutex;
use vibin_core::model::WebSocketClientDetails;
use vibin_core::Hub;

/// Shared request state, per spec.md §9's redesign flag against a global
/// singleton: every handler receives this explicitly via axum's `State`
/// extractor rather than reaching for a `once_cell`/`lazy_static`.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub clients: Arc<Mutex<Vec<WebSocketClientDetails>>>,
    pub start_time: f64,
}

impl AppState {
    pub fn new(hub: Arc<Hub>) -> Self {
        AppState {
            hub,
            clients: Arc::new(Mutex::new(Vec::new())),
            start_time: now_seconds(),
        }
    }
}

fn now_seconds() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}
