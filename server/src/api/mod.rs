pub mod handlers;
pub mod routes;

pub use routes::*;

use itrack_core::store::Store;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub started: Instant,
}

impl AppState {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            started: Instant::now(),
        }
    }
}
