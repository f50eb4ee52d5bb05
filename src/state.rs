use std::sync::Arc;

use crate::config::AppConfig;
use crate::supabase::Supabase;

/// The shared application state.
///
/// One backend client handle and the configuration, both constructed once
/// at process start and shared read-only across all requests. There is no
/// other cross-request state.
#[derive(Clone)]
pub struct AppState {
    pub supabase: Arc<Supabase>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(supabase: Supabase, config: AppConfig) -> Self {
        Self { supabase: Arc::new(supabase), config: Arc::new(config) }
    }
}
