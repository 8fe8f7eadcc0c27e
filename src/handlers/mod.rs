//! Command handlers. Each one performs a single backend operation and prints
//! its result; output goes to stdout, diagnostics go through `tracing`.

pub mod asset_handlers;
pub mod upload_handlers;

use crate::{config::AppConfig, services::asset_service::AssetService};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssetService>,
    pub config: AppConfig,
}
