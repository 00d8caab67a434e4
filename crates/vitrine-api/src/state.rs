//! Shared application state.

use std::sync::Arc;

use vitrine_core::Config;
use vitrine_storage::Storage;

use crate::middleware::rate_limit::UploadRateLimiter;
use crate::repository::CollectionRepository;
use crate::services::upload::UploadService;

/// Everything the handlers need, wired once at startup.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub repository: Arc<dyn CollectionRepository>,
    pub upload_service: Arc<UploadService>,
    pub rate_limiter: Arc<UploadRateLimiter>,
}
