//! Application state shared by every handler.

use kural_core::Config;
use kural_processing::{ProcessorConfig, UploadProcessor};
use kural_storage::Storage;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    /// Built once at startup; cheap to share, holds no per-request state.
    pub processor: UploadProcessor,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let processor = UploadProcessor::new(storage.clone(), ProcessorConfig::from(&config.upload));
        Self {
            config,
            storage,
            processor,
        }
    }
}
