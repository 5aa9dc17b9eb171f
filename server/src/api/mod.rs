pub mod rest;

use crate::archive::{ArchiveIndex, ContentNegotiator};
use crate::config::Config;
use crate::storage::StorageDevice;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn StorageDevice>,
    pub archive: Arc<ArchiveIndex>,
    pub negotiator: Arc<ContentNegotiator>,
    /// Serializes access to the card: one read cursor at a time
    pub device_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn StorageDevice>) -> Self {
        Self {
            archive: Arc::new(ArchiveIndex::new(storage.clone(), config.archive_dir.clone())),
            negotiator: Arc::new(ContentNegotiator::new(storage.clone())),
            storage,
            config,
            device_lock: Arc::new(Mutex::new(())),
        }
    }
}
