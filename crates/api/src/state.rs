use std::sync::Arc;

use s2v_db::Datastore;
use s2v_queue::JobDispatcher;

use crate::config::ServerConfig;
use crate::services::{OperationService, ShotService, StoryService};

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub dispatcher: Arc<JobDispatcher>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn stories(&self) -> StoryService {
        StoryService::new(Arc::clone(&self.store), Arc::clone(&self.dispatcher))
    }

    pub fn shots(&self) -> ShotService {
        ShotService::new(Arc::clone(&self.store), Arc::clone(&self.dispatcher))
    }

    pub fn operations(&self) -> OperationService {
        OperationService::new(Arc::clone(&self.store))
    }
}
