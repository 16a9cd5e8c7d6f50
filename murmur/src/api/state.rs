use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::scheduler::Scheduler;
use crate::services::Services;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub services: Services,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseBackend>,
        services: Services,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            config,
            db,
            services,
            scheduler,
        }
    }
}
