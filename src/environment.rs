use std::sync::Arc;

use log::Logger;

use crate::config::Config;
use crate::db::Db;
use crate::store::PhotoStore;

pub type SafeDb = dyn Db + Send + Sync;

/// Everything a request handler needs, built once at startup and cloned
/// into each route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<SafeDb>,
    pub store: Arc<dyn PhotoStore>,
    pub config: Arc<Config>,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<SafeDb>,
        store: Arc<dyn PhotoStore>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            logger,
            db,
            store,
            config,
        }
    }
}
