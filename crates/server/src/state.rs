use std::sync::Arc;

use db::DBService;
use sqlx::SqlitePool;

use crate::{config::ServerConfig, mail::Mailer};

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    config: ServerConfig,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: DBService, config: ServerConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, config, mailer }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }
}
