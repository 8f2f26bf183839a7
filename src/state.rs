use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::messaging::MessagingProvider;
use crate::services::payment::PaymentGateway;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub payments: Box<dyn PaymentGateway>,
    pub messaging: Box<dyn MessagingProvider>,
}

impl AppState {
    /// Locks the store. Never hold the guard across an `.await`.
    pub fn db(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database mutex poisoned"))
    }
}
