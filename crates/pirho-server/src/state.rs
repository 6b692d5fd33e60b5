use std::sync::Arc;

use pirho_db::SurrealStore;
use pirho_game::{GameService, TokenConfig};
use surrealdb::engine::any::Any;

pub type Service = GameService<SurrealStore<Any>>;

/// Shared by every handler. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Service>,
    pub tokens: Arc<TokenConfig>,
}

impl AppState {
    pub fn new(service: Service, tokens: TokenConfig) -> Self {
        Self {
            service: Arc::new(service),
            tokens: Arc::new(tokens),
        }
    }
}
