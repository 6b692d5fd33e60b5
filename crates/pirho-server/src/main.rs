//! Pi & Rho's Games server entry point.

use anyhow::Context;
use pirho_db::DbManager;
use pirho_game::GameService;
use pirho_server::{config::ServerConfig, state::AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("pirho_server=info,pirho_game=info,pirho_db=info,tower_http=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!("Starting Pi & Rho's Games server...");

    let config = ServerConfig::load().context("loading configuration")?;

    let manager = DbManager::connect(&config.db)
        .await
        .context("connecting to SurrealDB")?;

    let service = GameService::new(manager.store(), config.game);
    let state = AppState::new(service, config.token);

    pirho_server::serve(state, config.port).await?;

    tracing::info!("Pi & Rho's Games server stopped.");
    Ok(())
}
