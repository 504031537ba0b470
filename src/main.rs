use anyhow::Result;
use dotenvy::dotenv;
use numparser::config::Settings;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    let settings = Settings::from_env()?;
    if !settings.releases_dir.is_dir() {
        anyhow::bail!(
            "Releases directory {} does not exist (set NUMPARSER_RELEASES_DIR)",
            settings.releases_dir.display()
        );
    }
    numparser::app::run_server(&settings).await
}
