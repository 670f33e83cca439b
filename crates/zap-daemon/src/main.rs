use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::eyre::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use zap_daemon::{DaemonConfig, Supervisor};
use zap_db::MessageStore;
use zap_gateway::{BridgeConfig, BridgeGateway, Gateway};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("zapd=info".parse().unwrap())
                .add_directive("zap_daemon=info".parse().unwrap())
                .add_directive("zap_gateway=info".parse().unwrap())
                .add_directive("zap_db=info".parse().unwrap()),
        )
        .init();

    let bridge_dir = find_bridge_dir()?;
    info!("bridge directory: {}", bridge_dir.display());

    let store = Arc::new(
        MessageStore::open_default()
            .await
            .wrap_err("failed to open the message database")?,
    );

    let bridge = Arc::new(BridgeGateway::new(BridgeConfig::new(bridge_dir)));
    let gateway: Arc<dyn Gateway> = bridge.clone();

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_token.cancel();
        }
    });

    let supervisor = Supervisor::new(DaemonConfig::default(), store, gateway, shutdown);
    let outcome = supervisor.run().await;

    bridge.shutdown().await;
    outcome.wrap_err("daemon exited with an error")?;
    Ok(())
}

/// Procura o diretório do bridge a partir do executável, como em dev builds
/// o binário fica em target/debug ao lado do projeto.
fn find_bridge_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;

    let mut current = exe_path.parent();
    while let Some(dir) = current {
        let bridge = dir.join("bridge");
        if bridge.join("package.json").exists() {
            return Ok(bridge);
        }
        current = dir.parent();
    }

    let cwd = std::env::current_dir()?;
    let bridge = cwd.join("bridge");
    if bridge.join("package.json").exists() {
        return Ok(bridge);
    }

    Err(color_eyre::eyre::eyre!(
        "Could not find the bridge directory. Make sure you're running from the project root."
    ))
}
