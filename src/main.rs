use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use poll_chat_sync::config::{self, SyncConfig};
use poll_chat_sync::network::{HttpStore, RemoteStore};
use poll_chat_sync::storage::NotificationLog;
use poll_chat_sync::sync::SessionController;
use poll_chat_sync::ui::ConsoleApp;
use poll_chat_sync::ui::components::sidebar;

/// Grace period for the offline beacon to leave before the runtime shuts down.
const BEACON_FLUSH: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(
    name = "poll-chat",
    version,
    about = "Console chat client over a polling HTTP API"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Root URL of the chat API (overrides config and environment)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    #[arg(long, value_name = "TOKEN")]
    csrf_token: Option<String>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Print the user list once and exit
    Users,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut sync_config = config::load_config(&cli.config);
    sync_config.apply_env_overrides();
    if let Some(base_url) = cli.base_url {
        sync_config.base_url = base_url;
    }
    if let Some(token) = cli.csrf_token {
        sync_config.csrf_token = Some(token);
    }

    let store = HttpStore::new(
        &sync_config.base_url,
        sync_config.csrf_token.clone(),
        sync_config.request_timeout(),
    )?;
    log::info!("Using chat API at {}", sync_config.base_url);

    if cli.mode == Some(Mode::Users) {
        let users = store.list_users().await?;
        println!("{}", sidebar::render(&users));
        return Ok(());
    }

    run_console(Arc::new(store), &sync_config).await;
    Ok(())
}

async fn run_console(store: Arc<dyn RemoteStore>, sync_config: &SyncConfig) {
    // UI -> engine
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // engine -> UI
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let mut controller = SessionController::new(store, sync_config, event_tx, cmd_rx);
    match NotificationLog::with_path(&sync_config.notification_db) {
        Ok(marker) => controller = controller.with_notification_log(marker),
        Err(err) => log::warn!(
            "Notification marker unavailable at {}: {err}",
            sync_config.notification_db.display()
        ),
    }
    let engine = tokio::spawn(controller.run());

    ConsoleApp::new(cmd_tx, event_rx).run().await;

    if let Err(err) = engine.await {
        log::error!("Sync engine terminated: {err}");
    }
    tokio::time::sleep(BEACON_FLUSH).await;
}
