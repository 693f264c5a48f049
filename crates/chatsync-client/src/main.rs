use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use chatsync_client::push::run_push_loop;
use chatsync_client::{ChatBackend, ChatSession, ClientConfig, HttpBackend, LogListener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chatsync_client=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    info!("Starting chatsync client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env()?;
    let backend = HttpBackend::new(config.clone());
    let me = backend.fetch_me().await?;
    info!(user = %me.id, username = %me.username, "Authenticated");

    // The conversation list is fetched on every push connection.
    let mut session = ChatSession::new(me.id, backend, LogListener);
    session.refresh_contacts().await?;

    tokio::select! {
        result = run_push_loop(&config, &mut session) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
