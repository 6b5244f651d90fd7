use anyhow::Result;
use gameboost::daemon;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = daemon::run::DaemonConfig::load()?;

    let base_filter = EnvFilter::try_new(&cfg.settings.daemon.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, filter_handle) = reload::Layer::new(base_filter);
    let timer = tracing_subscriber::fmt::time::UtcTime::new(time::format_description::parse(
        "[hour]:[minute]:[second]",
    )?);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_level(false)
                .with_timer(timer)
                .with_writer(std::io::stderr),
        )
        .init();

    tracing::info!(
        "GameBoost v{} started (backend={:?}, games={}, deny_rooted={})",
        env!("CARGO_PKG_VERSION"),
        cfg.settings.daemon.backend,
        cfg.gamelist.game.len(),
        cfg.settings.security.deny_rooted
    );

    daemon::run::run_with_config(&cfg, filter_handle).await
}
