use crate::common::types::LogLevel;
use crate::core::config::Backend;
use crate::core::platform::{Platform, ShellPlatform, SimulatedPlatform};
use crate::core::store::{FileStore, KeyValueStore};
use crate::daemon::controller::BoostController;
use crate::daemon::ipc::{self, IpcHandles};
use crate::daemon::tasks;
use crate::daemon::watcher::{self, ConfigChange};
use anyhow::{Context, Result};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

pub use crate::daemon::config::DaemonConfig;

pub type ReloadHandle =
    tracing_subscriber::reload::Handle<tracing_subscriber::EnvFilter, tracing_subscriber::Registry>;

/// Selects the platform variant once for the daemon's lifetime.
pub async fn init_platform(cfg: &DaemonConfig) -> Arc<dyn Platform> {
    match cfg.settings.daemon.backend {
        Backend::Shell => Arc::new(
            ShellPlatform::detect(
                &cfg.settings.daemon.app_package,
                cfg.settings.security.deny_rooted,
                cfg.overlay_path(),
            )
            .await,
        ),
        Backend::Simulated => {
            info!(target: "gameboost::daemon", "Using simulated platform, no device state will change");
            Arc::new(SimulatedPlatform::new())
        }
    }
}

fn log_level_setter(handle: ReloadHandle) -> Arc<dyn Fn(LogLevel) + Send + Sync> {
    Arc::new(move |lvl: LogLevel| {
        match handle.reload(EnvFilter::new(lvl.to_string())) {
            Ok(_) => debug!(target: "gameboost::ipc", "Log level changed to {:?}", lvl),
            Err(e) => error!(target: "gameboost::ipc", "Failed to change log level: {}", e),
        }
    })
}

pub async fn run_with_config(cfg: &DaemonConfig, filter_handle: ReloadHandle) -> Result<()> {
    std::fs::create_dir_all(&cfg.config_dir)
        .with_context(|| format!("Failed to create {}", cfg.config_dir.display()))?;

    let platform = init_platform(cfg).await;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(cfg.state_path())?);
    let shared_settings = Arc::new(RwLock::new(cfg.settings.clone()));
    let shared_gamelist = Arc::new(RwLock::new(cfg.gamelist.clone()));

    let controller = Arc::new(BoostController::new(
        platform.clone(),
        store.clone(),
        shared_gamelist.clone(),
        shared_settings.clone(),
    )?);

    let gamelist_path = cfg.gamelist_path();
    let reload_path = gamelist_path.clone();
    let reload_target = shared_gamelist.clone();
    let ipc_handles = IpcHandles {
        controller: controller.clone(),
        reload_fn: Arc::new(move || watcher::reload_gamelist(&reload_path, &reload_target)),
        set_log_level: log_level_setter(filter_handle),
        gamelist_path: gamelist_path.clone(),
    };

    let socket_path = cfg.socket_path.clone();
    let ipc_task = tokio::spawn(async move {
        match ipc::start(&socket_path, ipc_handles).await {
            Ok(_) => info!(target: "gameboost::daemon", "IPC    | Listener stopped"),
            Err(e) => error!(target: "gameboost::daemon", "IPC    | Error: {:?}", e),
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let status_task = tokio::spawn(tasks::status_loop(
        platform,
        store,
        Duration::from_millis(cfg.settings.daemon.status_interval_ms.max(100)),
        controller.events(),
        shutdown_rx,
    ));

    let mut watch_rx = watcher::start_config_watcher(
        gamelist_path,
        cfg.settings_path(),
        shared_gamelist,
        shared_settings,
    );

    info!(target: "gameboost::daemon", "Daemon | Ready");

    loop {
        tokio::select! {
            Some(change) = watch_rx.recv() => match change {
                ConfigChange::Settings => debug!(target: "gameboost::daemon", "Settings reloaded, applied from the next session"),
                ConfigChange::Gamelist(n) => debug!(target: "gameboost::daemon", "Catalogue now has {} games", n),
            },
            _ = signal::ctrl_c() => {
                info!(target: "gameboost::daemon", "Daemon | Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    controller.shutdown().await;
    let _ = shutdown_tx.send(true);
    let _ = status_task.await;
    ipc_task.abort();
    let _ = std::fs::remove_file(&cfg.socket_path);

    info!(target: "gameboost::daemon", "Daemon | Stopped");
    Ok(())
}
