use crate::core::config::{GameList, Settings};
use anyhow::Result;
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    Gamelist(usize),
    Settings,
}

/// Re-reads the user gamelist layered over the built-in catalogue.
pub fn reload_gamelist(path: &Path, shared: &RwLock<GameList>) -> Result<usize> {
    let catalogue = GameList::load_catalogue(path)?;
    let count = catalogue.game.len();
    let mut g = shared
        .write()
        .map_err(|_| anyhow::anyhow!("Gamelist lock poisoned"))?;
    *g = catalogue;
    Ok(count)
}

/// New settings apply to the next session; an active one keeps its own.
pub fn reload_settings(path: &Path, shared: &RwLock<Settings>) -> Result<()> {
    let settings = Settings::load(path)?;
    let mut s = shared
        .write()
        .map_err(|_| anyhow::anyhow!("Settings lock poisoned"))?;
    *s = settings;
    Ok(())
}

fn with_retries<T>(what: &str, mut f: impl FnMut() -> Result<T>) -> Option<T> {
    for attempt in 1..=MAX_RETRIES {
        match f() {
            Ok(v) => return Some(v),
            Err(e) if attempt < MAX_RETRIES => {
                warn!(target: "gameboost::config", "Failed reloading {} (attempt {}/{}): {:#}, retrying in 2s...", what, attempt, MAX_RETRIES, e);
                std::thread::sleep(RETRY_DELAY);
            }
            Err(e) => {
                error!(target: "gameboost::config", "Failed to reload {} after {} attempts: {:#}", what, MAX_RETRIES, e);
            }
        }
    }
    None
}

/// Watches the directories holding both files; editors and atomic saves
/// replace the file, so watching the file itself would lose track of it.
pub fn start_config_watcher(
    gamelist_path: PathBuf,
    settings_path: PathBuf,
    shared_gamelist: Arc<RwLock<GameList>>,
    shared_settings: Arc<RwLock<Settings>>,
) -> mpsc::Receiver<ConfigChange> {
    let (watch_tx, watch_rx) = mpsc::channel::<ConfigChange>(10);

    let spawned = std::thread::Builder::new()
        .name("gameboost-watch".into())
        .spawn(move || {
            let mut dirs: Vec<PathBuf> = [&gamelist_path, &settings_path]
                .iter()
                .filter_map(|p| p.parent().map(Path::to_path_buf))
                .collect();
            dirs.dedup();
            let gl_path = gamelist_path.clone();
            let st_path = settings_path.clone();
            let tx = watch_tx;

            let mut watcher = match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else { return };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }

                if event.paths.iter().any(|p| p == &st_path) {
                    info!(target: "gameboost::config", "Settings file changed, reloading...");
                    if with_retries("settings", || reload_settings(&st_path, &shared_settings)).is_some() {
                        let _ = tx.blocking_send(ConfigChange::Settings);
                    }
                }
                if event.paths.iter().any(|p| p == &gl_path) {
                    info!(target: "gameboost::config", "Gamelist file changed, reloading...");
                    if let Some(count) = with_retries("gamelist", || reload_gamelist(&gl_path, &shared_gamelist)) {
                        info!(target: "gameboost::config", "Gamelist reloaded: {} games", count);
                        let _ = tx.blocking_send(ConfigChange::Gamelist(count));
                    }
                }
            }) {
                Ok(w) => w,
                Err(e) => {
                    error!(target: "gameboost::config", "Failed to create config watcher: {}", e);
                    return;
                }
            };

            for dir in &dirs {
                if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
                    error!(target: "gameboost::config", "Failed to watch {}: {}", dir.display(), e);
                    return;
                }
            }

            debug!(target: "gameboost::config", "Config file watchers started");
            loop {
                std::thread::sleep(Duration::from_secs(3600));
            }
        });
    if let Err(e) = spawned {
        error!(target: "gameboost::config", "Failed to spawn watcher thread: {}", e);
    }

    watch_rx
}
