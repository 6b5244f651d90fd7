use crate::common::{GAMELIST_FILE, OVERLAY_FILE, SETTINGS_FILE, SOCKET_PATH, STATE_FILE};
use crate::core::config::{self, GameList, Settings};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Where the daemon reads and writes, plus what it loaded at startup.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub settings: Settings,
    pub gamelist: GameList,
    pub config_dir: PathBuf,
    pub socket_path: PathBuf,
}

impl DaemonConfig {
    /// Loads from the standard config directory.
    pub fn load() -> Result<Self> {
        let (settings, gamelist) = config::load_all()?;
        Ok(Self {
            settings,
            gamelist,
            config_dir: config::config_dir(),
            socket_path: PathBuf::from(SOCKET_PATH),
        })
    }

    pub fn from_dir<P: AsRef<Path>>(dir: P, socket_path: PathBuf) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let settings = Settings::load(dir.join(SETTINGS_FILE))?;
        let gamelist = GameList::load_catalogue(dir.join(GAMELIST_FILE))?;
        Ok(Self {
            settings,
            gamelist,
            config_dir: dir,
            socket_path,
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn gamelist_path(&self) -> PathBuf {
        self.config_dir.join(GAMELIST_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.config_dir.join(STATE_FILE)
    }

    pub fn overlay_path(&self) -> PathBuf {
        self.config_dir.join(OVERLAY_FILE)
    }
}
