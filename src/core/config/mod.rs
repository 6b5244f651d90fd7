pub mod gamelist;
pub mod settings;

pub use gamelist::*;
pub use settings::*;

use crate::common::{CONFIG_DIR, GAMELIST_FILE, SETTINGS_FILE};
use std::path::PathBuf;

pub fn config_dir() -> PathBuf {
    PathBuf::from(CONFIG_DIR)
}

pub fn settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

pub fn gamelist_path() -> PathBuf {
    config_dir().join(GAMELIST_FILE)
}

pub fn load_all() -> anyhow::Result<(Settings, GameList)> {
    let settings = Settings::load(settings_path())?;
    let gamelist = GameList::load_catalogue(gamelist_path())?;
    Ok((settings, gamelist))
}
