use crate::common::types::BoostMode;
use crate::core::config::{GameGenre, GameList};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_PING_MS: u32 = 75;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosSuggestion {
    pub app_package: String,
    pub bandwidth_percent: u8,
    /// Catalogued port, `"any"` when the game has none.
    pub preferred_port: String,
}

pub fn suggest(catalogue: &GameList, package: &str) -> QosSuggestion {
    let bandwidth_percent = match catalogue.genre_of(package) {
        GameGenre::Fps => 90,
        _ => 85,
    };

    QosSuggestion {
        app_package: package.to_string(),
        bandwidth_percent,
        preferred_port: catalogue.port_of(package).unwrap_or("any").to_string(),
    }
}

pub fn target_ping(mode: BoostMode, genre: GameGenre) -> u32 {
    match (mode, genre) {
        (BoostMode::Extreme, GameGenre::Fps) => 40,
        (_, GameGenre::Fps) => 50,
        (_, GameGenre::Rpg) => 100,
        _ => DEFAULT_TARGET_PING_MS,
    }
}
