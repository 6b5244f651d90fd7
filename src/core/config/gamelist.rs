use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameGenre {
    Fps,
    Rpg,
    #[default]
    Other,
}

impl GameGenre {
    pub fn from_str_ignore_case(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fps" => Some(Self::Fps),
            "rpg" => Some(Self::Rpg),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameGenre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fps => write!(f, "FPS"),
            Self::Rpg => write!(f, "RPG"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GameList {
    #[serde(default)]
    pub game: Vec<GameProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameProfile {
    pub package: String,
    #[serde(default)]
    pub genre: GameGenre,
    #[serde(default)]
    pub port: Option<String>,
}

impl GameProfile {
    fn new(package: &str, genre: GameGenre, port: &str) -> Self {
        Self {
            package: package.to_string(),
            genre,
            port: Some(port.to_string()),
        }
    }
}

impl GameList {
    /// Games known without any configuration.
    pub fn builtin() -> Self {
        Self {
            game: vec![
                GameProfile::new("com.tencent.ig", GameGenre::Fps, "7777"),
                GameProfile::new("com.activision.callofduty.shooter", GameGenre::Fps, "27015"),
                GameProfile::new("com.miHoYo.GenshinImpact", GameGenre::Rpg, "22102"),
            ],
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(target: "gameboost::config", "Gamelist file not found, using empty list");
            return Ok(Self { game: vec![] });
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse gamelist.toml")
    }

    /// Loads the user list layered over the built-in catalogue.
    pub fn load_catalogue<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::builtin().merged_with(Self::load(path)?))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let toml_string = toml::to_string(self).context("Failed to serialize gamelist")?;

        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string).context("Failed to write temporary file")?;

        std::fs::rename(&temp_path, path).context("Failed to rename to final file")?;

        tracing::info!(target: "gameboost::config", "Gamelist saved to {}", path.display());
        Ok(())
    }

    /// Entries in `other` replace same-package entries in `self`.
    pub fn merged_with(mut self, other: GameList) -> Self {
        for profile in other.game {
            self.game.retain(|g| g.package != profile.package);
            self.game.push(profile);
        }
        self
    }

    pub fn find(&self, package: &str) -> Option<&GameProfile> {
        self.game.iter().find(|g| g.package == package)
    }

    pub fn genre_of(&self, package: &str) -> GameGenre {
        self.find(package).map(|g| g.genre).unwrap_or_default()
    }

    pub fn port_of(&self, package: &str) -> Option<&str> {
        self.find(package).and_then(|g| g.port.as_deref())
    }

    /// A package counts as a game when it is catalogued with a known genre.
    pub fn is_game(&self, package: &str) -> bool {
        self.genre_of(package) != GameGenre::Other
    }

    pub fn add(&mut self, profile: GameProfile) -> Result<()> {
        if self.find(&profile.package).is_some() {
            anyhow::bail!("Game {} already exists", profile.package);
        }

        self.game.push(profile);
        Ok(())
    }

    pub fn remove(&mut self, package: &str) -> Result<()> {
        let initial_len = self.game.len();
        self.game.retain(|g| g.package != package);

        if self.game.len() == initial_len {
            anyhow::bail!("Game {} not found", package);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogue_classifies_known_games() {
        let list = GameList::builtin();
        assert_eq!(list.genre_of("com.tencent.ig"), GameGenre::Fps);
        assert_eq!(list.genre_of("com.miHoYo.GenshinImpact"), GameGenre::Rpg);
        assert_eq!(list.genre_of("com.example.notes"), GameGenre::Other);
        assert_eq!(list.port_of("com.activision.callofduty.shooter"), Some("27015"));
        assert!(!list.is_game("com.example.notes"));
    }

    #[test]
    fn user_entries_override_builtin() {
        let user: GameList = toml::from_str(
            r#"
            [[game]]
            package = "com.tencent.ig"
            genre = "rpg"

            [[game]]
            package = "com.supercell.brawlstars"
            genre = "fps"
            port = "9339"
            "#,
        )
        .unwrap();

        let merged = GameList::builtin().merged_with(user);
        assert_eq!(merged.genre_of("com.tencent.ig"), GameGenre::Rpg);
        assert_eq!(merged.port_of("com.tencent.ig"), None);
        assert_eq!(merged.port_of("com.supercell.brawlstars"), Some("9339"));
        assert_eq!(merged.game.len(), 4);
    }

    #[test]
    fn save_then_load_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamelist.toml");

        let mut list = GameList::default();
        list.add(GameProfile::new("com.example.shooter", GameGenre::Fps, "5000"))
            .unwrap();
        assert!(list.add(GameProfile::new("com.example.shooter", GameGenre::Rpg, "1")).is_err());
        list.save(&path).unwrap();

        let mut loaded = GameList::load(&path).unwrap();
        assert_eq!(loaded.find("com.example.shooter").map(|g| g.genre), Some(GameGenre::Fps));
        loaded.remove("com.example.shooter").unwrap();
        assert!(loaded.remove("com.example.shooter").is_err());
    }
}
