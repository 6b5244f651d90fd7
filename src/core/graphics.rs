//! Graphics settings: validation, presets and the load-based suggestion.

use crate::common::types::BoostMode;
use crate::core::config::Thresholds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Default,
    Low,
    Medium,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Texture {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effects {
    Off,
    Low,
    #[default]
    Medium,
}

pub const FPS_LIMITS: [u32; 2] = [30, 60];
pub const DEFAULT_FPS_LIMIT: u32 = 60;

impl Resolution {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Some(Self::Default),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            _ => None,
        }
    }

    /// Display downscale applied while boosting; `None` keeps native size.
    pub fn scale_factor(&self) -> Option<f32> {
        match self {
            Self::Default => None,
            Self::Low => Some(0.5),
            Self::Medium => Some(0.75),
        }
    }
}

impl Texture {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Effects {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Some(Self::Off),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            _ => None,
        }
    }
}

/// Unvalidated settings as they arrive from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGraphics {
    pub resolution: Option<String>,
    pub texture: Option<String>,
    pub effects: Option<String>,
    pub fps_limit: Option<String>,
}

impl RawGraphics {
    /// Reads `key=value` tokens; unknown keys are ignored.
    pub fn from_pairs<'a, I: IntoIterator<Item = &'a str>>(tokens: I) -> Self {
        let mut raw = Self::default();
        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            let value = Some(value.to_string());
            match key.trim().to_lowercase().as_str() {
                "resolution" => raw.resolution = value,
                "texture" => raw.texture = value,
                "effects" => raw.effects = value,
                "fps" | "fps_limit" | "fpslimit" => raw.fps_limit = value,
                other => {
                    tracing::debug!(target: "gameboost::graphics", "Ignoring graphics key '{}'", other)
                }
            }
        }
        raw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicsSettings {
    pub resolution: Resolution,
    pub texture: Texture,
    pub effects: Effects,
    pub fps_limit: u32,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Default,
            texture: Texture::Medium,
            effects: Effects::Medium,
            fps_limit: DEFAULT_FPS_LIMIT,
        }
    }
}

impl GraphicsSettings {
    /// Never fails: anything missing or outside the allowed sets becomes
    /// the default for that field.
    pub fn validate(raw: &RawGraphics) -> Self {
        let defaults = Self::default();

        let resolution = field(&raw.resolution, Resolution::parse, defaults.resolution, "resolution");
        let texture = field(&raw.texture, Texture::parse, defaults.texture, "texture");
        let effects = field(&raw.effects, Effects::parse, defaults.effects, "effects");
        let fps_limit = field(
            &raw.fps_limit,
            |s| s.trim().parse::<u32>().ok().filter(|f| FPS_LIMITS.contains(f)),
            defaults.fps_limit,
            "fps limit",
        );

        Self {
            resolution,
            texture,
            effects,
            fps_limit,
        }
    }

    /// Settings recommended for the current device load.
    pub fn suggest(cpu_percent: f32, ram_percent: f32, temperature_c: f32, limits: &Thresholds) -> Self {
        if temperature_c > limits.temperature_warning_c || cpu_percent > limits.cpu_warning_percent {
            Self {
                resolution: Resolution::Low,
                texture: Texture::Low,
                effects: Effects::Off,
                fps_limit: 30,
            }
        } else if ram_percent > limits.ram_warning_percent {
            Self {
                resolution: Resolution::Medium,
                texture: Texture::Low,
                effects: Effects::Low,
                fps_limit: 60,
            }
        } else {
            Self::default()
        }
    }
}

fn field<T: Copy>(raw: &Option<String>, parse: impl Fn(&str) -> Option<T>, default: T, name: &str) -> T {
    match raw.as_deref() {
        None => default,
        Some(value) => parse(value).unwrap_or_else(|| {
            tracing::warn!(target: "gameboost::graphics", "Invalid {} '{}', using default", name, value);
            default
        }),
    }
}

/// Named presets. A profile only picks a mode and graphics settings; it is
/// never active on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Balanced,
    HighPerformance,
    BatterySaver,
    Extreme,
}

impl Profile {
    pub const ALL: [Profile; 4] = [
        Profile::Balanced,
        Profile::HighPerformance,
        Profile::BatterySaver,
        Profile::Extreme,
    ];

    pub fn from_str_ignore_case(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "balanced" | "default" => Some(Self::Balanced),
            "high_performance" | "performance" => Some(Self::HighPerformance),
            "battery_saver" | "powersave" => Some(Self::BatterySaver),
            "extreme" | "extreme_boost" => Some(Self::Extreme),
            _ => None,
        }
    }

    /// Battery saver also dims the screen and silences vibration for the
    /// length of the session.
    pub fn dims_screen(&self) -> bool {
        matches!(self, Self::BatterySaver)
    }

    pub fn preset(&self) -> (BoostMode, GraphicsSettings) {
        match self {
            Self::Balanced => (BoostMode::Normal, GraphicsSettings::default()),
            Self::HighPerformance => (
                BoostMode::Normal,
                GraphicsSettings {
                    resolution: Resolution::Default,
                    texture: Texture::High,
                    effects: Effects::Medium,
                    fps_limit: 60,
                },
            ),
            Self::BatterySaver => (
                BoostMode::Normal,
                GraphicsSettings {
                    resolution: Resolution::Low,
                    texture: Texture::Low,
                    effects: Effects::Off,
                    fps_limit: 30,
                },
            ),
            Self::Extreme => (
                BoostMode::Extreme,
                GraphicsSettings {
                    resolution: Resolution::Medium,
                    texture: Texture::Low,
                    effects: Effects::Off,
                    fps_limit: 60,
                },
            ),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Balanced => write!(f, "balanced"),
            Self::HighPerformance => write!(f, "high_performance"),
            Self::BatterySaver => write!(f, "battery_saver"),
            Self::Extreme => write!(f, "extreme"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(r: &str, t: &str, e: &str, f: &str) -> RawGraphics {
        RawGraphics {
            resolution: Some(r.into()),
            texture: Some(t.into()),
            effects: Some(e.into()),
            fps_limit: Some(f.into()),
        }
    }

    #[test]
    fn valid_input_passes_through() {
        let g = GraphicsSettings::validate(&raw("LOW", "high", "off", "30"));
        assert_eq!(g.resolution, Resolution::Low);
        assert_eq!(g.texture, Texture::High);
        assert_eq!(g.effects, Effects::Off);
        assert_eq!(g.fps_limit, 30);
    }

    #[test]
    fn invalid_fields_fall_back_individually() {
        let g = GraphicsSettings::validate(&raw("ultra", "low", "max", "144"));
        assert_eq!(g.resolution, Resolution::Default);
        assert_eq!(g.texture, Texture::Low);
        assert_eq!(g.effects, Effects::Medium);
        assert_eq!(g.fps_limit, 60);
        assert_eq!(GraphicsSettings::validate(&RawGraphics::default()), GraphicsSettings::default());
    }

    #[test]
    fn pairs_parsing() {
        let r = RawGraphics::from_pairs(["resolution=medium", "fps=30", "junk", "color=red"]);
        assert_eq!(r.resolution.as_deref(), Some("medium"));
        assert_eq!(r.fps_limit.as_deref(), Some("30"));
        assert_eq!(r.texture, None);
    }

    #[test]
    fn suggestion_tiers() {
        let t = Thresholds::default();
        let hot = GraphicsSettings::suggest(20.0, 30.0, 46.0, &t);
        assert_eq!((hot.resolution, hot.fps_limit), (Resolution::Low, 30));
        let busy = GraphicsSettings::suggest(85.0, 30.0, 30.0, &t);
        assert_eq!(busy, hot);
        let full = GraphicsSettings::suggest(20.0, 90.0, 30.0, &t);
        assert_eq!((full.resolution, full.texture, full.effects), (Resolution::Medium, Texture::Low, Effects::Low));
        assert_eq!(GraphicsSettings::suggest(20.0, 30.0, 30.0, &t), GraphicsSettings::default());
    }

    #[test]
    fn profiles_resolve() {
        assert_eq!(Profile::from_str_ignore_case("Battery-Saver"), Some(Profile::BatterySaver));
        assert_eq!(Profile::from_str_ignore_case("turbo"), None);
        assert_eq!(Profile::Extreme.preset().0, BoostMode::Extreme);
        for p in Profile::ALL {
            assert_eq!(Profile::from_str_ignore_case(&p.to_string()), Some(p));
        }
    }

    proptest! {
        #[test]
        fn validation_always_lands_in_allowed_sets(
            r in proptest::option::of(".{0,12}"),
            t in proptest::option::of("(low|medium|high|[a-z]{0,6})"),
            e in proptest::option::of("(off|low|medium|[A-Z]{0,6})"),
            f in proptest::option::of("[0-9]{0,4}"),
        ) {
            let g = GraphicsSettings::validate(&RawGraphics { resolution: r, texture: t, effects: e, fps_limit: f });
            prop_assert!(FPS_LIMITS.contains(&g.fps_limit));

            let json = serde_json::to_value(g).unwrap();
            prop_assert!(["default", "low", "medium"].contains(&json["resolution"].as_str().unwrap()));
            prop_assert!(["low", "medium", "high"].contains(&json["texture"].as_str().unwrap()));
            prop_assert!(["off", "low", "medium"].contains(&json["effects"].as_str().unwrap()));
        }
    }
}
