use crate::common::sanitize_package;
use crate::common::types::LogLevel;
use crate::core::config::GameGenre;
use crate::core::graphics::{Profile, RawGraphics};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Ping,
    Quit,
    Status,
    /// Mode is kept raw; unknown modes fall back to Normal in the controller.
    Enable(String, RawGraphics),
    Profile(Profile),
    Disable,
    ScanWifi,
    SuggestQos(String),
    SuggestGraphics,
    Subscribe,
    OverlayMove(i32, i32),
    InvalidatePermissions,
    Reload,
    AddGame(String, GameGenre, Option<String>),
    RemoveGame(String),
    SetLog(LogLevel),
}

impl FromStr for Command {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let Some((verb, args)) = parts.split_first() else {
            return Err("empty");
        };

        match (verb.to_ascii_uppercase().as_str(), args) {
            ("HELP" | "?", []) => Ok(Command::Help),
            ("PING", []) => Ok(Command::Ping),
            ("QUIT", []) => Ok(Command::Quit),
            ("STATUS", []) => Ok(Command::Status),
            ("DISABLE", []) => Ok(Command::Disable),
            ("SCAN_WIFI" | "SCANWIFI", []) => Ok(Command::ScanWifi),
            ("SUGGEST_GRAPHICS" | "SUGGESTGRAPHICS", []) => Ok(Command::SuggestGraphics),
            ("SUBSCRIBE", []) => Ok(Command::Subscribe),
            ("INVALIDATE_PERMISSIONS", []) => Ok(Command::InvalidatePermissions),
            ("RELOAD", []) => Ok(Command::Reload),

            ("ENABLE", [mode, rest @ ..]) => Ok(Command::Enable(
                mode.to_string(),
                RawGraphics::from_pairs(rest.iter().copied()),
            )),
            ("ENABLE", []) => Ok(Command::Enable("normal".into(), RawGraphics::default())),

            ("PROFILE", [name]) => Profile::from_str_ignore_case(name)
                .map(Command::Profile)
                .ok_or("usage: PROFILE <balanced|high_performance|battery_saver|extreme>"),

            ("SUGGEST_QOS" | "SUGGESTQOS", [pkg]) => Ok(Command::SuggestQos(pkg.to_string())),

            ("OVERLAY_MOVE", [x, y]) => match (x.parse::<i32>(), y.parse::<i32>()) {
                (Ok(x), Ok(y)) => Ok(Command::OverlayMove(x, y)),
                _ => Err("usage: OVERLAY_MOVE <x> <y>"),
            },

            ("ADD_GAME" | "ADDGAME", [pkg, rest @ ..]) if rest.len() <= 2 => {
                let genre = match rest.first() {
                    Some(g) => GameGenre::from_str_ignore_case(g).ok_or("usage: ADD_GAME <pkg> [fps|rpg|other] [port]")?,
                    None => GameGenre::Other,
                };
                let port = rest.get(1).map(|p| p.to_string());
                let pkg = sanitize_package(pkg);
                if pkg.is_empty() {
                    return Err("usage: ADD_GAME <pkg> [fps|rpg|other] [port]");
                }
                Ok(Command::AddGame(pkg, genre, port))
            }
            ("REMOVE_GAME" | "REMOVEGAME", [pkg]) => Ok(Command::RemoveGame(sanitize_package(pkg))),

            ("SETLOG" | "SET_LOG", [level]) => LogLevel::from_str_ignore_case(level)
                .map(Command::SetLog)
                .ok_or("usage: SETLOG <DEBUG|INFO|WARN|ERROR>"),

            _ => Err("unknown command (try HELP)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_collects_graphics_pairs() {
        let cmd: Command = "ENABLE extreme resolution=low fps=30".parse().unwrap();
        match cmd {
            Command::Enable(mode, raw) => {
                assert_eq!(mode, "extreme");
                assert_eq!(raw.resolution.as_deref(), Some("low"));
                assert_eq!(raw.fps_limit.as_deref(), Some("30"));
                assert_eq!(raw.texture, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!("enable".parse::<Command>(), Ok(Command::Enable(m, _)) if m == "normal"));
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!("status".parse::<Command>(), Ok(Command::Status));
        assert_eq!("Scan_Wifi".parse::<Command>(), Ok(Command::ScanWifi));
        assert_eq!("setlog debug".parse::<Command>(), Ok(Command::SetLog(LogLevel::Debug)));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!("PROFILE turbo".parse::<Command>().is_err());
        assert!("OVERLAY_MOVE 10".parse::<Command>().is_err());
        assert!("OVERLAY_MOVE a b".parse::<Command>().is_err());
        assert!("STATUS now".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
        assert!("ADD_GAME ;;".parse::<Command>().is_err());
    }

    #[test]
    fn game_packages_are_sanitized() {
        assert_eq!(
            "ADD_GAME com.foo.bar$(id) fps 7000".parse::<Command>(),
            Ok(Command::AddGame("com.foo.barid".into(), GameGenre::Fps, Some("7000".into())))
        );
        assert_eq!("REMOVE_GAME com.foo".parse::<Command>(), Ok(Command::RemoveGame("com.foo".into())));
        assert_eq!("OVERLAY_MOVE -5 120".parse::<Command>(), Ok(Command::OverlayMove(-5, 120)));
    }
}
