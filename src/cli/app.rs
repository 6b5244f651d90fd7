use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "gameboostctl")]
#[command(version, about = "GameBoost daemon control CLI")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[arg(short, long, global = true)]
    pub socket: Option<String>,
    /// Print raw daemon replies instead of formatted output.
    #[arg(long, global = true)]
    pub raw: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    Status,

    /// Start a boost session.
    Enable {
        #[arg(value_enum, default_value_t = Mode::Normal)]
        mode: Mode,
        #[arg(long)]
        resolution: Option<String>,
        #[arg(long)]
        texture: Option<String>,
        #[arg(long)]
        effects: Option<String>,
        #[arg(long)]
        fps: Option<String>,
    },

    /// Start a boost session from a preset.
    Profile {
        #[arg(value_enum)]
        name: ProfileName,
    },

    Disable,

    ScanWifi,

    SuggestQos {
        package: String,
    },

    SuggestGraphics,

    /// Stream daemon events until interrupted.
    Watch,

    MoveOverlay {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
    },

    InvalidatePermissions,

    Reload,

    AddGame {
        package: String,
        #[arg(value_enum, default_value_t = Genre::Other)]
        genre: Genre,
        port: Option<String>,
    },

    RemoveGame {
        package: String,
    },

    SetLog {
        #[arg(value_enum)]
        level: LogLevel,
    },

    Ping,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Mode {
    Normal,
    Extreme,
}

impl Mode {
    pub fn to_upper_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Extreme => "EXTREME",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProfileName {
    Balanced,
    HighPerformance,
    BatterySaver,
    Extreme,
}

impl ProfileName {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::HighPerformance => "high_performance",
            Self::BatterySaver => "battery_saver",
            Self::Extreme => "extreme",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Genre {
    Fps,
    Rpg,
    Other,
}

impl Genre {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Fps => "fps",
            Self::Rpg => "rpg",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_upper_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl Commands {
    /// The IPC line this subcommand sends. `Watch` is handled separately.
    pub fn to_ipc(&self) -> String {
        match self {
            Self::Status => "STATUS".into(),
            Self::Enable {
                mode,
                resolution,
                texture,
                effects,
                fps,
            } => {
                let mut line = format!("ENABLE {}", mode.to_upper_str());
                for (key, value) in [
                    ("resolution", resolution),
                    ("texture", texture),
                    ("effects", effects),
                    ("fps", fps),
                ] {
                    if let Some(v) = value {
                        line.push_str(&format!(" {}={}", key, v));
                    }
                }
                line
            }
            Self::Profile { name } => format!("PROFILE {}", name.as_wire()),
            Self::Disable => "DISABLE".into(),
            Self::ScanWifi => "SCAN_WIFI".into(),
            Self::SuggestQos { package } => format!("SUGGEST_QOS {}", package),
            Self::SuggestGraphics => "SUGGEST_GRAPHICS".into(),
            Self::Watch => "SUBSCRIBE".into(),
            Self::MoveOverlay { x, y } => format!("OVERLAY_MOVE {} {}", x, y),
            Self::InvalidatePermissions => "INVALIDATE_PERMISSIONS".into(),
            Self::Reload => "RELOAD".into(),
            Self::AddGame { package, genre, port } => match port {
                Some(p) => format!("ADD_GAME {} {} {}", package, genre.as_wire(), p),
                None => format!("ADD_GAME {} {}", package, genre.as_wire()),
            },
            Self::RemoveGame { package } => format!("REMOVE_GAME {}", package),
            Self::SetLog { level } => format!("SETLOG {}", level.to_upper_str()),
            Self::Ping => "PING".into(),
        }
    }
}
