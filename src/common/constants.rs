pub const SOCKET_PATH: &str = "/dev/socket/gameboost.sock";
pub const CONFIG_DIR: &str = "/data/adb/.config/gameboost";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const GAMELIST_FILE: &str = "gamelist.toml";
pub const STATE_FILE: &str = "state.toml";
pub const OVERLAY_FILE: &str = "overlay.json";
