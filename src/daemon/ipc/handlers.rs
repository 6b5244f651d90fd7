use super::commands::Command;
use super::server::IpcHandles;
use crate::core::config::{GameList, GameProfile};
use crate::core::error::BoostError;
use anyhow::Result;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const MAX_LINE: usize = 256;

const HELP: &str = "CMDS:
        - HELP | ?
        - PING
        - QUIT
        - STATUS
        - ENABLE <NORMAL|EXTREME> [resolution=.. texture=.. effects=.. fps=..]
        - PROFILE <balanced|high_performance|battery_saver|extreme>
        - DISABLE
        - SCAN_WIFI
        - SUGGEST_QOS <pkg>
        - SUGGEST_GRAPHICS
        - SUBSCRIBE
        - OVERLAY_MOVE <x> <y>
        - INVALIDATE_PERMISSIONS
        - RELOAD
        - ADD_GAME <pkg> [fps|rpg|other] [port]
        - REMOVE_GAME <pkg>
        - SETLOG <DEBUG|INFO|WARN|ERROR>
 ";

fn json_line<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => format!("{}\n", json),
        Err(e) => format!("ERR ENCODE {}\n", e),
    }
}

fn err_line(e: &BoostError) -> String {
    format!("ERR {} {}\n", e.error_code(), e)
}

/// Applies `edit` to the user gamelist on disk, then rebuilds the live
/// catalogue from it. Returns the catalogue size.
fn edit_gamelist(h: &IpcHandles, edit: impl FnOnce(&mut GameList) -> Result<()>) -> Result<usize> {
    let mut user = GameList::load(&h.gamelist_path)?;
    edit(&mut user)?;
    user.save(&h.gamelist_path)?;

    let catalogue = GameList::builtin().merged_with(user);
    let count = catalogue.game.len();
    let shared = h.controller.catalogue();
    let mut guard = shared
        .write()
        .map_err(|_| anyhow::anyhow!("Gamelist lock poisoned"))?;
    *guard = catalogue;
    Ok(count)
}

/// Handle a single IPC client connection.
pub async fn handle_client<S>(stream: S, h: IpcHandles) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (r, mut w) = tokio::io::split(stream);
    let mut reader = BufReader::new(r);
    let mut buf = Vec::with_capacity(MAX_LINE + 1);
    w.write_all(b"OK GAMEBOOST IPC\n").await?;

    loop {
        let line = match next_line(&mut reader, &mut buf).await? {
            Incoming::Eof => break,
            Incoming::TooLong => {
                w.write_all(b"ERR INVALID_INPUT input too long\n").await?;
                continue;
            }
            Incoming::Line(line) => line,
        };
        let s = line.as_str();
        let ctl = &h.controller;
        let resp = match s.parse::<Command>() {
            Ok(Command::Help) => HELP.to_string(),
            Ok(Command::Ping) => "PONG\n".into(),
            Ok(Command::Quit) => {
                w.write_all(b"BYE\n").await?;
                break;
            }
            Ok(Command::Status) => json_line(&ctl.status()),
            Ok(Command::Enable(mode, raw)) => match ctl.enable_raw(&mode, &raw).await {
                Ok(out) => format!("OK {}\n", out.message),
                Err(e) => err_line(&e),
            },
            Ok(Command::Profile(profile)) => match ctl.enable_profile(profile).await {
                Ok(out) => format!("OK {}\n", out.message),
                Err(e) => err_line(&e),
            },
            Ok(Command::Disable) => match ctl.disable().await {
                Ok(out) => format!("OK {}\n", out.message),
                Err(e) => err_line(&e),
            },
            Ok(Command::ScanWifi) => match ctl.scan_wifi().await {
                Ok(report) => json_line(&report),
                Err(e) => err_line(&e),
            },
            Ok(Command::SuggestQos(pkg)) => json_line(&ctl.suggest_qos(&pkg)),
            Ok(Command::SuggestGraphics) => json_line(&ctl.suggest_graphics().await),
            Ok(Command::Subscribe) => {
                w.write_all(b"OK SUBSCRIBED\n").await?;
                stream_events(&h, &mut reader, &mut w, &mut buf).await?;
                break;
            }
            Ok(Command::OverlayMove(x, y)) => match ctl.overlay().move_to(x, y) {
                Ok(()) => format!("OK OVERLAY_MOVE {} {}\n", x, y),
                Err(e) => err_line(&e),
            },
            Ok(Command::InvalidatePermissions) => {
                ctl.invalidate_permissions();
                "OK INVALIDATE_PERMISSIONS\n".into()
            }
            Ok(Command::Reload) => match (h.reload_fn)() {
                Ok(n) => format!("OK RELOADED {}\n", n),
                Err(e) => format!("ERR TRANSIENT_IO reload failed: {:#}\n", e),
            },
            Ok(Command::AddGame(pkg, genre, port)) => {
                let profile = GameProfile {
                    package: pkg.clone(),
                    genre,
                    port,
                };
                match edit_gamelist(&h, |gl| gl.add(profile)) {
                    Ok(n) => {
                        info!(target: "gameboost::ipc", "Added game {} ({} catalogued)", pkg, n);
                        format!("OK ADD_GAME {}\n", pkg)
                    }
                    Err(e) => format!("ERR INVALID_INPUT {:#}\n", e),
                }
            }
            Ok(Command::RemoveGame(pkg)) => match edit_gamelist(&h, |gl| gl.remove(&pkg)) {
                Ok(n) => {
                    info!(target: "gameboost::ipc", "Removed game {} ({} catalogued)", pkg, n);
                    format!("OK REMOVE_GAME {}\n", pkg)
                }
                Err(e) => format!("ERR INVALID_INPUT {:#}\n", e),
            },
            Ok(Command::SetLog(lvl)) => {
                (h.set_log_level)(lvl);
                ctl.set_log_level(lvl);
                format!("OK SETLOG {}\n", lvl.to_upper_str())
            }
            Err(e) => format!("ERR INVALID_INPUT {}\n", e),
        };
        w.write_all(resp.as_bytes()).await?;
    }
    Ok(())
}

enum Incoming {
    Line(String),
    TooLong,
    Eof,
}

/// Reads one request line, buffering at most `MAX_LINE + 1` bytes. The rest
/// of an overlong line is drained in bounded chunks and reported once.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Incoming>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = MAX_LINE as u64 + 1;
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(Incoming::Eof);
    }
    if buf.last() == Some(&b'\n') {
        let line = String::from_utf8_lossy(buf).trim().to_string();
        if line.len() > MAX_LINE {
            return Ok(Incoming::TooLong);
        }
        return Ok(Incoming::Line(line));
    }
    if buf.len() <= MAX_LINE {
        // Peer hung up mid-line.
        return Ok(Incoming::Line(String::from_utf8_lossy(buf).trim().to_string()));
    }

    loop {
        buf.clear();
        let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        if n == 0 || buf.last() == Some(&b'\n') {
            break;
        }
    }
    buf.clear();
    Ok(Incoming::TooLong)
}

/// Forwards every broadcast event as a JSON line until the client sends
/// QUIT or hangs up.
async fn stream_events<R, W>(
    h: &IpcHandles,
    reader: &mut BufReader<R>,
    w: &mut W,
    buf: &mut Vec<u8>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    buf.clear();
    let mut rx = h.controller.subscribe();
    debug!(target: "gameboost::ipc", "Subscriber attached");

    loop {
        let mut limited = (&mut *reader).take(MAX_LINE as u64 + 1);
        tokio::select! {
            read = limited.read_until(b'\n', buf) => {
                if read? == 0 {
                    break;
                }
                if buf.last() == Some(&b'\n') {
                    if String::from_utf8_lossy(buf).trim().eq_ignore_ascii_case("QUIT") {
                        break;
                    }
                    buf.clear();
                } else if buf.len() > MAX_LINE {
                    buf.clear();
                }
            }
            event = rx.recv() => match event {
                Ok(event) => w.write_all(event.to_line().as_bytes()).await?,
                Err(RecvError::Lagged(n)) => {
                    warn!(target: "gameboost::ipc", "Subscriber lagged, dropped {} events", n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    debug!(target: "gameboost::ipc", "Subscriber detached");
    let _ = w.write_all(b"BYE\n").await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::LogLevel;
    use crate::core::config::Settings;
    use crate::core::platform::SimulatedPlatform;
    use crate::core::store::MemoryStore;
    use crate::daemon::controller::BoostController;
    use std::sync::{Arc, RwLock};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    fn handles(dir: &tempfile::TempDir) -> IpcHandles {
        let controller = BoostController::new(
            Arc::new(SimulatedPlatform::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(RwLock::new(GameList::builtin())),
            Arc::new(RwLock::new(Settings::default())),
        )
        .unwrap();
        IpcHandles {
            controller: Arc::new(controller),
            reload_fn: Arc::new(|| Ok(3)),
            set_log_level: Arc::new(|_: LogLevel| {}),
            gamelist_path: dir.path().join("gamelist.toml"),
        }
    }

    struct Client {
        reader: BufReader<tokio::io::ReadHalf<DuplexStream>>,
        writer: tokio::io::WriteHalf<DuplexStream>,
    }

    impl Client {
        async fn connect(h: IpcHandles) -> Self {
            let (client, server) = tokio::io::duplex(4096);
            tokio::spawn(handle_client(server, h));
            let (r, writer) = tokio::io::split(client);
            let mut c = Self {
                reader: BufReader::new(r),
                writer,
            };
            assert_eq!(c.line().await, "OK GAMEBOOST IPC");
            c
        }

        async fn line(&mut self) -> String {
            let mut s = String::new();
            self.reader.read_line(&mut s).await.unwrap();
            s.trim_end().to_string()
        }

        async fn send(&mut self, cmd: &str) -> String {
            self.writer.write_all(format!("{}\n", cmd).as_bytes()).await.unwrap();
            self.line().await
        }
    }

    #[tokio::test]
    async fn enable_status_disable() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Client::connect(handles(&dir)).await;

        assert_eq!(c.send("PING").await, "PONG");
        assert_eq!(c.send("ENABLE extreme fps=30").await, "OK BoostMode enabled (Extreme)");
        assert_eq!(c.send("ENABLE normal").await, "ERR ALREADY_ACTIVE BoostMode already active");

        let status: serde_json::Value = serde_json::from_str(&c.send("STATUS").await).unwrap();
        assert_eq!(status["state"], "active");
        assert_eq!(status["mode"], "extreme");

        assert_eq!(c.send("DISABLE").await, "OK BoostMode disabled");
        assert_eq!(c.send("DISABLE").await, "OK BoostMode already inactive");
        assert_eq!(c.send("QUIT").await, "BYE");
    }

    #[tokio::test]
    async fn errors_carry_a_tag() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Client::connect(handles(&dir)).await;

        assert!(c.send("FROBNICATE").await.starts_with("ERR INVALID_INPUT"));
        let long = "X".repeat(300);
        assert_eq!(c.send(&long).await, "ERR INVALID_INPUT input too long");
    }

    #[tokio::test]
    async fn oversized_line_is_drained_in_bounded_chunks() {
        let input = format!("{}\nPING\n", "X".repeat(10_000));
        let mut reader = input.as_bytes();
        let mut buf = Vec::with_capacity(MAX_LINE + 1);

        assert!(matches!(next_line(&mut reader, &mut buf).await.unwrap(), Incoming::TooLong));
        assert!(buf.capacity() <= 2 * (MAX_LINE + 1));
        assert!(matches!(next_line(&mut reader, &mut buf).await.unwrap(), Incoming::Line(l) if l == "PING"));
        assert!(matches!(next_line(&mut reader, &mut buf).await.unwrap(), Incoming::Eof));
    }

    #[tokio::test]
    async fn session_survives_an_oversized_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Client::connect(handles(&dir)).await;

        let huge = "A".repeat(20_000);
        assert_eq!(c.send(&huge).await, "ERR INVALID_INPUT input too long");
        assert_eq!(c.send("PING").await, "PONG");
    }

    #[tokio::test]
    async fn suggestions_are_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Client::connect(handles(&dir)).await;

        let qos: serde_json::Value = serde_json::from_str(&c.send("SUGGEST_QOS com.tencent.ig").await).unwrap();
        assert_eq!(qos["appPackage"], "com.tencent.ig");
        assert_eq!(qos["bandwidthPercent"], 90);
        assert_eq!(qos["preferredPort"], "7777");

        let gfx: serde_json::Value = serde_json::from_str(&c.send("SUGGEST_GRAPHICS").await).unwrap();
        assert_eq!(gfx["fpsLimit"], 60);
    }

    #[tokio::test]
    async fn games_are_added_to_the_live_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let h = handles(&dir);
        let catalogue = h.controller.catalogue();
        let mut c = Client::connect(h).await;

        assert_eq!(c.send("ADD_GAME com.example.shooter fps 9000").await, "OK ADD_GAME com.example.shooter");
        assert!(catalogue.read().unwrap().is_game("com.example.shooter"));
        assert!(c.send("ADD_GAME com.example.shooter fps").await.starts_with("ERR INVALID_INPUT"));

        let saved = GameList::load(dir.path().join("gamelist.toml")).unwrap();
        assert_eq!(saved.game.len(), 1);

        assert_eq!(c.send("REMOVE_GAME com.example.shooter").await, "OK REMOVE_GAME com.example.shooter");
        assert!(!catalogue.read().unwrap().is_game("com.example.shooter"));
        assert!(catalogue.read().unwrap().is_game("com.tencent.ig"));
    }

    #[tokio::test]
    async fn subscribers_receive_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let h = handles(&dir);
        let controller = h.controller.clone();
        let mut sub = Client::connect(h).await;

        assert_eq!(sub.send("SUBSCRIBE").await, "OK SUBSCRIBED");
        // Give the subscriber task a chance to attach.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        controller.enable_profile(crate::core::graphics::Profile::Balanced).await.unwrap();
        let event: serde_json::Value = serde_json::from_str(&sub.line().await).unwrap();
        assert_eq!(event["event"], "transition");
        assert_eq!(event["state"], "active");

        assert_eq!(sub.send("QUIT").await, "BYE");
        controller.disable().await.unwrap();
    }
}
