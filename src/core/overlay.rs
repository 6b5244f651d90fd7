//! Status overlay.
//!
//! The surface lives on its own UI thread; callers hand commands over a
//! channel and never touch it directly.

use crate::core::error::{BoostError, PermissionKind, Result};
use crate::core::permission::PermissionGate;
use crate::core::store::{KeyValueStore, keys};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub const DEFAULT_TEXT: &str = "BoostMode Active";

/// What the overlay currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayFrame {
    pub visible: bool,
    pub text: String,
    pub x: i32,
    pub y: i32,
}

/// Something the UI thread can draw the status text on.
pub trait OverlaySurface: Send {
    fn attach(&mut self, text: &str, x: i32, y: i32) -> anyhow::Result<()>;
    fn update_text(&mut self, text: &str) -> anyhow::Result<()>;
    fn move_to(&mut self, x: i32, y: i32) -> anyhow::Result<()>;
    fn detach(&mut self) -> anyhow::Result<()>;
}

/// Publishes the overlay as a JSON file the app layer renders.
pub struct FileSurface {
    path: PathBuf,
    frame: OverlayFrame,
}

impl FileSurface {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            frame: OverlayFrame::default(),
        }
    }

    fn flush(&self) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let body = serde_json::to_string(&self.frame)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).context("Failed to write overlay file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to publish overlay file")
    }
}

impl OverlaySurface for FileSurface {
    fn attach(&mut self, text: &str, x: i32, y: i32) -> anyhow::Result<()> {
        self.frame = OverlayFrame {
            visible: true,
            text: text.to_string(),
            x,
            y,
        };
        self.flush()
    }

    fn update_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.frame.text = text.to_string();
        self.flush()
    }

    fn move_to(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.frame.x = x;
        self.frame.y = y;
        self.flush()
    }

    fn detach(&mut self) -> anyhow::Result<()> {
        self.frame.visible = false;
        self.frame.text.clear();
        self.flush()
    }
}

/// In-memory surface; clones share the same frame.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    frame: Arc<Mutex<OverlayFrame>>,
    attaches: Arc<Mutex<usize>>,
}

impl MemorySurface {
    pub fn frame(&self) -> OverlayFrame {
        self.frame.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// How many times a surface was created.
    pub fn attach_count(&self) -> usize {
        self.attaches.lock().map(|n| *n).unwrap_or_default()
    }

    fn with<F: FnOnce(&mut OverlayFrame)>(&self, f: F) -> anyhow::Result<()> {
        let mut frame = self
            .frame
            .lock()
            .map_err(|_| anyhow::anyhow!("overlay frame poisoned"))?;
        f(&mut frame);
        Ok(())
    }
}

impl OverlaySurface for MemorySurface {
    fn attach(&mut self, text: &str, x: i32, y: i32) -> anyhow::Result<()> {
        if let Ok(mut n) = self.attaches.lock() {
            *n += 1;
        }
        self.with(|f| {
            *f = OverlayFrame {
                visible: true,
                text: text.to_string(),
                x,
                y,
            }
        })
    }

    fn update_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.with(|f| f.text = text.to_string())
    }

    fn move_to(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.with(|f| {
            f.x = x;
            f.y = y;
        })
    }

    fn detach(&mut self) -> anyhow::Result<()> {
        self.with(|f| {
            f.visible = false;
            f.text.clear();
        })
    }
}

enum UiCommand {
    Show(String, (i32, i32)),
    Hide,
    Move(i32, i32),
    Flush(mpsc::SyncSender<()>),
}

pub struct OverlayPresenter {
    tx: Sender<UiCommand>,
    thread: Option<JoinHandle<()>>,
    gate: Arc<PermissionGate>,
    store: Arc<dyn KeyValueStore>,
    default_position: (i32, i32),
}

impl OverlayPresenter {
    /// Spawns the UI thread. `make_surface` runs on that thread.
    pub fn spawn<F>(
        make_surface: F,
        gate: Arc<PermissionGate>,
        store: Arc<dyn KeyValueStore>,
        default_position: (i32, i32),
    ) -> anyhow::Result<Self>
    where
        F: FnOnce() -> Box<dyn OverlaySurface> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("gameboost-ui".into())
            .spawn(move || ui_loop(make_surface(), rx))?;

        Ok(Self {
            tx,
            thread: Some(thread),
            gate,
            store,
            default_position,
        })
    }

    /// Shows `text`, creating the surface on first use and updating it in
    /// place afterwards. Without overlay permission this does nothing.
    pub async fn show(&self, text: &str) -> Result<()> {
        match self.gate.is_granted(PermissionKind::OverlayDraw).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(target: "gameboost::overlay", "No overlay permission, skipping show");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(target: "gameboost::overlay", "Overlay permission check failed: {}", e);
                return Ok(());
            }
        }

        self.send(UiCommand::Show(text.to_string(), self.position()))
    }

    pub fn hide(&self) -> Result<()> {
        self.send(UiCommand::Hide)
    }

    /// Records a drag. The position survives hide/show and restarts.
    pub fn move_to(&self, x: i32, y: i32) -> Result<()> {
        if let Err(e) = self.store.set(keys::OVERLAY_POSITION, &format!("{},{}", x, y)) {
            tracing::warn!(target: "gameboost::overlay", "Failed to persist overlay position: {:#}", e);
        }
        self.send(UiCommand::Move(x, y))
    }

    pub fn position(&self) -> (i32, i32) {
        self.store
            .get(keys::OVERLAY_POSITION)
            .and_then(|raw| parse_position(&raw))
            .unwrap_or(self.default_position)
    }

    /// Waits until the UI thread has drained every queued command.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.tx.send(UiCommand::Flush(ack_tx)).is_err() {
            return;
        }
        let _ = tokio::task::spawn_blocking(move || ack_rx.recv()).await;
    }

    fn send(&self, cmd: UiCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| BoostError::transient("overlay thread is gone"))
    }
}

impl Drop for OverlayPresenter {
    fn drop(&mut self) {
        // Closing the channel ends the UI loop.
        let (dead_tx, _) = mpsc::channel();
        drop(std::mem::replace(&mut self.tx, dead_tx));
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn ui_loop(mut surface: Box<dyn OverlaySurface>, rx: Receiver<UiCommand>) {
    let mut shown = false;

    while let Ok(cmd) = rx.recv() {
        let result = match cmd {
            UiCommand::Show(text, _) if shown => surface.update_text(&text),
            UiCommand::Show(text, (x, y)) => {
                shown = true;
                surface.attach(&text, x, y)
            }
            UiCommand::Hide if shown => {
                shown = false;
                surface.detach()
            }
            UiCommand::Hide => Ok(()),
            UiCommand::Move(x, y) if shown => surface.move_to(x, y),
            UiCommand::Move(..) => Ok(()),
            UiCommand::Flush(ack) => {
                let _ = ack.send(());
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!(target: "gameboost::overlay", "Overlay update failed: {:#}", e);
        }
    }

    if shown && let Err(e) = surface.detach() {
        tracing::warn!(target: "gameboost::overlay", "Failed to remove overlay on exit: {:#}", e);
    }
}

fn parse_position(raw: &str) -> Option<(i32, i32)> {
    let (x, y) = raw.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::SimulatedPlatform;
    use crate::core::store::MemoryStore;
    use std::time::Duration;

    fn presenter(sim: &Arc<SimulatedPlatform>, store: &Arc<MemoryStore>) -> (OverlayPresenter, MemorySurface) {
        let gate = Arc::new(PermissionGate::new(sim.clone(), store.clone(), Duration::ZERO));
        let surface = MemorySurface::default();
        let ui_surface = surface.clone();
        let presenter =
            OverlayPresenter::spawn(move || Box::new(ui_surface), gate, store.clone(), (10, 10)).unwrap();
        (presenter, surface)
    }

    #[tokio::test]
    async fn show_is_idempotent_and_updates_in_place() {
        let sim = Arc::new(SimulatedPlatform::new());
        let store = Arc::new(MemoryStore::new());
        let (overlay, surface) = presenter(&sim, &store);

        overlay.show(DEFAULT_TEXT).await.unwrap();
        overlay.show("High CPU usage detected").await.unwrap();
        overlay.flush().await;

        assert_eq!(surface.attach_count(), 1);
        let frame = surface.frame();
        assert!(frame.visible);
        assert_eq!(frame.text, "High CPU usage detected");
        assert_eq!((frame.x, frame.y), (10, 10));
    }

    #[tokio::test]
    async fn position_survives_hide_and_show() {
        let sim = Arc::new(SimulatedPlatform::new());
        let store = Arc::new(MemoryStore::new());
        let (overlay, surface) = presenter(&sim, &store);

        overlay.hide().unwrap();
        overlay.show(DEFAULT_TEXT).await.unwrap();
        overlay.move_to(240, 96).unwrap();
        overlay.hide().unwrap();
        overlay.show(DEFAULT_TEXT).await.unwrap();
        overlay.flush().await;

        let frame = surface.frame();
        assert_eq!((frame.x, frame.y), (240, 96));
        assert_eq!(store.get(keys::OVERLAY_POSITION).as_deref(), Some("240,96"));
        assert_eq!(surface.attach_count(), 2);
    }

    #[tokio::test]
    async fn silently_skips_without_permission() {
        let sim = Arc::new(SimulatedPlatform::new());
        sim.deny_permission(PermissionKind::OverlayDraw);
        let store = Arc::new(MemoryStore::new());
        let (overlay, surface) = presenter(&sim, &store);

        assert!(overlay.show(DEFAULT_TEXT).await.is_ok());
        overlay.flush().await;
        assert_eq!(surface.attach_count(), 0);
        assert!(!surface.frame().visible);
    }

    #[test]
    fn position_parsing() {
        assert_eq!(parse_position("12, 34"), Some((12, 34)));
        assert_eq!(parse_position("12"), None);
        assert_eq!(parse_position("a,b"), None);
    }

    #[test]
    fn file_surface_publishes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.json");
        let mut surface = FileSurface::new(path.clone());

        surface.attach("BoostMode Active", 10, 20).unwrap();
        surface.update_text("Low memory available").unwrap();
        let frame: OverlayFrame = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(frame.visible);
        assert_eq!(frame.text, "Low memory available");

        surface.detach().unwrap();
        let frame: OverlayFrame = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!frame.visible);
        assert_eq!((frame.x, frame.y), (10, 20));
    }
}
