//! Boost session state machine.
//!
//! `Inactive → Activating → Active → Deactivating → Inactive`. At most one
//! transition runs at a time; a second Enable/Disable while one is in
//! flight is rejected instead of interleaved.

use crate::common::sanitize_package;
use crate::common::types::{BoostMode, DaemonStatus, LogLevel, SessionState};
use crate::core::backup::{self, SettingsSnapshot};
use crate::core::config::{GameList, Settings, Thresholds};
use crate::core::display::DisplayBackup;
use crate::core::error::{BoostError, Result};
use crate::core::graphics::{GraphicsSettings, Profile, RawGraphics};
use crate::core::overlay::{DEFAULT_TEXT, OverlayPresenter};
use crate::core::permission::PermissionGate;
use crate::core::platform::Platform;
use crate::core::qos::{self, QosSuggestion};
use crate::core::reaper;
use crate::core::store::{KeyValueStore, keys};
use crate::core::wifi::WifiReport;
use crate::daemon::events::BoostEvent;
use crate::daemon::tasks::{self, LoopReport};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableOutcome {
    pub message: String,
    pub mode: BoostMode,
    pub graphics: GraphicsSettings,
    pub current_game: Option<String>,
    pub target_ping_ms: u32,
    pub qos: Option<QosSuggestion>,
    pub killed: Vec<String>,
    pub battery_saver: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableOutcome {
    pub message: String,
    pub restore_failures: Vec<String>,
}

/// Resources that exist only while a session is Active.
struct ActiveSession {
    mode: BoostMode,
    started_at_ms: u128,
    current_game: Option<String>,
    target_ping_ms: u32,
    snapshot: SettingsSnapshot,
    display: DisplayBackup,
    cancel: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
    pump: JoinHandle<()>,
}

/// Loop timing for one session, fixed when the session starts.
#[derive(Debug, Clone, Copy)]
struct LoopPlan {
    wifi_period: Duration,
    perf_period: Duration,
    thresholds: Thresholds,
}

/// Puts the state back to `rollback` unless the transition was committed.
struct TransitionGuard<'a> {
    state: &'a Mutex<SessionState>,
    rollback: SessionState,
    committed: bool,
}

impl TransitionGuard<'_> {
    fn commit(mut self, to: SessionState) {
        set_state(self.state, to);
        self.committed = true;
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            set_state(self.state, self.rollback);
        }
    }
}

fn set_state(state: &Mutex<SessionState>, to: SessionState) {
    let mut s = state.lock().unwrap_or_else(|e| e.into_inner());
    *s = to;
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

pub struct BoostController {
    platform: Arc<dyn Platform>,
    store: Arc<dyn KeyValueStore>,
    gate: Arc<PermissionGate>,
    overlay: Arc<OverlayPresenter>,
    catalogue: Arc<RwLock<GameList>>,
    settings: Arc<RwLock<Settings>>,
    events: broadcast::Sender<BoostEvent>,
    log_level: RwLock<LogLevel>,
    state: Mutex<SessionState>,
    session: Mutex<Option<ActiveSession>>,
    /// Held for the whole of an Enable or Disable.
    transition: tokio::sync::Mutex<()>,
    closing: AtomicBool,
}

impl BoostController {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn KeyValueStore>,
        catalogue: Arc<RwLock<GameList>>,
        settings: Arc<RwLock<Settings>>,
    ) -> anyhow::Result<Self> {
        let (ttl, position, level) = {
            let s = settings
                .read()
                .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
            (
                s.session.permission_ttl(),
                (s.overlay.x, s.overlay.y),
                LogLevel::from_str_ignore_case(&s.daemon.log_level).unwrap_or(LogLevel::Info),
            )
        };

        let gate = Arc::new(PermissionGate::new(platform.clone(), store.clone(), ttl));
        let surface_platform = platform.clone();
        let overlay = Arc::new(OverlayPresenter::spawn(
            move || surface_platform.overlay_surface(),
            gate.clone(),
            store.clone(),
            position,
        )?);
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            platform,
            store,
            gate,
            overlay,
            catalogue,
            settings,
            events,
            log_level: RwLock::new(level),
            state: Mutex::new(SessionState::Inactive),
            session: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
            closing: AtomicBool::new(false),
        })
    }

    pub fn platform(&self) -> Arc<dyn Platform> {
        self.platform.clone()
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn catalogue(&self) -> Arc<RwLock<GameList>> {
        self.catalogue.clone()
    }

    pub fn overlay(&self) -> &OverlayPresenter {
        &self.overlay
    }

    pub fn events(&self) -> broadcast::Sender<BoostEvent> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoostEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_log_level(&self, level: LogLevel) {
        if let Ok(mut l) = self.log_level.write() {
            *l = level;
        }
    }

    pub fn invalidate_permissions(&self) {
        self.gate.invalidate();
    }

    fn lock_transition(&self) -> Result<tokio::sync::MutexGuard<'_, ()>> {
        self.transition.try_lock().map_err(|_| BoostError::AlreadyInProgress)
    }

    fn begin(&self, from: SessionState, to: SessionState) -> Result<TransitionGuard<'_>> {
        let mut s = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *s {
            current if current == from => {
                *s = to;
                Ok(TransitionGuard {
                    state: &self.state,
                    rollback: from,
                    committed: false,
                })
            }
            SessionState::Activating | SessionState::Deactivating => Err(BoostError::AlreadyInProgress),
            SessionState::Active => Err(BoostError::AlreadyActive),
            SessionState::Inactive => Err(BoostError::InvalidInput("no active session".into())),
        }
    }

    fn announce(&self, state: SessionState, mode: Option<BoostMode>, message: &str) {
        let _ = self.events.send(BoostEvent::Transition {
            state,
            mode,
            message: message.to_string(),
        });
    }

    pub async fn enable_profile(&self, profile: Profile) -> Result<EnableOutcome> {
        let (mode, graphics) = profile.preset();
        tracing::info!(target: "gameboost::controller", "Profile {} → {} mode", profile, mode);
        self.activate(mode, graphics, profile.dims_screen()).await
    }

    /// Convenience for callers holding unvalidated strings.
    pub async fn enable_raw(&self, mode: &str, raw: &RawGraphics) -> Result<EnableOutcome> {
        let mode = BoostMode::from_str_ignore_case(mode).unwrap_or_else(|| {
            tracing::warn!(target: "gameboost::controller", "Unknown mode '{}', using Normal", mode);
            BoostMode::Normal
        });
        self.enable(mode, GraphicsSettings::validate(raw)).await
    }

    pub async fn enable(&self, mode: BoostMode, graphics: GraphicsSettings) -> Result<EnableOutcome> {
        self.activate(mode, graphics, false).await
    }

    async fn activate(
        &self,
        mode: BoostMode,
        graphics: GraphicsSettings,
        battery_saver: bool,
    ) -> Result<EnableOutcome> {
        let _transition = self.lock_transition()?;
        if self.closing.load(Ordering::SeqCst) {
            return Err(BoostError::transient("daemon is shutting down"));
        }
        let guard = self.begin(SessionState::Inactive, SessionState::Activating)?;
        tracing::info!(target: "gameboost::controller", "Activating ({} mode)", mode);

        let plan = self.loop_plan()?;

        if let Some(reason) = self.platform.device_restriction().await? {
            tracing::warn!(target: "gameboost::controller", "Device restricted: {}", reason);
            return Err(BoostError::DeviceRestricted(reason));
        }
        self.gate.check_required().await?;

        // Nothing past this point aborts the transition.
        let snapshot = backup::backup(self.platform.as_ref()).await;

        if let Err(e) = self.platform.set_do_not_disturb(true).await {
            tracing::warn!(target: "gameboost::controller", "Failed to enable Do-Not-Disturb: {}", e);
        }

        let (current_game, qos, target_ping_ms) = self.record_game(mode).await;

        let killed = reaper::reap(self.platform.as_ref(), mode).await;
        let display = DisplayBackup::apply(self.platform.as_ref(), &graphics).await;
        backup::apply_boost_overrides(self.platform.as_ref(), mode, &snapshot).await;
        if battery_saver {
            backup::apply_battery_saver(self.platform.as_ref(), &snapshot).await;
        }

        let (cancel, loops, pump) = self.start_loops(plan);

        if let Err(e) = self.overlay.show(DEFAULT_TEXT).await {
            tracing::warn!(target: "gameboost::controller", "Overlay unavailable: {}", e);
        }

        let started_at_ms = now_ms();
        if let Ok(mut session) = self.session.lock() {
            *session = Some(ActiveSession {
                mode,
                started_at_ms,
                current_game: current_game.clone(),
                target_ping_ms,
                snapshot,
                display,
                cancel,
                loops,
                pump,
            });
        }
        guard.commit(SessionState::Active);

        let message = format!("BoostMode enabled ({})", mode);
        tracing::info!(
            target: "gameboost::controller",
            "{}: game={:?} target_ping={}ms killed={}",
            message,
            current_game,
            target_ping_ms,
            killed.len()
        );
        self.announce(SessionState::Active, Some(mode), &message);

        Ok(EnableOutcome {
            message,
            mode,
            graphics,
            current_game,
            target_ping_ms,
            qos,
            killed,
            battery_saver,
        })
    }

    async fn record_game(&self, mode: BoostMode) -> (Option<String>, Option<QosSuggestion>, u32) {
        let foreground = match self.platform.foreground_package().await {
            Ok(fg) => fg,
            Err(e) => {
                tracing::warn!(target: "gameboost::controller", "Foreground lookup failed: {}", e);
                None
            }
        };

        let game = match self.catalogue.read() {
            Ok(list) => foreground
                .filter(|pkg| list.is_game(pkg))
                .map(|pkg| (qos::suggest(&list, &pkg), qos::target_ping(mode, list.genre_of(&pkg)), pkg)),
            Err(_) => None,
        };

        match game {
            Some((suggestion, ping, pkg)) => {
                if let Err(e) = self.store.set(keys::CURRENT_GAME, &pkg) {
                    tracing::warn!(target: "gameboost::controller", "Failed to record current game: {:#}", e);
                }
                if let Err(e) = self.store.set(keys::TARGET_PING, &ping.to_string()) {
                    tracing::warn!(target: "gameboost::controller", "Failed to record target ping: {:#}", e);
                }
                (Some(pkg), Some(suggestion), ping)
            }
            None => (None, None, tasks::last_target_ping(self.store.as_ref())),
        }
    }

    fn loop_plan(&self) -> Result<LoopPlan> {
        let s = self
            .settings
            .read()
            .map_err(|_| BoostError::transient("settings lock poisoned"))?;
        Ok(LoopPlan {
            wifi_period: s.session.wifi_interval(),
            perf_period: s.session.perf_interval(),
            thresholds: s.thresholds,
        })
    }

    fn start_loops(&self, plan: LoopPlan) -> (watch::Sender<bool>, Vec<JoinHandle<()>>, JoinHandle<()>) {
        let (cancel, cancel_rx) = watch::channel(false);
        let (report_tx, report_rx) = mpsc::channel(16);

        let loops = vec![
            tokio::spawn(tasks::wifi_loop(
                self.platform.clone(),
                self.catalogue.clone(),
                plan.wifi_period,
                report_tx.clone(),
                cancel_rx.clone(),
            )),
            tokio::spawn(tasks::perf_loop(
                self.platform.clone(),
                self.store.clone(),
                plan.thresholds,
                plan.perf_period,
                report_tx,
                cancel_rx,
            )),
        ];

        let pump = tokio::spawn(pump_reports(
            report_rx,
            self.overlay.clone(),
            self.store.clone(),
            self.events.clone(),
        ));

        (cancel, loops, pump)
    }

    pub async fn disable(&self) -> Result<DisableOutcome> {
        let _transition = self.lock_transition()?;
        let guard = match self.begin(SessionState::Active, SessionState::Deactivating) {
            Ok(g) => g,
            Err(BoostError::InvalidInput(_)) => {
                return Ok(DisableOutcome {
                    message: "BoostMode already inactive".into(),
                    restore_failures: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };
        tracing::info!(target: "gameboost::controller", "Deactivating");

        let session = self.session.lock().ok().and_then(|mut s| s.take());
        let mut failures = Vec::new();

        if let Some(session) = &session {
            // Loops go first so no tick runs against half-restored settings.
            let _ = session.cancel.send(true);
        }
        let (snapshot, display, mode) = match session {
            Some(s) => {
                for handle in s.loops {
                    if let Err(e) = handle.await {
                        tracing::warn!(target: "gameboost::controller", "Session loop ended abnormally: {}", e);
                    }
                }
                if let Err(e) = s.pump.await {
                    tracing::warn!(target: "gameboost::controller", "Report pump ended abnormally: {}", e);
                }
                (Some(s.snapshot), Some(s.display), Some(s.mode))
            }
            None => (None, None, None),
        };

        if let Err(e) = self.platform.set_do_not_disturb(false).await {
            tracing::warn!(target: "gameboost::controller", "Failed to clear Do-Not-Disturb: {}", e);
            failures.push("do_not_disturb".to_string());
        }

        if let Some(snapshot) = &snapshot {
            failures.extend(
                backup::restore(self.platform.as_ref(), snapshot)
                    .await
                    .into_iter()
                    .map(|k| k.to_string()),
            );
        }
        if let Some(display) = &display
            && !display.revert(self.platform.as_ref()).await
        {
            failures.push("display".to_string());
        }

        if let Err(e) = self.overlay.hide() {
            tracing::warn!(target: "gameboost::controller", "Failed to hide overlay: {}", e);
        }
        if let Err(e) = self.store.remove(keys::CURRENT_GAME) {
            tracing::warn!(target: "gameboost::controller", "Failed to clear current game: {:#}", e);
        }

        guard.commit(SessionState::Inactive);

        let message = if failures.is_empty() {
            "BoostMode disabled".to_string()
        } else {
            format!("BoostMode disabled with warnings: could not restore {}", failures.join(", "))
        };
        tracing::info!(target: "gameboost::controller", "{}", message);
        self.announce(SessionState::Inactive, mode, &message);

        Ok(DisableOutcome {
            message,
            restore_failures: failures,
        })
    }

    /// One on-demand analysis pass. A preferred network is remembered.
    pub async fn scan_wifi(&self) -> Result<WifiReport> {
        let report = tasks::wifi_tick(self.platform.as_ref(), &self.catalogue).await?;
        remember_preferred(self.store.as_ref(), &report);
        Ok(report)
    }

    pub fn suggest_qos(&self, package: &str) -> QosSuggestion {
        let package = sanitize_package(package);
        match self.catalogue.read() {
            Ok(list) => qos::suggest(&list, &package),
            Err(_) => qos::suggest(&GameList::builtin(), &package),
        }
    }

    pub async fn suggest_graphics(&self) -> GraphicsSettings {
        let thresholds = self.settings.read().map(|s| s.thresholds).unwrap_or_default();
        let cpu = self.platform.cpu_percent().await.unwrap_or_default();
        let ram = self
            .platform
            .memory()
            .await
            .map(|m| m.used_percent())
            .unwrap_or_default();
        let temp = self.platform.temperature().await.unwrap_or_default();

        let suggestion = GraphicsSettings::suggest(cpu, ram, temp, &thresholds);
        tracing::debug!(
            target: "gameboost::controller",
            "Graphics suggestion for cpu={:.0}% ram={:.0}% temp={:.1}C: {:?}",
            cpu,
            ram,
            temp,
            suggestion
        );
        suggestion
    }

    pub fn status(&self) -> DaemonStatus {
        let state = self.state();
        let games = self.catalogue.read().map(|l| l.game.len()).unwrap_or(0);
        let log_level = self.log_level.read().map(|l| *l).unwrap_or(LogLevel::Info);

        let session = self.session.lock().ok();
        let active = session.as_ref().and_then(|s| s.as_ref());

        DaemonStatus {
            state,
            mode: active.map(|s| s.mode),
            current_game: active.and_then(|s| s.current_game.clone()),
            target_ping_ms: active.map(|s| s.target_ping_ms),
            started_at_ms: active.map(|s| s.started_at_ms),
            games,
            log_level,
        }
    }

    /// Tears down the session before the daemon exits. An Enable or Disable
    /// already running is allowed to finish first; new Enables are refused.
    pub async fn shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
        drop(self.transition.lock().await);

        if self.state() == SessionState::Active {
            match self.disable().await {
                Ok(outcome) => tracing::info!(target: "gameboost::controller", "Shutdown: {}", outcome.message),
                Err(e) => tracing::error!(target: "gameboost::controller", "Shutdown disable failed: {}", e),
            }
        }
    }
}

fn remember_preferred(store: &dyn KeyValueStore, report: &WifiReport) {
    if let Some(ssid) = &report.preferred_network
        && let Err(e) = store.set(keys::PREFERRED_WIFI, ssid)
    {
        tracing::warn!(target: "gameboost::controller", "Failed to remember preferred Wi-Fi: {:#}", e);
    }
}

/// Receives loop results for the session. Warnings are handed to the
/// overlay; an empty warning leaves the overlay as it is.
async fn pump_reports(
    mut reports: mpsc::Receiver<LoopReport>,
    overlay: Arc<OverlayPresenter>,
    store: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<BoostEvent>,
) {
    while let Some(report) = reports.recv().await {
        let event = match report {
            LoopReport::Wifi(r) => {
                remember_preferred(store.as_ref(), &r);
                BoostEvent::Wifi(r)
            }
            LoopReport::WifiError(e) => BoostEvent::WifiError {
                code: e.error_code().to_string(),
                message: e.to_string(),
            },
            LoopReport::Performance(sample) => {
                if let Some(warning) = &sample.warning
                    && let Err(e) = overlay.show(warning).await
                {
                    tracing::warn!(target: "gameboost::controller", "Failed to show warning: {}", e);
                }
                BoostEvent::Performance(sample)
            }
        };
        let _ = events.send(event);
    }
}
