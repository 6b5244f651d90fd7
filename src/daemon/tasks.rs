//! Periodic loops. Session loops report to the controller over a channel and
//! stop when the cancel flag flips; the status loop lives as long as the
//! daemon.

use crate::common::types::GameStatusUpdate;
use crate::core::config::{GameList, Thresholds};
use crate::core::error::{BoostError, Result};
use crate::core::platform::Platform;
use crate::core::qos::DEFAULT_TARGET_PING_MS;
use crate::core::sampler::{self, PerformanceSample};
use crate::core::store::{KeyValueStore, get_parsed, keys};
use crate::core::wifi::{self, WifiReport};
use crate::daemon::events::BoostEvent;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
pub enum LoopReport {
    Wifi(WifiReport),
    WifiError(BoostError),
    Performance(PerformanceSample),
}

fn ticker(period: Duration) -> time::Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Resolves once the flag is set or its sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

pub fn last_target_ping(store: &dyn KeyValueStore) -> u32 {
    get_parsed(store, keys::TARGET_PING).unwrap_or(DEFAULT_TARGET_PING_MS)
}

/// One Wi-Fi analysis pass. Fails with `WifiDisabled` while the radio is off.
pub async fn wifi_tick(platform: &dyn Platform, catalogue: &RwLock<GameList>) -> Result<WifiReport> {
    if !platform.wifi_enabled().await? {
        return Err(BoostError::WifiDisabled);
    }

    let scan = platform.wifi_scan().await?;
    let connected = platform.connected_ssid().await.unwrap_or_else(|e| {
        tracing::debug!(target: "gameboost::wifi", "Connected SSID unavailable: {}", e);
        None
    });
    let foreground = platform.foreground_package().await.unwrap_or_else(|e| {
        tracing::debug!(target: "gameboost::wifi", "Foreground unavailable: {}", e);
        None
    });

    let list = catalogue
        .read()
        .map_err(|_| BoostError::transient("gamelist lock poisoned"))?;
    let report = wifi::analyze(&scan, connected.as_deref(), foreground.as_deref(), &list);

    tracing::debug!(
        target: "gameboost::wifi",
        "Scan: {} networks, {} repeaters, game={:?}, preferred={:?}",
        report.networks.len(),
        report.repeaters.len(),
        report.game_app,
        report.preferred_network
    );
    Ok(report)
}

pub async fn wifi_loop(
    platform: Arc<dyn Platform>,
    catalogue: Arc<RwLock<GameList>>,
    period: Duration,
    reports: mpsc::Sender<LoopReport>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut interval = ticker(period);
    let mut radio_off = false;

    loop {
        tokio::select! {
            _ = cancelled(&mut cancel) => break,
            _ = interval.tick() => {}
        }

        let report = match wifi_tick(platform.as_ref(), &catalogue).await {
            Ok(r) => {
                if radio_off {
                    tracing::info!(target: "gameboost::wifi", "Wi-Fi back on, resuming scans");
                    radio_off = false;
                }
                LoopReport::Wifi(r)
            }
            Err(BoostError::WifiDisabled) if radio_off => continue,
            Err(BoostError::WifiDisabled) => {
                tracing::warn!(target: "gameboost::wifi", "Wi-Fi disabled, pausing scans");
                radio_off = true;
                LoopReport::WifiError(BoostError::WifiDisabled)
            }
            Err(e) => {
                tracing::warn!(target: "gameboost::wifi", "Scan failed: {}", e);
                LoopReport::WifiError(e)
            }
        };

        if *cancel.borrow() || reports.send(report).await.is_err() {
            break;
        }
    }
    tracing::debug!(target: "gameboost::wifi", "Wi-Fi loop stopped");
}

pub async fn perf_loop(
    platform: Arc<dyn Platform>,
    store: Arc<dyn KeyValueStore>,
    thresholds: Thresholds,
    period: Duration,
    reports: mpsc::Sender<LoopReport>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            _ = cancelled(&mut cancel) => break,
            _ = interval.tick() => {}
        }

        let ping = last_target_ping(store.as_ref());
        match sampler::sample(platform.as_ref(), ping, &thresholds).await {
            Ok(s) => {
                tracing::debug!(
                    target: "gameboost::sampler",
                    "cpu={:.1}% ram={:.1}% ping={}ms temp={:.1}C warning={:?}",
                    s.cpu_percent,
                    s.ram_percent,
                    s.ping_ms,
                    s.temperature_c,
                    s.warning
                );
                if *cancel.borrow() || reports.send(LoopReport::Performance(s)).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!(target: "gameboost::sampler", "Sample failed: {}", e),
        }
    }
    tracing::debug!(target: "gameboost::sampler", "Performance loop stopped");
}

/// Pushes a [`GameStatusUpdate`] every `period` until `shutdown` flips.
pub async fn status_loop(
    platform: Arc<dyn Platform>,
    store: Arc<dyn KeyValueStore>,
    period: Duration,
    events: broadcast::Sender<BoostEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            _ = cancelled(&mut shutdown) => break,
            _ = interval.tick() => {}
        }

        let update = status_update(platform.as_ref(), store.as_ref()).await;
        // No subscribers is fine.
        let _ = events.send(BoostEvent::Status(update));
    }
}

pub async fn status_update(platform: &dyn Platform, store: &dyn KeyValueStore) -> GameStatusUpdate {
    let cpu_usage = platform.cpu_percent().await.unwrap_or_default();
    let ram_usage = platform
        .memory()
        .await
        .map(|m| m.used_percent())
        .unwrap_or_default();

    let fps = match store.get(keys::CURRENT_GAME) {
        Some(game) => match platform.frame_time_ms(&game).await {
            Ok(Some(ft)) if ft > 0.0 => (1000.0 / ft * 10.0).round() / 10.0,
            _ => 0.0,
        },
        None => 0.0,
    };

    GameStatusUpdate {
        cpu_usage,
        ram_usage,
        fps,
        ping: last_target_ping(store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{ScanResult, SimulatedPlatform};
    use crate::core::store::MemoryStore;

    fn scan() -> Vec<ScanResult> {
        vec![ScanResult {
            bssid: "02:00:00:00:00:01".into(),
            ssid: "Cafe".into(),
            frequency_mhz: 2437,
            signal_dbm: -60,
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn wifi_loop_pauses_while_radio_is_off() {
        let sim = Arc::new(SimulatedPlatform::new());
        sim.set_scan(scan());
        sim.set_wifi_enabled(false);
        let catalogue = Arc::new(RwLock::new(GameList::builtin()));
        let (tx, mut rx) = mpsc::channel(8);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(wifi_loop(sim.clone(), catalogue, Duration::from_secs(20), tx, cancel_rx));

        time::sleep(Duration::from_secs(61)).await;
        assert!(matches!(rx.try_recv(), Ok(LoopReport::WifiError(BoostError::WifiDisabled))));
        assert!(rx.try_recv().is_err());

        sim.set_wifi_enabled(true);
        time::sleep(Duration::from_secs(20)).await;
        assert!(matches!(rx.try_recv(), Ok(LoopReport::Wifi(r)) if r.networks.len() == 1));

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn perf_loop_reports_each_period_until_cancelled() {
        let sim = Arc::new(SimulatedPlatform::new());
        sim.set_cpu(91.0);
        let store = Arc::new(MemoryStore::new());
        let (tx, mut rx) = mpsc::channel(8);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(perf_loop(
            sim.clone(),
            store,
            Thresholds::default(),
            Duration::from_secs(60),
            tx,
            cancel_rx,
        ));

        time::sleep(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());
        time::sleep(Duration::from_secs(2)).await;
        match rx.try_recv() {
            Ok(LoopReport::Performance(s)) => {
                assert_eq!(s.warning.as_deref(), Some(sampler::HIGH_CPU));
                assert_eq!(s.ping_ms, DEFAULT_TARGET_PING_MS);
            }
            other => panic!("unexpected {other:?}"),
        }

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn status_update_derives_fps_from_frame_time() {
        let sim = SimulatedPlatform::new();
        let store = MemoryStore::new();
        store.set(keys::TARGET_PING, "50").unwrap();

        let idle = status_update(&sim, &store).await;
        assert_eq!(idle.fps, 0.0);
        assert_eq!(idle.ping, 50);

        store.set(keys::CURRENT_GAME, "com.tencent.ig").unwrap();
        let playing = status_update(&sim, &store).await;
        assert!((playing.fps - 59.9).abs() < 0.01);
        assert!((playing.ram_usage - 50.0).abs() < 0.01);
    }
}
