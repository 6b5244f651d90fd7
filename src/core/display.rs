//! Display scaling and refresh cap derived from graphics settings.

use crate::core::graphics::GraphicsSettings;
use crate::core::platform::Platform;

/// What the session changed on the display, so it can be put back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayBackup {
    /// Override in place before the session; `Some(None)` means none was set.
    size: Option<Option<(u32, u32)>>,
    peak_refresh: Option<Option<f32>>,
}

/// Scales both sides by `factor`, keeping them even.
pub fn scaled(physical: (u32, u32), factor: f32) -> (u32, u32) {
    let side = |v: u32| ((v as f32 * factor).round() as u32).max(2) & !1;
    (side(physical.0), side(physical.1))
}

fn rate_supported(rates: &[f32], hz: f32) -> bool {
    rates.iter().any(|r| (r - hz).abs() < 0.5)
}

impl DisplayBackup {
    pub fn is_empty(&self) -> bool {
        self.size.is_none() && self.peak_refresh.is_none()
    }

    pub async fn apply(platform: &dyn Platform, graphics: &GraphicsSettings) -> Self {
        let mut backup = Self::default();

        if let Some(factor) = graphics.resolution.scale_factor() {
            match platform.display_size().await {
                Ok(current) => {
                    let target = scaled(current.physical, factor);
                    match platform.set_display_size(Some(target)).await {
                        Ok(()) => {
                            tracing::info!(target: "gameboost::display", "Resolution scaled to {}x{}", target.0, target.1);
                            backup.size = Some(current.override_size);
                        }
                        Err(e) => tracing::warn!(target: "gameboost::display", "Failed to scale resolution: {}", e),
                    }
                }
                Err(e) => tracing::warn!(target: "gameboost::display", "Failed to read display size: {}", e),
            }
        }

        let hz = graphics.fps_limit as f32;
        let rates = platform.supported_refresh_rates().await.unwrap_or_else(|e| {
            tracing::debug!(target: "gameboost::display", "Refresh rates unavailable: {}", e);
            Vec::new()
        });
        if rate_supported(&rates, hz) {
            match platform.peak_refresh_rate().await {
                Ok(previous) => match platform.set_peak_refresh_rate(Some(hz)).await {
                    Ok(()) => {
                        tracing::info!(target: "gameboost::display", "Refresh rate capped at {}Hz", hz);
                        backup.peak_refresh = Some(previous);
                    }
                    Err(e) => tracing::warn!(target: "gameboost::display", "Failed to cap refresh rate: {}", e),
                },
                Err(e) => tracing::warn!(target: "gameboost::display", "Failed to read refresh rate: {}", e),
            }
        } else {
            tracing::debug!(target: "gameboost::display", "{}Hz not supported, refresh rate untouched", hz);
        }

        backup
    }

    /// Puts back whatever `apply` changed. Failures are logged.
    pub async fn revert(&self, platform: &dyn Platform) -> bool {
        let mut clean = true;

        if let Some(size) = self.size
            && let Err(e) = platform.set_display_size(size).await
        {
            tracing::warn!(target: "gameboost::display", "Failed to restore resolution: {}", e);
            clean = false;
        }
        if let Some(rate) = self.peak_refresh
            && let Err(e) = platform.set_peak_refresh_rate(rate).await
        {
            tracing::warn!(target: "gameboost::display", "Failed to restore refresh rate: {}", e);
            clean = false;
        }
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graphics::{RawGraphics, Resolution};
    use crate::core::platform::SimulatedPlatform;

    #[test]
    fn scaling_keeps_even_sides() {
        assert_eq!(scaled((1080, 2400), 0.5), (540, 1200));
        assert_eq!(scaled((1080, 2400), 0.75), (810, 1800));
        assert_eq!(scaled((1081, 2341), 0.75), (810, 1756));
    }

    #[tokio::test]
    async fn apply_and_revert() {
        let sim = SimulatedPlatform::new();
        sim.set_peak_refresh(Some(120.0));
        let graphics = GraphicsSettings::validate(&RawGraphics::from_pairs(["resolution=low", "fps=60"]));

        let backup = DisplayBackup::apply(&sim, &graphics).await;
        assert_eq!(sim.display().override_size, Some((540, 1200)));
        assert_eq!(sim.peak_refresh(), Some(60.0));

        assert!(backup.revert(&sim).await);
        assert_eq!(sim.display().override_size, None);
        assert_eq!(sim.peak_refresh(), Some(120.0));
    }

    #[tokio::test]
    async fn default_resolution_and_unsupported_rate_touch_nothing() {
        let sim = SimulatedPlatform::new();
        let graphics = GraphicsSettings {
            resolution: Resolution::Default,
            fps_limit: 30,
            ..GraphicsSettings::default()
        };

        let backup = DisplayBackup::apply(&sim, &graphics).await;
        assert!(backup.is_empty());
        assert_eq!(sim.mutations(), 0);
    }
}
