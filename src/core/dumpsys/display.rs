use crate::core::platform::DisplaySize;
use anyhow::{Context, Result};
use regex::Regex;

/// Distinct refresh rates from the `appsSupportedModes [...]` list of
/// `dumpsys display`, ascending.
pub fn parse_supported_rates(dump: &str) -> Result<Vec<f32>> {
    let marker = "appsSupportedModes [";
    let start = dump
        .find(marker)
        .context("appsSupportedModes missing from dumpsys display")?
        + marker.len();
    let rest = &dump[start..];

    let mut depth = 1;
    let mut end = None;
    for (i, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            end = Some(i);
            break;
        }
    }
    let modes = &rest[..end.context("unterminated appsSupportedModes list")?];

    let re = Regex::new(r"id=\d+, width=\d+, height=\d+, fps=([\d.]+)")?;
    let mut rates: Vec<f32> = Vec::new();
    for caps in re.captures_iter(modes) {
        let fps: f32 = caps[1].parse()?;
        let fps = fps.round();
        if !rates.contains(&fps) {
            rates.push(fps);
        }
    }
    rates.sort_by(f32::total_cmp);
    Ok(rates)
}

/// Parses `wm size` output.
pub fn parse_wm_size(out: &str) -> Result<DisplaySize> {
    let mut physical = None;
    let mut override_size = None;

    let re = Regex::new(r"(Physical|Override) size:\s*(\d+)x(\d+)")?;
    for caps in re.captures_iter(out) {
        let dims = (caps[2].parse()?, caps[3].parse()?);
        match &caps[1] {
            "Physical" => physical = Some(dims),
            _ => override_size = Some(dims),
        }
    }

    Ok(DisplaySize {
        physical: physical.context("wm size reported no physical size")?,
        override_size,
    })
}
