use crate::core::cmd::run_cmd_timeout_async;
use anyhow::Result;

/// Frames further apart than this are treated as stalls, not frame time.
const MAX_FRAME_GAP_MS: f32 = 200.0;

/// Mean interval between the most recent presented frames of `package`.
pub async fn frame_time_ms(package: &str) -> Result<Option<f32>> {
    let Some(layer) = find_layer(package).await? else {
        return Ok(None);
    };

    let out = match run_cmd_timeout_async("dumpsys", &["SurfaceFlinger", "--latency", &layer], 1500)
        .await
    {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!(target: "gameboost::sf", "latency dump failed: {:?}", e);
            return Ok(None);
        }
    };

    Ok(parse_latency(&String::from_utf8_lossy(&out.stdout)))
}

async fn find_layer(package: &str) -> Result<Option<String>> {
    let out = match run_cmd_timeout_async("dumpsys", &["SurfaceFlinger", "--list"], 1500).await {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!(target: "gameboost::sf", "layer list failed: {:?}", e);
            return Ok(None);
        }
    };

    Ok(pick_layer(&String::from_utf8_lossy(&out.stdout), package))
}

pub fn pick_layer(list: &str, package: &str) -> Option<String> {
    list.lines()
        .map(str::trim)
        .find(|l| l.contains(package) && l.contains("SurfaceView") && !l.contains("Background"))
        .map(|l| match l.find("RequestedLayerState{") {
            Some(i) => {
                let rest = &l[i + "RequestedLayerState{".len()..];
                rest.split(" parentId=").next().unwrap_or(rest).to_string()
            }
            None => l.to_string(),
        })
}

/// `--latency` prints the refresh period, then `desired present actual`
/// nanosecond triples per frame.
pub fn parse_latency(dump: &str) -> Option<f32> {
    let presents: Vec<u64> = dump
        .lines()
        .skip(1)
        .filter_map(|l| {
            let mut cols = l.split_whitespace();
            let _desired = cols.next()?;
            let present: u64 = cols.next()?.parse().ok()?;
            (present != 0 && present != i64::MAX as u64).then_some(present)
        })
        .collect();

    let gaps: Vec<f32> = presents
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| (w[1] - w[0]) as f32 / 1_000_000.0)
        .filter(|ms| *ms < MAX_FRAME_GAP_MS)
        .collect();

    if gaps.is_empty() {
        return None;
    }
    Some(gaps.iter().sum::<f32>() / gaps.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_present_gaps() {
        let dump = "16666666\n\
                    100\t1000000000\t1000000000\n\
                    100\t1016000000\t1016000000\n\
                    100\t1034000000\t1034000000\n\
                    0\t0\t0\n";
        let ms = parse_latency(dump).unwrap();
        assert!((ms - 17.0).abs() < 0.01);
    }

    #[test]
    fn empty_or_stalled_is_none() {
        assert_eq!(parse_latency("16666666\n"), None);
        assert_eq!(parse_latency("16666666\n1\t1000000000\t1\n1\t2000000000\t1\n"), None);
    }

    #[test]
    fn layer_selection() {
        let list = "com.tencent.ig/MainActivity#0\n\
                    SurfaceView[com.tencent.ig/com.epicgames.ue4.GameActivity]#1\n\
                    Background for SurfaceView[com.tencent.ig]#2\n";
        assert_eq!(
            pick_layer(list, "com.tencent.ig").as_deref(),
            Some("SurfaceView[com.tencent.ig/com.epicgames.ue4.GameActivity]#1")
        );
        assert_eq!(pick_layer(list, "com.other"), None);
    }
}
