//! 2.4 GHz channel analysis over a Wi-Fi scan snapshot.

use crate::core::config::GameList;
use crate::core::platform::ScanResult;
use crate::core::qos::{self, QosSuggestion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BAND_24_MIN_MHZ: u32 = 2412;
pub const BAND_24_MAX_MHZ: u32 = 2484;
pub const OPTIMAL_CHANNELS: [u8; 3] = [1, 6, 11];
/// An optimal channel stays optimal up to this many access points.
pub const MAX_APS_ON_OPTIMAL: u32 = 3;
/// Preferred networks must be stronger than this.
pub const PREFERRED_MIN_DBM: i32 = -70;

/// `(f − 2412) / 5 + 1` for 2.4 GHz frequencies, `None` outside the band.
pub fn channel_for_frequency(frequency_mhz: u32) -> Option<u8> {
    if !(BAND_24_MIN_MHZ..=BAND_24_MAX_MHZ).contains(&frequency_mhz) {
        return None;
    }
    Some(((frequency_mhz - BAND_24_MIN_MHZ) / 5 + 1) as u8)
}

/// Access points per channel 1..=11. Channels without APs are listed with 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHistogram(BTreeMap<u8, u32>);

impl ChannelHistogram {
    pub fn build<I: IntoIterator<Item = u8>>(channels: I) -> Self {
        let mut counts: BTreeMap<u8, u32> = (1..=11).map(|c| (c, 0)).collect();
        for ch in channels {
            if let Some(n) = counts.get_mut(&ch) {
                *n += 1;
            }
        }
        Self(counts)
    }

    pub fn count(&self, channel: u8) -> u32 {
        self.0.get(&channel).copied().unwrap_or(0)
    }

    pub fn is_optimal(&self, channel: u8) -> bool {
        OPTIMAL_CHANNELS.contains(&channel) && self.count(channel) <= MAX_APS_ON_OPTIMAL
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkObservation {
    pub ssid: String,
    pub signal_strength_dbm: i32,
    pub frequency_mhz: u32,
    pub channel: u8,
    pub is_optimal_channel: bool,
    pub is_repeater_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLoad {
    pub channel: u8,
    pub access_points: u32,
}

/// One analysis pass: everything a scan tick reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiReport {
    pub networks: Vec<NetworkObservation>,
    pub channel_interference: Vec<ChannelLoad>,
    pub repeaters: Vec<String>,
    pub game_app: Option<String>,
    pub qos: Option<QosSuggestion>,
    pub preferred_network: Option<String>,
}

/// Repeater of `current`: contains it case-insensitively but is not it.
fn repeater_of(ssid: &str, current: Option<&str>) -> Option<String> {
    let current = current.filter(|c| !c.is_empty())?;
    let (s, c) = (ssid.to_lowercase(), current.to_lowercase());
    (s != c && s.contains(&c)).then(|| current.to_string())
}

pub fn analyze(
    scan: &[ScanResult],
    connected_ssid: Option<&str>,
    foreground: Option<&str>,
    catalogue: &GameList,
) -> WifiReport {
    let in_band: Vec<(&ScanResult, u8)> = scan
        .iter()
        .filter_map(|r| channel_for_frequency(r.frequency_mhz).map(|ch| (r, ch)))
        .collect();

    let histogram = ChannelHistogram::build(in_band.iter().map(|(_, ch)| *ch));

    let networks: Vec<NetworkObservation> = in_band
        .iter()
        .map(|(r, ch)| NetworkObservation {
            ssid: r.ssid.clone(),
            signal_strength_dbm: r.signal_dbm,
            frequency_mhz: r.frequency_mhz,
            channel: *ch,
            is_optimal_channel: histogram.is_optimal(*ch),
            is_repeater_of: repeater_of(&r.ssid, connected_ssid),
        })
        .collect();

    let repeaters = networks
        .iter()
        .filter(|n| n.is_repeater_of.is_some())
        .map(|n| n.ssid.clone())
        .collect();

    let game_app = foreground
        .filter(|pkg| catalogue.is_game(pkg))
        .map(str::to_string);

    let (qos, preferred_network) = match &game_app {
        Some(pkg) => {
            let preferred = networks
                .iter()
                .filter(|n| n.is_optimal_channel && n.signal_strength_dbm > PREFERRED_MIN_DBM)
                .max_by_key(|n| n.signal_strength_dbm)
                .map(|n| n.ssid.clone());
            (Some(qos::suggest(catalogue, pkg)), preferred)
        }
        None => (None, None),
    };

    WifiReport {
        networks,
        channel_interference: histogram
            .iter()
            .map(|(channel, access_points)| ChannelLoad {
                channel,
                access_points,
            })
            .collect(),
        repeaters,
        game_app,
        qos,
        preferred_network,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ap(ssid: &str, freq: u32, dbm: i32) -> ScanResult {
        ScanResult {
            bssid: format!("02:00:00:00:{:02x}:{:02x}", freq % 256, dbm.unsigned_abs()),
            ssid: ssid.into(),
            frequency_mhz: freq,
            signal_dbm: dbm,
        }
    }

    #[test]
    fn channel_formula_boundaries() {
        assert_eq!(channel_for_frequency(2412), Some(1));
        assert_eq!(channel_for_frequency(2417), Some(2));
        assert_eq!(channel_for_frequency(2462), Some(11));
        assert_eq!(channel_for_frequency(2472), Some(13));
        assert_eq!(channel_for_frequency(2411), None);
        assert_eq!(channel_for_frequency(5180), None);
    }

    #[test]
    fn crowded_optimal_channel_is_not_optimal() {
        let h = ChannelHistogram::build([6, 6, 6, 6, 1, 13]);
        assert_eq!(h.count(6), 4);
        assert!(!h.is_optimal(6));
        assert!(h.is_optimal(1));
        assert!(!h.is_optimal(3));
        assert_eq!(h.count(13), 0);
        assert_eq!(h.iter().count(), 11);
    }

    #[test]
    fn strong_ap_on_quiet_channel_six_is_preferred() {
        let scan = vec![
            ap("Cafe", 2437, -65),
            ap("Neighbour", 2437, -80),
            ap("Office", 2422, -40),
            ap("Garage5G", 5200, -30),
        ];
        let report = analyze(&scan, None, Some("com.tencent.ig"), &GameList::builtin());

        assert_eq!(report.networks.len(), 3);
        let cafe = report.networks.iter().find(|n| n.ssid == "Cafe").unwrap();
        assert_eq!(cafe.channel, 6);
        assert!(cafe.is_optimal_channel);
        let office = report.networks.iter().find(|n| n.ssid == "Office").unwrap();
        assert_eq!(office.channel, 3);
        assert!(!office.is_optimal_channel);

        assert_eq!(report.preferred_network.as_deref(), Some("Cafe"));
        assert_eq!(report.game_app.as_deref(), Some("com.tencent.ig"));
        assert_eq!(report.qos.unwrap().bandwidth_percent, 90);
        assert_eq!(report.channel_interference[5], ChannelLoad { channel: 6, access_points: 2 });
    }

    #[test]
    fn no_game_means_no_preference() {
        let scan = vec![ap("Cafe", 2437, -50)];
        let report = analyze(&scan, None, Some("com.example.notes"), &GameList::builtin());
        assert_eq!(report.game_app, None);
        assert_eq!(report.preferred_network, None);
        assert_eq!(report.qos, None);
    }

    #[test]
    fn repeaters_match_case_insensitively() {
        let scan = vec![
            ap("HomeNet", 2412, -50),
            ap("homenet_EXT", 2462, -60),
            ap("MyHomeNet-Repeater", 2437, -70),
            ap("Other", 2437, -70),
        ];
        let report = analyze(&scan, Some("HomeNet"), None, &GameList::builtin());
        assert_eq!(report.repeaters, vec!["homenet_EXT", "MyHomeNet-Repeater"]);
        let ext = report.networks.iter().find(|n| n.ssid == "homenet_EXT").unwrap();
        assert_eq!(ext.is_repeater_of.as_deref(), Some("HomeNet"));

        let unassociated = analyze(&scan, Some(""), None, &GameList::builtin());
        assert!(unassociated.repeaters.is_empty());
    }
}
