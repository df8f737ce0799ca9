//! Conversions from raw ranging observations to distances
//!
//! Turns received signal strength into a distance with the log-distance path
//! loss model, and reduces repeated round-trip-time samples to the most
//! certain one per anchor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Log-distance path loss parameters of one transmitter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLossModel {
    /// Received power at 1 m (dBm)
    pub reference_rss_dbm: f64,
    /// Path loss exponent `n`; about 2 in free space, higher indoors
    pub exponent: f64,
}

impl PathLossModel {
    pub fn new(reference_rss_dbm: f64, exponent: f64) -> Self {
        Self {
            reference_rss_dbm,
            exponent,
        }
    }

    /// Distance in metres for a received power of `rss_dbm`
    ///
    /// `d = 10^((P_1m - P) / (10 n))`
    pub fn distance_m(&self, rss_dbm: f64) -> f64 {
        10f64.powf((self.reference_rss_dbm - rss_dbm) / (10.0 * self.exponent))
    }

    /// Same as [`distance_m`](Self::distance_m) in millimetres
    pub fn distance_mm(&self, rss_dbm: f64) -> f64 {
        1000.0 * self.distance_m(rss_dbm)
    }
}

/// One round-trip-time ranging sample against a known anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangingSample {
    /// Anchor identifier, e.g. a BSSID
    pub anchor_id: String,
    pub position: Vec<f64>,
    pub distance: f64,
    /// Standard deviation reported with the distance
    pub distance_std_dev: f64,
}

/// Keep, for every anchor, the sample with the smallest reported standard deviation
///
/// Output is ordered by anchor id. Ties keep the earliest sample.
pub fn select_most_certain(samples: &[RangingSample]) -> Vec<RangingSample> {
    let mut best: BTreeMap<&str, &RangingSample> = BTreeMap::new();
    for sample in samples {
        best.entry(sample.anchor_id.as_str())
            .and_modify(|current| {
                if sample.distance_std_dev < current.distance_std_dev {
                    *current = sample;
                }
            })
            .or_insert(sample);
    }
    best.into_values().cloned().collect()
}

/// Split samples into the parallel sequences a model is built from
pub fn to_measurements(samples: &[RangingSample]) -> (Vec<Vec<f64>>, Vec<f64>, Vec<f64>) {
    let positions = samples.iter().map(|s| s.position.clone()).collect();
    let distances = samples.iter().map(|s| s.distance).collect();
    let sigmas = samples.iter().map(|s| s.distance_std_dev).collect();
    (positions, distances, sigmas)
}
