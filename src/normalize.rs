use serde::{Deserialize, Serialize};

pub const SCALE_MAX: f64 = 5.0;

/// Normalized metric scores, each in `[0, 5]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub dnr: f64,
    pub dcr: f64,
    pub netradyne: f64,
    pub pod: f64,
    pub cc: f64,
}

/// Raw metrics gathered for one identity. `None` means the source carrying
/// the metric did not include this driver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawMetrics {
    pub dnr_dpmo: Option<f64>,
    pub dcr: Option<f64>,
    pub pod: Option<f64>,
    pub cc: Option<f64>,
    pub netradyne: Option<f64>,
}

fn clamp_scale(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, SCALE_MAX)
    } else {
        0.0
    }
}

/// Zero defects scores 5, anything at or above the threshold scores 0.
pub fn normalize_dnr(dpmo: Option<f64>, threshold: i64) -> f64 {
    let (Some(dpmo), true) = (dpmo, threshold > 0) else {
        return 0.0;
    };
    if !dpmo.is_finite() {
        return 0.0;
    }
    let threshold = threshold as f64;
    if dpmo >= threshold {
        return 0.0;
    }
    clamp_scale(SCALE_MAX * (1.0 - dpmo.max(0.0) / threshold))
}

/// Maps a percentage in `[0, 100]` onto `[0, 5]`.
pub fn normalize_percentage(value: Option<f64>) -> f64 {
    value.map_or(0.0, |pct| clamp_scale(pct / 100.0 * SCALE_MAX))
}

pub fn normalize_netradyne(score: Option<f64>) -> f64 {
    score.map_or(0.0, clamp_scale)
}

pub fn normalize(raw: &RawMetrics, dnr_threshold: i64) -> NormalizedMetrics {
    NormalizedMetrics {
        dnr: normalize_dnr(raw.dnr_dpmo, dnr_threshold),
        dcr: normalize_percentage(raw.dcr),
        netradyne: normalize_netradyne(raw.netradyne),
        pod: normalize_percentage(raw.pod),
        cc: normalize_percentage(raw.cc),
    }
}
