use crate::config::Weights;
use crate::normalize::NormalizedMetrics;

/// Weighted sum of the normalized metrics. Weights are validated by the caller.
pub fn overall_score(normalized: &NormalizedMetrics, weights: &Weights) -> f64 {
    weights.dnr * normalized.dnr
        + weights.dcr * normalized.dcr
        + weights.netradyne * normalized.netradyne
        + weights.pod * normalized.pod
        + weights.cc * normalized.cc
}

/// Two-decimal rounding used only for display.
pub fn display_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> Weights {
        Weights {
            dnr: 0.4,
            dcr: 0.2,
            netradyne: 0.3,
            pod: 0.05,
            cc: 0.05,
        }
    }

    #[test]
    fn only_netradyne_contributes_for_metrics_only_driver() {
        let normalized = NormalizedMetrics {
            netradyne: 4.8,
            ..NormalizedMetrics::default()
        };
        assert!((overall_score(&normalized, &weights()) - 1.44).abs() < 1e-9);
    }

    #[test]
    fn perfect_metrics_score_five() {
        let normalized = NormalizedMetrics {
            dnr: 5.0,
            dcr: 5.0,
            netradyne: 5.0,
            pod: 5.0,
            cc: 5.0,
        };
        assert!((overall_score(&normalized, &weights()) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn display_rounds_to_two_places() {
        assert_eq!(display_score(3.14159), 3.14);
        assert_eq!(display_score(2.005_1), 2.01);
        assert_eq!(display_score(0.0), 0.0);
    }
}
