use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Allowed distance of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 0.001;

/// Per-metric weights for the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub dnr: f64,
    pub dcr: f64,
    pub netradyne: f64,
    pub pod: f64,
    pub cc: f64,
}

impl Weights {
    pub fn total(&self) -> f64 {
        self.dnr + self.dcr + self.netradyne + self.pod + self.cc
    }

    /// Fails with `WeightSum` unless the weights are numbers adding up to 1.0.
    pub fn validate(&self) -> Result<(), ReportError> {
        let total = self.total();
        if !total.is_finite() || (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ReportError::WeightSum {
                total,
                tolerance: WEIGHT_TOLERANCE,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub week: String,
    pub year: i32,
    pub min_delivered: i64,
    pub dnr_threshold: i64,
    pub weights: Weights,
}

impl ReportConfig {
    /// Returns the first fatal problem with the configuration.
    pub fn validate(&self) -> Result<(), ReportError> {
        self.weights.validate()?;

        if self.min_delivered < 0 {
            return Err(ReportError::config(
                "min_delivered",
                format!("must be at least 0, got {}", self.min_delivered),
            ));
        }
        if self.dnr_threshold <= 0 {
            return Err(ReportError::config(
                "dnr_threshold",
                format!("must be greater than 0, got {}", self.dnr_threshold),
            ));
        }
        if self.week.trim().is_empty() {
            return Err(ReportError::config("week", "must not be empty"));
        }
        if self.year <= 0 {
            return Err(ReportError::config("year", format!("must be positive, got {}", self.year)));
        }

        Ok(())
    }

    pub fn from_json_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
