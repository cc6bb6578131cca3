use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Weights;
use crate::matcher::AmbiguousMatch;

/// One row of the weekly performance summary. The name is the only join key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub driver_name: String,
    pub delivered: Option<i64>,
    pub dnr_dpmo: Option<f64>,
    pub dcr: Option<f64>,
    pub pod: Option<f64>,
    pub cc: Option<f64>,
}

/// One row of the per-driver metrics export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub driver_name: String,
    pub amazon_id: Option<String>,
    pub netradyne_score: Option<f64>,
    pub delivered: Option<i64>,
}

/// A driver known to the registry. Read-only for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDriver {
    pub id: i64,
    pub name: String,
    pub amazon_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverKpi {
    pub driver_name: String,
    pub amazon_id: Option<String>,
    pub overall_score: f64,
    pub delivered: i64,
    pub netradyne_score: Option<f64>,
    pub dnr_dpmo: Option<f64>,
    pub dcr: Option<f64>,
    pub pod: Option<f64>,
    pub cc: Option<f64>,
    /// `None` when the driver fell below the delivery minimum.
    pub rank: Option<u32>,
    pub is_matched: bool,
    pub pdf_matched: bool,
    pub csv_matched: bool,
    pub ambiguous_match: bool,
}

/// A generated report. Never edited after creation; regenerate instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub id: Uuid,
    pub week: String,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub min_delivered: i64,
    pub dnr_threshold: i64,
    pub weights: Weights,
    pub overall_standing: String,
    pub drivers: Vec<DriverKpi>,
    #[serde(default)]
    pub warnings: Vec<AmbiguousMatch>,
}

impl KpiReport {
    pub fn ranked(&self) -> impl Iterator<Item = &DriverKpi> {
        self.drivers.iter().filter(|kpi| kpi.rank.is_some())
    }

    pub fn unranked(&self) -> impl Iterator<Item = &DriverKpi> {
        self.drivers.iter().filter(|kpi| kpi.rank.is_none())
    }
}

/// Row returned when listing stored reports.
#[derive(Debug, Clone)]
pub struct ReportListing {
    pub id: Uuid,
    pub week: String,
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub overall_standing: String,
    pub driver_count: i64,
}
