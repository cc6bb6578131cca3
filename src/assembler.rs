use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::matcher::{match_identities, MergedIdentity};
use crate::models::{DriverKpi, KpiReport, MetricsRow, SummaryRow, SystemDriver};
use crate::normalize::{normalize, RawMetrics};
use crate::ranking::{assign_ranks, overall_standing};
use crate::scoring::overall_score;

pub fn validate_inputs(
    summary_rows: &[SummaryRow],
    metrics_rows: &[MetricsRow],
    config: &ReportConfig,
) -> Result<(), ReportError> {
    config.validate()?;
    if summary_rows.is_empty() && metrics_rows.is_empty() {
        return Err(ReportError::EmptySource);
    }
    Ok(())
}

pub fn generate(
    summary_rows: &[SummaryRow],
    metrics_rows: &[MetricsRow],
    registry: &[SystemDriver],
    config: &ReportConfig,
) -> Result<KpiReport, ReportError> {
    generate_at(summary_rows, metrics_rows, registry, config, Utc::now())
}

/// Same as [`generate`] with an explicit creation timestamp.
pub fn generate_at(
    summary_rows: &[SummaryRow],
    metrics_rows: &[MetricsRow],
    registry: &[SystemDriver],
    config: &ReportConfig,
    created_at: DateTime<Utc>,
) -> Result<KpiReport, ReportError> {
    validate_inputs(summary_rows, metrics_rows, config)?;

    let outcome = match_identities(summary_rows, metrics_rows, registry);
    let mut drivers: Vec<DriverKpi> = outcome
        .identities
        .iter()
        .map(|identity| score_identity(identity, config))
        .collect();

    assign_ranks(&mut drivers, config.min_delivered);
    let overall_standing = overall_standing(&drivers);

    tracing::info!(
        week = %config.week,
        year = config.year,
        drivers = drivers.len(),
        ranked = drivers.iter().filter(|kpi| kpi.rank.is_some()).count(),
        "generated KPI report"
    );

    Ok(KpiReport {
        id: Uuid::new_v4(),
        week: config.week.trim().to_string(),
        year: config.year,
        created_at,
        min_delivered: config.min_delivered,
        dnr_threshold: config.dnr_threshold,
        weights: config.weights,
        overall_standing,
        drivers,
        warnings: outcome.warnings,
    })
}

/// Summary count wins when both sources report deliveries.
fn delivered_count(identity: &MergedIdentity) -> i64 {
    let from_summary = identity.summary.as_ref().and_then(|row| row.delivered);
    let from_metrics = identity.metrics.as_ref().and_then(|row| row.delivered);

    if let (Some(summary), Some(metrics)) = (from_summary, from_metrics) {
        if summary != metrics {
            tracing::debug!(
                driver = identity.display_name(),
                summary,
                metrics,
                "sources disagree on delivered count"
            );
        }
    }

    from_summary.or(from_metrics).unwrap_or(0)
}

fn score_identity(identity: &MergedIdentity, config: &ReportConfig) -> DriverKpi {
    let summary = identity.summary.as_ref();
    let metrics = identity.metrics.as_ref();

    let raw = RawMetrics {
        dnr_dpmo: summary.and_then(|row| row.dnr_dpmo),
        dcr: summary.and_then(|row| row.dcr),
        pod: summary.and_then(|row| row.pod),
        cc: summary.and_then(|row| row.cc),
        netradyne: metrics.and_then(|row| row.netradyne_score),
    };
    let normalized = normalize(&raw, config.dnr_threshold);

    DriverKpi {
        driver_name: identity.display_name().trim().to_string(),
        amazon_id: identity.amazon_id().map(str::to_string),
        overall_score: overall_score(&normalized, &config.weights),
        delivered: delivered_count(identity),
        netradyne_score: raw.netradyne,
        dnr_dpmo: raw.dnr_dpmo,
        dcr: raw.dcr,
        pod: raw.pod,
        cc: raw.cc,
        rank: None,
        is_matched: identity.is_matched(),
        pdf_matched: identity.pdf_matched(),
        csv_matched: identity.csv_matched(),
        ambiguous_match: identity.ambiguous,
    }
}
