use std::fmt::Write;

use crate::matcher::AmbiguousMatch;
use crate::models::{DriverKpi, KpiReport};
use crate::scoring::display_score;

fn metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn sources(kpi: &DriverKpi) -> String {
    let mut labels = Vec::new();
    if kpi.pdf_matched {
        labels.push("summary");
    }
    if kpi.csv_matched {
        labels.push("metrics");
    }
    if kpi.is_matched {
        labels.push("registry");
    }
    labels.join(" + ")
}

fn driver_row(output: &mut String, rank: &str, kpi: &DriverKpi) {
    let _ = writeln!(
        output,
        "| {} | {} | {:.2} | {} | {} | {} | {} | {} | {} | {} |",
        rank,
        kpi.driver_name,
        display_score(kpi.overall_score),
        kpi.delivered,
        metric(kpi.dnr_dpmo),
        metric(kpi.dcr),
        metric(kpi.pod),
        metric(kpi.cc),
        metric(kpi.netradyne_score),
        sources(kpi)
    );
}

fn table_header(output: &mut String) {
    let _ = writeln!(
        output,
        "| Rank | Driver | Score | Delivered | DNR DPMO | DCR | POD | CC | Netradyne | Sources |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|---|");
}

/// Renders a report as Markdown.
pub fn render_markdown(report: &KpiReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Driver KPI Report: Week {} {}", report.week, report.year);
    let _ = writeln!(
        output,
        "Generated {} (report {})",
        report.created_at.format("%Y-%m-%d %H:%M UTC"),
        report.id
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "**Overall standing:** {}", report.overall_standing);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Configuration");
    let _ = writeln!(output, "- Minimum delivered: {}", report.min_delivered);
    let _ = writeln!(output, "- DNR threshold (DPMO): {}", report.dnr_threshold);
    let _ = writeln!(
        output,
        "- Weights: DNR {:.2}, DCR {:.2}, Netradyne {:.2}, POD {:.2}, CC {:.2}",
        report.weights.dnr,
        report.weights.dcr,
        report.weights.netradyne,
        report.weights.pod,
        report.weights.cc
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Ranked Drivers");
    if report.ranked().next().is_none() {
        let _ = writeln!(output, "No drivers met the delivery minimum.");
    } else {
        table_header(&mut output);
        for kpi in report.ranked() {
            let rank = kpi.rank.map(|r| r.to_string()).unwrap_or_default();
            driver_row(&mut output, &rank, kpi);
        }
    }

    if report.unranked().next().is_some() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Below Delivery Minimum");
        table_header(&mut output);
        for kpi in report.unranked() {
            driver_row(&mut output, "-", kpi);
        }
    }

    let partial: Vec<&DriverKpi> = report
        .drivers
        .iter()
        .filter(|kpi| !(kpi.pdf_matched && kpi.csv_matched && kpi.is_matched))
        .collect();
    if !partial.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Partial Matches");
        for kpi in partial {
            let _ = writeln!(
                output,
                "- {}: found in {}",
                kpi.driver_name,
                match sources(kpi).as_str() {
                    "" => "no source".to_string(),
                    found => found.to_string(),
                }
            );
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Ambiguous Matches");
        for warning in &report.warnings {
            let line = match warning {
                AmbiguousMatch::Registry {
                    driver_name,
                    candidate_ids,
                    resolved_to,
                } => {
                    let candidates = candidate_ids
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    let resolution = resolved_to.map_or_else(
                        || "left unmatched".to_string(),
                        |id| format!("resolved to {id} by Amazon ID"),
                    );
                    format!("{driver_name} matches registry drivers {candidates}; {resolution}")
                }
                AmbiguousMatch::SummaryName {
                    driver_name,
                    candidate_amazon_ids,
                } => {
                    let candidates = candidate_amazon_ids
                        .iter()
                        .map(|id| id.as_deref().unwrap_or("no Amazon ID"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("summary row {driver_name} fits metrics drivers {candidates}; kept apart")
                }
            };
            let _ = writeln!(output, "- {line}");
        }
    }

    output
}
