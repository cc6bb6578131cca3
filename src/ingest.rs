use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::models::{MetricsRow, SummaryRow};

#[derive(Debug, Deserialize)]
struct SummaryRecord {
    #[serde(alias = "Name", alias = "driver_name")]
    name: String,
    #[serde(alias = "Delivered", default)]
    delivered: Option<i64>,
    #[serde(alias = "DNR DPMO", alias = "dnr_dpmo", default)]
    dnr: Option<f64>,
    #[serde(alias = "DCR", default)]
    dcr: Option<f64>,
    #[serde(alias = "POD", default)]
    pod: Option<f64>,
    #[serde(alias = "CC", default)]
    cc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MetricsRecord {
    #[serde(alias = "Name", alias = "driver_name")]
    name: String,
    #[serde(alias = "Amazon ID", alias = "amazon_id", default)]
    amazon_id: Option<String>,
    #[serde(alias = "Netradyne", alias = "netradyne_score", default)]
    netradyne: Option<f64>,
    #[serde(alias = "Delivered", default)]
    delivered: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DriverRecord {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Amazon ID", default)]
    pub amazon_id: Option<String>,
}

fn read_csv<T, P>(path: P) -> anyhow::Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<T>().enumerate() {
        let row = result.with_context(|| format!("{}: bad record {}", path.display(), line + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn load_summary_rows(path: impl AsRef<Path>) -> anyhow::Result<Vec<SummaryRow>> {
    let records: Vec<SummaryRecord> = read_csv(path)?;
    Ok(records
        .into_iter()
        .map(|record| SummaryRow {
            driver_name: record.name,
            delivered: record.delivered,
            dnr_dpmo: record.dnr,
            dcr: record.dcr,
            pod: record.pod,
            cc: record.cc,
        })
        .collect())
}

pub fn load_metrics_rows(path: impl AsRef<Path>) -> anyhow::Result<Vec<MetricsRow>> {
    let records: Vec<MetricsRecord> = read_csv(path)?;
    Ok(records
        .into_iter()
        .map(|record| MetricsRow {
            driver_name: record.name,
            amazon_id: record.amazon_id.filter(|id| !id.is_empty()),
            netradyne_score: record.netradyne,
            delivered: record.delivered,
        })
        .collect())
}

pub fn load_driver_records(path: impl AsRef<Path>) -> anyhow::Result<Vec<DriverRecord>> {
    read_csv(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_summary_with_display_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "summary.csv",
            "Name,Delivered,DNR DPMO,DCR,POD,CC\n\
             Jane Doe,450,300,99.1,98.7,96\n\
             Sam Park,,,,,\n",
        );

        let rows = load_summary_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].driver_name, "Jane Doe");
        assert_eq!(rows[0].delivered, Some(450));
        assert_eq!(rows[0].dcr, Some(99.1));
        assert_eq!(rows[1].delivered, None);
        assert_eq!(rows[1].cc, None);
    }

    #[test]
    fn loads_metrics_and_drops_blank_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "metrics.csv",
            "Name,Amazon ID,Netradyne,Delivered\n\
             Jane Doe, AMZ-1001 ,4.8,450\n\
             Sam Park,,3.9,480\n",
        );

        let rows = load_metrics_rows(&path).unwrap();
        assert_eq!(rows[0].amazon_id.as_deref(), Some("AMZ-1001"));
        assert_eq!(rows[1].amazon_id, None);
        assert_eq!(rows[1].netradyne_score, Some(3.9));
    }

    #[test]
    fn reports_bad_records_with_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "summary.csv", "Name,Delivered\nJane Doe,lots\n");
        let err = load_summary_rows(&path).unwrap_err();
        assert!(err.to_string().contains("bad record 1"));
    }

    #[test]
    fn loads_driver_registry_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "drivers.csv", "name,amazon_id\nJane Doe,AMZ-1001\nSam Park,\n");
        let records = load_driver_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].amazon_id, None);
    }
}
