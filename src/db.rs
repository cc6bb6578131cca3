use std::path::Path;

use anyhow::Context;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::config::Weights;
use crate::ingest;
use crate::matcher::AmbiguousMatch;
use crate::models::{DriverKpi, KpiReport, ReportListing, SystemDriver};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let drivers = vec![
        ("Jane Doe", "AMZ-1001"),
        ("Sam Park", "AMZ-1002"),
        ("Lee Kim", "AMZ-1003"),
    ];

    for (name, amazon_id) in drivers {
        upsert_driver(pool, name, Some(amazon_id)).await?;
    }

    Ok(())
}

async fn upsert_driver(pool: &PgPool, name: &str, amazon_id: Option<&str>) -> anyhow::Result<bool> {
    let result = match amazon_id {
        Some(amazon_id) => {
            sqlx::query(
                r#"
                INSERT INTO driver_kpi.drivers (name, amazon_id)
                VALUES ($1, $2)
                ON CONFLICT (amazon_id) DO UPDATE
                SET name = EXCLUDED.name
                "#,
            )
            .bind(name)
            .bind(amazon_id)
            .execute(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO driver_kpi.drivers (name, amazon_id)
                SELECT $1, NULL
                WHERE NOT EXISTS (
                    SELECT 1 FROM driver_kpi.drivers
                    WHERE amazon_id IS NULL AND lower(name) = lower($1)
                )
                "#,
            )
            .bind(name)
            .execute(pool)
            .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

pub async fn import_drivers(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let records = ingest::load_driver_records(csv_path)?;
    let mut written = 0usize;

    for record in records {
        let name = record.name.trim();
        if name.is_empty() {
            tracing::warn!("skipping driver record without a name");
            continue;
        }
        let amazon_id = record
            .amazon_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if upsert_driver(pool, name, amazon_id).await? {
            written += 1;
        }
    }

    Ok(written)
}

pub async fn fetch_registry(pool: &PgPool) -> anyhow::Result<Vec<SystemDriver>> {
    let rows = sqlx::query("SELECT id, name, amazon_id FROM driver_kpi.drivers ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| SystemDriver {
            id: row.get("id"),
            name: row.get("name"),
            amazon_id: row.get("amazon_id"),
        })
        .collect())
}

/// Persists a report and all of its rows in one transaction. An existing
/// report for the same week and year is replaced only when `replace` is set.
pub async fn save_report(pool: &PgPool, report: &KpiReport, replace: bool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    let existing: Option<Uuid> = sqlx::query(
        "SELECT id FROM driver_kpi.reports WHERE week = $1 AND year = $2 FOR UPDATE",
    )
    .bind(&report.week)
    .bind(report.year)
    .fetch_optional(&mut *tx)
    .await?
    .map(|row| row.get("id"));

    if let Some(id) = existing {
        if !replace {
            anyhow::bail!(
                "a report for week {} {} already exists ({id}); regenerate with --replace",
                report.week,
                report.year
            );
        }
        sqlx::query("DELETE FROM driver_kpi.reports WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tracing::info!(%id, "replaced existing report");
    }

    sqlx::query(
        r#"
        INSERT INTO driver_kpi.reports
        (id, week, year, created_at, min_delivered, dnr_threshold,
         weight_dnr, weight_dcr, weight_netradyne, weight_pod, weight_cc,
         overall_standing, warnings)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(report.id)
    .bind(&report.week)
    .bind(report.year)
    .bind(report.created_at)
    .bind(report.min_delivered)
    .bind(report.dnr_threshold)
    .bind(report.weights.dnr)
    .bind(report.weights.dcr)
    .bind(report.weights.netradyne)
    .bind(report.weights.pod)
    .bind(report.weights.cc)
    .bind(&report.overall_standing)
    .bind(Json(&report.warnings))
    .execute(&mut *tx)
    .await
    .context("failed to insert report")?;

    insert_driver_kpis(&mut tx, report.id, &report.drivers).await?;

    tx.commit().await?;
    Ok(())
}

async fn insert_driver_kpis(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    drivers: &[DriverKpi],
) -> anyhow::Result<()> {
    for (position, kpi) in drivers.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO driver_kpi.driver_kpis
            (report_id, position, driver_name, amazon_id, overall_score, delivered,
             netradyne_score, dnr_dpmo, dcr, pod, cc, rank,
             is_matched, pdf_matched, csv_matched, ambiguous_match)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(report_id)
        .bind(position as i32)
        .bind(&kpi.driver_name)
        .bind(&kpi.amazon_id)
        .bind(kpi.overall_score)
        .bind(kpi.delivered)
        .bind(kpi.netradyne_score)
        .bind(kpi.dnr_dpmo)
        .bind(kpi.dcr)
        .bind(kpi.pod)
        .bind(kpi.cc)
        .bind(kpi.rank.map(|rank| rank as i32))
        .bind(kpi.is_matched)
        .bind(kpi.pdf_matched)
        .bind(kpi.csv_matched)
        .bind(kpi.ambiguous_match)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("failed to insert KPI row for {}", kpi.driver_name))?;
    }
    Ok(())
}

pub async fn list_reports(pool: &PgPool) -> anyhow::Result<Vec<ReportListing>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.week, r.year, r.created_at, r.overall_standing,
               COUNT(k.position) AS driver_count
        FROM driver_kpi.reports r
        LEFT JOIN driver_kpi.driver_kpis k ON k.report_id = r.id
        GROUP BY r.id
        ORDER BY r.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut listings: Vec<ReportListing> = rows
        .into_iter()
        .map(|row| ReportListing {
            id: row.get("id"),
            week: row.get("week"),
            year: row.get("year"),
            created_at: row.get("created_at"),
            overall_standing: row.get("overall_standing"),
            driver_count: row.get("driver_count"),
        })
        .collect();
    sort_listings(&mut listings);
    Ok(listings)
}

/// Week labels are free text ("9", "W32"); the digits decide the order.
fn week_number(week: &str) -> Option<u32> {
    let digits: String = week.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Newest year and week first. Rows arrive newest-created first, and the
/// stable sort keeps that order within a week.
fn sort_listings(listings: &mut [ReportListing]) {
    listings.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then_with(|| week_number(&b.week).cmp(&week_number(&a.week)))
            .then_with(|| b.week.cmp(&a.week))
    });
}

pub async fn fetch_report(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<KpiReport>> {
    let Some(row) = sqlx::query("SELECT * FROM driver_kpi.reports WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let kpi_rows = sqlx::query(
        "SELECT * FROM driver_kpi.driver_kpis WHERE report_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let drivers = kpi_rows
        .into_iter()
        .map(|row| DriverKpi {
            driver_name: row.get("driver_name"),
            amazon_id: row.get("amazon_id"),
            overall_score: row.get("overall_score"),
            delivered: row.get("delivered"),
            netradyne_score: row.get("netradyne_score"),
            dnr_dpmo: row.get("dnr_dpmo"),
            dcr: row.get("dcr"),
            pod: row.get("pod"),
            cc: row.get("cc"),
            rank: row.get::<Option<i32>, _>("rank").map(|rank| rank as u32),
            is_matched: row.get("is_matched"),
            pdf_matched: row.get("pdf_matched"),
            csv_matched: row.get("csv_matched"),
            ambiguous_match: row.get("ambiguous_match"),
        })
        .collect();

    let warnings: Json<Vec<AmbiguousMatch>> = row.get("warnings");

    Ok(Some(KpiReport {
        id: row.get("id"),
        week: row.get("week"),
        year: row.get("year"),
        created_at: row.get("created_at"),
        min_delivered: row.get("min_delivered"),
        dnr_threshold: row.get("dnr_threshold"),
        weights: Weights {
            dnr: row.get("weight_dnr"),
            dcr: row.get("weight_dcr"),
            netradyne: row.get("weight_netradyne"),
            pod: row.get("weight_pod"),
            cc: row.get("weight_cc"),
        },
        overall_standing: row.get("overall_standing"),
        drivers,
        warnings: warnings.0,
    }))
}

/// Deletes a report; its KPI rows go with it through the cascade.
pub async fn delete_report(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM driver_kpi.reports WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
