use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use driver_kpi_report::models::{MetricsRow, SummaryRow, SystemDriver};
use driver_kpi_report::{assembler, db, ingest, report, KpiReport, ReportConfig, Weights};

#[derive(Parser)]
#[command(name = "driver-kpi-report")]
#[command(about = "Weekly driver KPI scoring and ranking for a delivery fleet", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample registry drivers
    Seed,
    /// Import registry drivers from a CSV file (name, amazon_id)
    ImportDrivers {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a report against the stored registry and persist it
    Generate {
        #[command(flatten)]
        report: ReportArgs,
        /// Replace an existing report for the same week and year
        #[arg(long)]
        replace: bool,
        /// Also write the report as Markdown
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate and print a report without touching the database
    Preview {
        #[command(flatten)]
        report: ReportArgs,
        /// Registry drivers CSV (name, amazon_id)
        #[arg(long)]
        drivers: Option<PathBuf>,
    },
    /// List stored reports
    List,
    /// Show a stored report
    Show {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Delete a stored report and all of its driver rows
    Delete {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args)]
struct ReportArgs {
    /// Summary source rows (CSV)
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Metrics source rows (CSV)
    #[arg(long)]
    metrics: Option<PathBuf>,
    /// Full report configuration as JSON; replaces the flags below
    #[arg(
        long,
        conflicts_with_all = [
            "week",
            "year",
            "min_delivered",
            "dnr_threshold",
            "weight_dnr",
            "weight_dcr",
            "weight_netradyne",
            "weight_pod",
            "weight_cc",
        ]
    )]
    config: Option<PathBuf>,
    #[arg(long, required_unless_present = "config")]
    week: Option<String>,
    #[arg(long, required_unless_present = "config")]
    year: Option<i32>,
    #[arg(long, default_value_t = 430)]
    min_delivered: i64,
    #[arg(long, default_value_t = 1500)]
    dnr_threshold: i64,
    #[arg(long, default_value_t = 0.4)]
    weight_dnr: f64,
    #[arg(long, default_value_t = 0.2)]
    weight_dcr: f64,
    #[arg(long, default_value_t = 0.3)]
    weight_netradyne: f64,
    #[arg(long, default_value_t = 0.05)]
    weight_pod: f64,
    #[arg(long, default_value_t = 0.05)]
    weight_cc: f64,
}

impl ReportArgs {
    fn report_config(&self) -> anyhow::Result<ReportConfig> {
        if let Some(path) = &self.config {
            return ReportConfig::from_json_file(path)
                .with_context(|| format!("failed to read config {}", path.display()));
        }

        Ok(ReportConfig {
            week: self.week.clone().context("--week is required")?,
            year: self.year.context("--year is required")?,
            min_delivered: self.min_delivered,
            dnr_threshold: self.dnr_threshold,
            weights: Weights {
                dnr: self.weight_dnr,
                dcr: self.weight_dcr,
                netradyne: self.weight_netradyne,
                pod: self.weight_pod,
                cc: self.weight_cc,
            },
        })
    }

    fn load_rows(&self) -> anyhow::Result<(Vec<SummaryRow>, Vec<MetricsRow>)> {
        let summary = match &self.summary {
            Some(path) => ingest::load_summary_rows(path)?,
            None => Vec::new(),
        };
        let metrics = match &self.metrics {
            Some(path) => ingest::load_metrics_rows(path)?,
            None => Vec::new(),
        };
        Ok((summary, metrics))
    }

    fn build(&self, registry: &[SystemDriver]) -> anyhow::Result<KpiReport> {
        let config = self.report_config()?;
        let (summary, metrics) = self.load_rows()?;
        Ok(assembler::generate(&summary, &metrics, registry, &config)?)
    }
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn registry_from_csv(path: &Path) -> anyhow::Result<Vec<SystemDriver>> {
    let records = ingest::load_driver_records(path)?;
    Ok(records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| SystemDriver {
            id: idx as i64 + 1,
            name: record.name,
            amazon_id: record.amazon_id,
        })
        .collect())
}

fn print_summary(report: &KpiReport) {
    println!(
        "Week {} {}: {}",
        report.week, report.year, report.overall_standing
    );
    for kpi in report.drivers.iter() {
        let rank = kpi
            .rank
            .map(|rank| format!("#{rank}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4} {} score {:.2} delivered {}{}",
            rank,
            kpi.driver_name,
            kpi.overall_score,
            kpi.delivered,
            if kpi.is_matched { "" } else { " (unmatched)" }
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed drivers inserted.");
        }
        Commands::ImportDrivers { csv } => {
            let pool = connect().await?;
            let written = db::import_drivers(&pool, &csv).await?;
            println!("Imported {written} drivers from {}.", csv.display());
        }
        Commands::Generate {
            report: args,
            replace,
            out,
        } => {
            let pool = connect().await?;
            let registry = db::fetch_registry(&pool).await?;
            let kpi_report = args.build(&registry)?;
            db::save_report(&pool, &kpi_report, replace).await?;
            print_summary(&kpi_report);
            println!("Saved report {}.", kpi_report.id);

            if let Some(out) = out {
                std::fs::write(&out, report::render_markdown(&kpi_report))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Preview {
            report: args,
            drivers,
        } => {
            let registry = match drivers {
                Some(path) => registry_from_csv(&path)?,
                None => Vec::new(),
            };
            let kpi_report = args.build(&registry)?;
            print!("{}", report::render_markdown(&kpi_report));
        }
        Commands::List => {
            let pool = connect().await?;
            let reports = db::list_reports(&pool).await?;
            if reports.is_empty() {
                println!("No reports stored.");
                return Ok(());
            }
            for listing in reports {
                println!(
                    "- {} week {} {} ({} drivers, created {}): {}",
                    listing.id,
                    listing.week,
                    listing.year,
                    listing.driver_count,
                    listing.created_at.format("%Y-%m-%d"),
                    listing.overall_standing
                );
            }
        }
        Commands::Show { id, json } => {
            let pool = connect().await?;
            let kpi_report = db::fetch_report(&pool, id)
                .await?
                .with_context(|| format!("no report with id {id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&kpi_report)?);
            } else {
                print!("{}", report::render_markdown(&kpi_report));
            }
        }
        Commands::Delete { id } => {
            let pool = connect().await?;
            if db::delete_report(&pool, id).await? {
                println!("Deleted report {id}.");
            } else {
                anyhow::bail!("no report with id {id}");
            }
        }
    }

    Ok(())
}
