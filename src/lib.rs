pub mod assembler;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod ranking;
pub mod report;
pub mod scoring;

pub use assembler::generate;
pub use config::{ReportConfig, Weights};
pub use error::ReportError;
pub use matcher::{match_identities, AmbiguousMatch, MatchStatus, MergedIdentity};
pub use models::{DriverKpi, KpiReport, MetricsRow, SummaryRow, SystemDriver};
