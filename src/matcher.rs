use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{MetricsRow, SummaryRow, SystemDriver};

/// How far a driver's identity could be reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Present in both sources but not resolved to a registry driver.
    Unmatched,
    /// Only the summary source has this driver.
    SummaryOnly,
    /// Only the metrics source has this driver.
    MetricsOnly,
    /// Present in both sources and resolved to a registry driver.
    FullyMatched,
}

/// A name that could belong to more than one driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguousMatch {
    /// Two or more registry drivers share the normalized name.
    Registry {
        driver_name: String,
        candidate_ids: Vec<i64>,
        /// Set when the Amazon ID still singled out one candidate.
        resolved_to: Option<i64>,
    },
    /// A summary row names more than one metrics driver. The summary row is
    /// kept apart instead of being paired with either.
    SummaryName {
        driver_name: String,
        candidate_amazon_ids: Vec<Option<String>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedIdentity {
    pub summary: Option<SummaryRow>,
    pub metrics: Option<MetricsRow>,
    pub driver: Option<SystemDriver>,
    pub ambiguous: bool,
}

impl MergedIdentity {
    /// Registry name wins, then the metrics name, then the summary name.
    pub fn display_name(&self) -> &str {
        if let Some(driver) = &self.driver {
            return &driver.name;
        }
        if let Some(metrics) = &self.metrics {
            return &metrics.driver_name;
        }
        self.summary
            .as_ref()
            .map(|row| row.driver_name.as_str())
            .unwrap_or_default()
    }

    pub fn amazon_id(&self) -> Option<&str> {
        self.metrics
            .as_ref()
            .and_then(|row| clean_amazon_id(row.amazon_id.as_deref()))
            .or_else(|| {
                self.driver
                    .as_ref()
                    .and_then(|driver| clean_amazon_id(driver.amazon_id.as_deref()))
            })
    }

    pub fn pdf_matched(&self) -> bool {
        self.summary.is_some()
    }

    pub fn csv_matched(&self) -> bool {
        self.metrics.is_some()
    }

    pub fn is_matched(&self) -> bool {
        self.driver.is_some()
    }

    pub fn status(&self) -> MatchStatus {
        match (self.pdf_matched(), self.csv_matched()) {
            (true, false) => MatchStatus::SummaryOnly,
            (false, true) => MatchStatus::MetricsOnly,
            _ if self.is_matched() => MatchStatus::FullyMatched,
            _ => MatchStatus::Unmatched,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub identities: Vec<MergedIdentity>,
    pub warnings: Vec<AmbiguousMatch>,
}

/// Lowercases and collapses runs of whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_amazon_id(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|id| !id.is_empty())
}

struct RegistryIndex<'a> {
    by_amazon_id: HashMap<&'a str, &'a SystemDriver>,
    by_name: HashMap<String, Vec<&'a SystemDriver>>,
}

impl<'a> RegistryIndex<'a> {
    fn build(registry: &'a [SystemDriver]) -> Self {
        let mut by_amazon_id = HashMap::new();
        let mut by_name: HashMap<String, Vec<&'a SystemDriver>> = HashMap::new();

        for driver in registry {
            if let Some(amazon_id) = clean_amazon_id(driver.amazon_id.as_deref()) {
                by_amazon_id.entry(amazon_id).or_insert(driver);
            }
            let key = normalize_name(&driver.name);
            if !key.is_empty() {
                by_name.entry(key).or_default().push(driver);
            }
        }

        Self {
            by_amazon_id,
            by_name,
        }
    }

    fn resolve(&self, row: &MetricsRow) -> (Option<SystemDriver>, Option<AmbiguousMatch>) {
        let same_name = self
            .by_name
            .get(&normalize_name(&row.driver_name))
            .map(Vec::as_slice)
            .unwrap_or_default();

        let by_id = clean_amazon_id(row.amazon_id.as_deref())
            .and_then(|amazon_id| self.by_amazon_id.get(amazon_id).copied());

        let ambiguity = |resolved_to: Option<i64>| {
            (same_name.len() > 1).then(|| AmbiguousMatch::Registry {
                driver_name: row.driver_name.clone(),
                candidate_ids: same_name.iter().map(|driver| driver.id).collect(),
                resolved_to,
            })
        };

        if let Some(driver) = by_id {
            return (Some(driver.clone()), ambiguity(Some(driver.id)));
        }

        match same_name {
            [driver] => (Some((*driver).clone()), None),
            _ => (None, ambiguity(None)),
        }
    }
}

fn index_names(by_name: &mut HashMap<String, Vec<usize>>, names: &[&str], position: usize) {
    for name in names {
        let key = normalize_name(name);
        if key.is_empty() {
            continue;
        }
        let positions = by_name.entry(key).or_default();
        if !positions.contains(&position) {
            positions.push(position);
        }
    }
}

/// Fills gaps in `existing` from a repeated row for the same Amazon ID.
fn merge_metrics(existing: &mut MetricsRow, repeat: &MetricsRow) {
    if existing.netradyne_score.is_none() {
        existing.netradyne_score = repeat.netradyne_score;
    }
    if existing.delivered.is_none() {
        existing.delivered = repeat.delivered;
    }
}

/// Reconciles both sources against the registry. Every input row ends up in
/// exactly one identity; metrics rows sharing an Amazon ID share one identity.
pub fn match_identities(
    summary_rows: &[SummaryRow],
    metrics_rows: &[MetricsRow],
    registry: &[SystemDriver],
) -> MatchOutcome {
    let index = RegistryIndex::build(registry);
    let mut outcome = MatchOutcome::default();
    let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
    let mut by_amazon_id: HashMap<String, usize> = HashMap::new();

    for row in metrics_rows {
        let amazon_id = clean_amazon_id(row.amazon_id.as_deref());

        if let Some(&position) = amazon_id.and_then(|id| by_amazon_id.get(id)) {
            let identity = &mut outcome.identities[position];
            if let Some(existing) = identity.metrics.as_mut() {
                tracing::warn!(
                    driver = %row.driver_name,
                    amazon_id = ?amazon_id,
                    kept = %existing.driver_name,
                    "merged repeated metrics row"
                );
                merge_metrics(existing, row);
            }
            index_names(&mut by_name, &[row.driver_name.as_str()], position);
            continue;
        }

        let (driver, ambiguous) = index.resolve(row);
        if let Some(AmbiguousMatch::Registry {
            driver_name,
            candidate_ids,
            resolved_to,
        }) = &ambiguous
        {
            tracing::warn!(
                driver = %driver_name,
                candidates = ?candidate_ids,
                resolved_to = ?resolved_to,
                "ambiguous registry match"
            );
        }

        let position = outcome.identities.len();
        let mut names = vec![row.driver_name.as_str()];
        if let Some(driver) = &driver {
            names.push(driver.name.as_str());
        }
        index_names(&mut by_name, &names, position);
        if let Some(id) = amazon_id {
            by_amazon_id.insert(id.to_string(), position);
        }

        outcome.identities.push(MergedIdentity {
            summary: None,
            metrics: Some(row.clone()),
            driver,
            ambiguous: ambiguous.is_some(),
        });
        outcome.warnings.extend(ambiguous);
    }

    let mut summary_only = Vec::new();
    for row in summary_rows {
        let open: Vec<usize> = by_name
            .get(&normalize_name(&row.driver_name))
            .map(|positions| {
                positions
                    .iter()
                    .copied()
                    .filter(|&position| outcome.identities[position].summary.is_none())
                    .collect()
            })
            .unwrap_or_default();

        match open.as_slice() {
            [position] => outcome.identities[*position].summary = Some(row.clone()),
            [] => summary_only.push(MergedIdentity {
                summary: Some(row.clone()),
                metrics: None,
                driver: None,
                ambiguous: false,
            }),
            candidates => {
                let candidate_amazon_ids: Vec<Option<String>> = candidates
                    .iter()
                    .map(|&position| {
                        let identity = &mut outcome.identities[position];
                        identity.ambiguous = true;
                        identity.amazon_id().map(str::to_string)
                    })
                    .collect();
                tracing::warn!(
                    driver = %row.driver_name,
                    candidates = ?candidate_amazon_ids,
                    "summary row names more than one metrics driver"
                );
                outcome.warnings.push(AmbiguousMatch::SummaryName {
                    driver_name: row.driver_name.clone(),
                    candidate_amazon_ids,
                });
                summary_only.push(MergedIdentity {
                    summary: Some(row.clone()),
                    metrics: None,
                    driver: None,
                    ambiguous: true,
                });
            }
        }
    }
    outcome.identities.extend(summary_only);

    tracing::debug!(
        identities = outcome.identities.len(),
        ambiguous = outcome.warnings.len(),
        "matched driver identities"
    );

    outcome
}


#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str) -> SummaryRow {
        SummaryRow {
            driver_name: name.to_string(),
            delivered: Some(500),
            dnr_dpmo: Some(0.0),
            dcr: Some(99.0),
            pod: Some(98.0),
            cc: Some(97.0),
        }
    }

    fn metrics(name: &str, amazon_id: Option<&str>) -> MetricsRow {
        MetricsRow {
            driver_name: name.to_string(),
            amazon_id: amazon_id.map(str::to_string),
            netradyne_score: Some(4.5),
            delivered: Some(500),
        }
    }

    fn driver(id: i64, name: &str, amazon_id: Option<&str>) -> SystemDriver {
        SystemDriver {
            id,
            name: name.to_string(),
            amazon_id: amazon_id.map(str::to_string),
        }
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_name("  Jane   DOE "), "jane doe");
        assert_eq!(normalize_name("\tjane\ndoe"), "jane doe");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn resolves_by_amazon_id_before_name() {
        let registry = vec![driver(7, "Jane Doe", Some("AMZ-1001"))];
        let outcome = match_identities(&[], &[metrics("J. Doe", Some("AMZ-1001"))], &registry);

        let identity = &outcome.identities[0];
        assert_eq!(identity.driver.as_ref().map(|d| d.id), Some(7));
        assert_eq!(identity.display_name(), "Jane Doe");
        assert_eq!(identity.status(), MatchStatus::MetricsOnly);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn falls_back_to_name_when_id_unknown() {
        let registry = vec![driver(3, "Sam Park", None)];
        let outcome = match_identities(&[], &[metrics("sam  park", None)], &registry);
        assert!(outcome.identities[0].is_matched());
    }

    #[test]
    fn pairs_summary_rows_with_metrics_and_registry_names() {
        let registry = vec![driver(7, "Jane Doe", Some("AMZ-1001"))];
        let outcome = match_identities(
            &[summary("JANE DOE"), summary("Lee Kim")],
            &[metrics("Jane D.", Some("AMZ-1001")), metrics("lee kim", None)],
            &registry,
        );

        assert_eq!(outcome.identities.len(), 2);
        assert_eq!(outcome.identities[0].status(), MatchStatus::FullyMatched);
        assert_eq!(outcome.identities[1].status(), MatchStatus::Unmatched);
        assert!(outcome.identities[1].pdf_matched());
        assert!(outcome.identities[1].csv_matched());
    }

    #[test]
    fn keeps_unpaired_rows_from_both_sides() {
        let outcome = match_identities(
            &[summary("Only Summary")],
            &[metrics("Only Metrics", Some("AMZ-1"))],
            &[],
        );

        let statuses: Vec<_> = outcome.identities.iter().map(MergedIdentity::status).collect();
        assert_eq!(statuses, vec![MatchStatus::MetricsOnly, MatchStatus::SummaryOnly]);
        assert!(!outcome.identities[1].is_matched());
    }

    #[test]
    fn duplicate_summary_names_are_not_dropped() {
        let outcome = match_identities(
            &[summary("Ana Ruiz"), summary("Ana Ruiz")],
            &[metrics("Ana Ruiz", None)],
            &[],
        );
        assert_eq!(outcome.identities.len(), 2);
        assert_eq!(outcome.identities[1].status(), MatchStatus::SummaryOnly);
    }

    #[test]
    fn ambiguous_name_without_id_stays_unresolved() {
        let registry = vec![driver(1, "Chris Lee", None), driver(2, "chris lee", None)];
        let outcome = match_identities(&[], &[metrics("Chris Lee", None)], &registry);

        assert!(!outcome.identities[0].is_matched());
        assert!(outcome.identities[0].ambiguous);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(
            outcome.warnings[0],
            AmbiguousMatch::Registry {
                driver_name: "Chris Lee".to_string(),
                candidate_ids: vec![1, 2],
                resolved_to: None,
            }
        );
    }

    #[test]
    fn ambiguous_name_prefers_amazon_id() {
        let registry = vec![
            driver(1, "Chris Lee", Some("AMZ-1")),
            driver(2, "Chris Lee", Some("AMZ-2")),
        ];
        let outcome = match_identities(&[], &[metrics("Chris Lee", Some("AMZ-2"))], &registry);

        assert_eq!(outcome.identities[0].driver.as_ref().map(|d| d.id), Some(2));
        assert!(matches!(
            outcome.warnings[0],
            AmbiguousMatch::Registry {
                resolved_to: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn repeated_amazon_id_merges_into_one_identity() {
        let registry = vec![driver(7, "Jane Doe", Some("AMZ-1001"))];
        let mut repeat = metrics("J. Doe", Some(" AMZ-1001 "));
        repeat.netradyne_score = Some(3.1);
        let mut first = metrics("Jane Doe", Some("AMZ-1001"));
        first.delivered = None;

        let outcome = match_identities(&[summary("j. doe")], &[first, repeat], &registry);

        assert_eq!(outcome.identities.len(), 1);
        let identity = &outcome.identities[0];
        assert_eq!(identity.status(), MatchStatus::FullyMatched);
        let merged = identity.metrics.as_ref().unwrap();
        assert_eq!(merged.driver_name, "Jane Doe");
        assert_eq!(merged.netradyne_score, Some(4.5));
        assert_eq!(merged.delivered, Some(500));
    }

    #[test]
    fn summary_naming_two_metrics_drivers_stays_apart() {
        let outcome = match_identities(
            &[summary("Chris Lee")],
            &[
                metrics("Chris Lee", Some("AMZ-1")),
                metrics("chris  lee", Some("AMZ-2")),
            ],
            &[],
        );

        assert_eq!(outcome.identities.len(), 3);
        assert!(outcome.identities[..2]
            .iter()
            .all(|identity| identity.ambiguous && !identity.pdf_matched()));
        assert_eq!(outcome.identities[2].status(), MatchStatus::SummaryOnly);
        assert!(outcome.identities[2].ambiguous);
        assert_eq!(
            outcome.warnings,
            vec![AmbiguousMatch::SummaryName {
                driver_name: "Chris Lee".to_string(),
                candidate_amazon_ids: vec![Some("AMZ-1".to_string()), Some("AMZ-2".to_string())],
            }]
        );
    }

    #[test]
    fn blank_amazon_id_is_treated_as_missing() {
        let registry = vec![driver(4, "Someone Else", Some(""))];
        let outcome = match_identities(&[], &[metrics("Nobody", Some("  "))], &registry);
        assert!(!outcome.identities[0].is_matched());
        assert_eq!(outcome.identities[0].amazon_id(), None);
    }
}
