use std::cmp::Ordering;
use std::fmt;

use crate::models::DriverKpi;
use crate::scoring::display_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandingTier {
    Fantastic,
    Great,
    Fair,
    Poor,
}

impl StandingTier {
    pub fn from_score(average: f64) -> Self {
        match average {
            avg if avg >= 4.0 => StandingTier::Fantastic,
            avg if avg >= 3.0 => StandingTier::Great,
            avg if avg >= 2.0 => StandingTier::Fair,
            _ => StandingTier::Poor,
        }
    }
}

impl fmt::Display for StandingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StandingTier::Fantastic => "Fantastic",
            StandingTier::Great => "Great",
            StandingTier::Fair => "Fair",
            StandingTier::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// Higher score first, then more deliveries.
fn performance_order(a: &DriverKpi, b: &DriverKpi) -> Ordering {
    b.overall_score
        .total_cmp(&a.overall_score)
        .then_with(|| b.delivered.cmp(&a.delivered))
}

fn display_order(a: &DriverKpi, b: &DriverKpi) -> Ordering {
    match (a.rank, b.rank) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => performance_order(a, b),
    }
    .then_with(|| a.driver_name.cmp(&b.driver_name))
}

/// Assigns competition ranks ("1, 2, 2, 4") to drivers meeting the delivery
/// minimum and sorts the collection: ranked drivers first, then the rest.
pub fn assign_ranks(kpis: &mut [DriverKpi], min_delivered: i64) {
    for kpi in kpis.iter_mut() {
        kpi.rank = None;
    }

    let mut eligible: Vec<usize> = (0..kpis.len())
        .filter(|&idx| kpis[idx].delivered >= min_delivered)
        .collect();
    eligible.sort_by(|&a, &b| performance_order(&kpis[a], &kpis[b]));

    let mut previous: Option<(usize, u32)> = None;
    for (position, &idx) in eligible.iter().enumerate() {
        let rank = match previous {
            Some((prev, prev_rank))
                if performance_order(&kpis[prev], &kpis[idx]) == Ordering::Equal =>
            {
                prev_rank
            }
            _ => position as u32 + 1,
        };
        kpis[idx].rank = Some(rank);
        previous = Some((idx, rank));
    }

    kpis.sort_by(display_order);
}

/// Cohort label derived from drivers that already carry a rank.
pub fn overall_standing(kpis: &[DriverKpi]) -> String {
    let ranked: Vec<&DriverKpi> = kpis.iter().filter(|kpi| kpi.rank.is_some()).collect();
    if ranked.is_empty() {
        return format!("No ranked drivers (0 of {} met the delivery minimum)", kpis.len());
    }

    let average = ranked.iter().map(|kpi| kpi.overall_score).sum::<f64>() / ranked.len() as f64;
    let leaders: Vec<&DriverKpi> = ranked
        .iter()
        .copied()
        .filter(|kpi| kpi.rank == Some(1))
        .collect();
    let leader_names = leaders
        .iter()
        .map(|kpi| kpi.driver_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let leader_score = leaders.first().map_or(0.0, |kpi| kpi.overall_score);

    format!(
        "{} ({:.2}) - {} of {} drivers ranked, top: {} ({:.2})",
        StandingTier::from_score(average),
        display_score(average),
        ranked.len(),
        kpis.len(),
        leader_names,
        display_score(leader_score)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kpi(name: &str, score: f64, delivered: i64) -> DriverKpi {
        DriverKpi {
            driver_name: name.to_string(),
            amazon_id: None,
            overall_score: score,
            delivered,
            netradyne_score: None,
            dnr_dpmo: None,
            dcr: None,
            pod: None,
            cc: None,
            rank: None,
            is_matched: true,
            pdf_matched: true,
            csv_matched: true,
            ambiguous_match: false,
        }
    }

    fn ranks(kpis: &[DriverKpi]) -> Vec<(&str, Option<u32>)> {
        kpis.iter()
            .map(|kpi| (kpi.driver_name.as_str(), kpi.rank))
            .collect()
    }

    #[test]
    fn orders_by_score_then_delivered() {
        let mut kpis = vec![
            kpi("a", 3.0, 500),
            kpi("b", 4.0, 500),
            kpi("c", 3.0, 600),
        ];
        assign_ranks(&mut kpis, 0);
        assert_eq!(ranks(&kpis), vec![("b", Some(1)), ("c", Some(2)), ("a", Some(3))]);
    }

    #[test]
    fn full_ties_share_competition_rank() {
        let mut kpis = vec![
            kpi("d", 2.0, 500),
            kpi("b", 4.0, 500),
            kpi("a", 4.0, 500),
            kpi("c", 3.0, 500),
        ];
        assign_ranks(&mut kpis, 0);
        assert_eq!(
            ranks(&kpis),
            vec![("a", Some(1)), ("b", Some(1)), ("c", Some(3)), ("d", Some(4))]
        );
    }

    #[test]
    fn drivers_below_minimum_are_unranked_and_listed_last() {
        let mut kpis = vec![kpi("low", 4.9, 100), kpi("ok", 2.0, 430)];
        assign_ranks(&mut kpis, 430);
        assert_eq!(ranks(&kpis), vec![("ok", Some(1)), ("low", None)]);
    }

    #[test]
    fn rerank_clears_previous_ranks() {
        let mut kpis = vec![kpi("a", 4.0, 200)];
        kpis[0].rank = Some(9);
        assign_ranks(&mut kpis, 300);
        assert_eq!(kpis[0].rank, None);
    }

    #[test]
    fn standing_summarizes_ranked_cohort() {
        let mut kpis = vec![
            kpi("Jane Doe", 4.5, 500),
            kpi("Sam Park", 3.5, 480),
            kpi("New Hire", 1.0, 20),
        ];
        assign_ranks(&mut kpis, 430);
        assert_eq!(
            overall_standing(&kpis),
            "Fantastic (4.00) - 2 of 3 drivers ranked, top: Jane Doe (4.50)"
        );
    }

    #[test]
    fn standing_without_ranked_drivers() {
        let mut kpis = vec![kpi("a", 4.0, 10)];
        assign_ranks(&mut kpis, 430);
        assert_eq!(
            overall_standing(&kpis),
            "No ranked drivers (0 of 1 met the delivery minimum)"
        );
    }

    #[test]
    fn tiers_follow_average_score() {
        assert_eq!(StandingTier::from_score(4.2), StandingTier::Fantastic);
        assert_eq!(StandingTier::from_score(3.0), StandingTier::Great);
        assert_eq!(StandingTier::from_score(2.5), StandingTier::Fair);
        assert_eq!(StandingTier::from_score(0.3), StandingTier::Poor);
    }
}
