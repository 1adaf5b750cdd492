//! Executes a `FilterSpec` over tabular player rows. Steps run in a fixed
//! order, each over the subset the previous steps retained, so quantile
//! thresholds always reflect the population present at the point of
//! application. Input rows are never mutated.

use tracing::debug;

use crate::dataset::{Player, StatKey};
use crate::query_extract::FilterSpec;
use crate::vocab::{self, Bucket, Position};

/// Returns the retained rows in their original order unless `sort_by` is
/// set. Referenced columns nobody carries make that step a no-op; a
/// non-positive limit means no truncation.
pub fn apply_filter<'a>(rows: &'a [Player], spec: &FilterSpec) -> Vec<&'a Player> {
    let mut kept: Vec<&Player> = rows.iter().collect();

    if !spec.positions.is_empty() {
        kept.retain(|p| {
            spec.positions
                .iter()
                .any(|pos| p.position.eq_ignore_ascii_case(pos.as_str()))
        });
    }

    if !spec.teams.is_empty() {
        kept.retain(|p| {
            let team = p.team.to_lowercase();
            spec.teams
                .iter()
                .any(|club| vocab::any_alias_in(&team, vocab::club_aliases(*club)))
        });
    }

    if !spec.age_range.is_unbounded() {
        // Rows without an age fail whichever bounds are set.
        kept.retain(|p| p.age.is_some_and(|age| spec.age_range.contains(age)));
    }

    for (&stat, &bucket) in &spec.comparisons {
        let values: Vec<f64> = kept
            .iter()
            .filter_map(|p| p.stat(stat).filter(|v| v.is_finite()))
            .collect();
        if values.is_empty() {
            debug!(stat = stat.as_str(), "comparison column absent, skipped");
            continue;
        }
        match bucket {
            Bucket::High => {
                let p75 = percentile(&values, 0.75);
                kept.retain(|p| p.stat(stat).is_some_and(|v| v >= p75));
            }
            Bucket::Low => {
                let p25 = percentile(&values, 0.25);
                kept.retain(|p| p.stat(stat).is_some_and(|v| v <= p25));
            }
            Bucket::Medium => {
                let p25 = percentile(&values, 0.25);
                let p75 = percentile(&values, 0.75);
                kept.retain(|p| p.stat(stat).is_some_and(|v| v >= p25 && v <= p75));
            }
        }
    }

    if let Some(sort_stat) = spec.sort_by
        && kept.iter().any(|p| p.stat(sort_stat).is_some())
    {
        sort_desc_by_stat(&mut kept, sort_stat);
    }

    if let Some(limit) = spec.limit
        && limit > 0
    {
        kept.truncate(limit as usize);
    }

    debug!(kept = kept.len(), total = rows.len(), "applied filter spec");
    kept
}

/// Position-scoped leaderboard: optional position filter, stable descending
/// sort on the metric, cut to the top N.
pub fn rank_players<'a>(
    rows: &'a [Player],
    position: Option<Position>,
    metric: StatKey,
    top_n: usize,
) -> Vec<&'a Player> {
    let mut kept: Vec<&Player> = rows
        .iter()
        .filter(|p| position.is_none_or(|pos| p.position.eq_ignore_ascii_case(pos.as_str())))
        .collect();
    if kept.iter().any(|p| p.stat(metric).is_some()) {
        sort_desc_by_stat(&mut kept, metric);
    }
    kept.truncate(top_n);
    kept
}

fn sort_desc_by_stat(rows: &mut [&Player], stat: StatKey) {
    // Stable sort; rows missing the column go last.
    rows.sort_by(|a, b| {
        let av = a.stat(stat).unwrap_or(f64::NEG_INFINITY);
        let bv = b.stat(stat).unwrap_or(f64::NEG_INFINITY);
        bv.total_cmp(&av)
    });
}

/// Linear-interpolated percentile, matching the tabular tooling upstream.
/// Callers guarantee a non-empty, finite input.
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
