//! Feature derivation over a player's game-by-game history: rolling means,
//! trend slopes, Laplace-smoothed ratio metrics and career counters, one
//! `FeatureVector` per sample. Also enriches snapshot rows with the same
//! ratio columns for the population-level engines.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::{PerformanceSample, Player, StatKey};

pub const ROLLING_WINDOW: usize = 10;
pub const TREND_WINDOW: usize = 5;

/// Stats that get rolling means and trend slopes.
pub const TRACKED_STATS: [StatKey; 9] = [
    StatKey::Kicks,
    StatKey::Marks,
    StatKey::Handballs,
    StatKey::Disposals,
    StatKey::Goals,
    StatKey::Tackles,
    StatKey::Inside50s,
    StatKey::Clearances,
    StatKey::ContestedPossessions,
];

/// A derived feature column. `name`/`parse` define the stable string form
/// used by scorer artifacts ("disposals_avg_10", "goals_trend", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKey {
    Stat(StatKey),
    RollingMean(StatKey),
    Trend(StatKey),
    CareerSamples,
    SeasonsPlayed,
    Age,
}

impl FeatureKey {
    pub fn name(self) -> String {
        match self {
            FeatureKey::Stat(k) => k.as_str().to_string(),
            FeatureKey::RollingMean(k) => format!("{}_avg_{ROLLING_WINDOW}", k.as_str()),
            FeatureKey::Trend(k) => format!("{}_trend", k.as_str()),
            FeatureKey::CareerSamples => "career_samples".to_string(),
            FeatureKey::SeasonsPlayed => "seasons_played".to_string(),
            FeatureKey::Age => "age".to_string(),
        }
    }

    pub fn parse(raw: &str) -> Option<FeatureKey> {
        match raw {
            "career_samples" => return Some(FeatureKey::CareerSamples),
            "seasons_played" => return Some(FeatureKey::SeasonsPlayed),
            "age" => return Some(FeatureKey::Age),
            _ => {}
        }
        if let Some(base) = raw.strip_suffix("_trend") {
            return StatKey::parse(base).map(FeatureKey::Trend);
        }
        let rolling_suffix = format!("_avg_{ROLLING_WINDOW}");
        if let Some(base) = raw.strip_suffix(rolling_suffix.as_str()) {
            return StatKey::parse(base).map(FeatureKey::RollingMean);
        }
        StatKey::parse(raw).map(FeatureKey::Stat)
    }
}

/// One sample's derived values, keyed by `FeatureKey`. Missing features read
/// as absent; scorers decide their own default.
#[derive(Debug, Clone, Default)]
pub struct FeatureVector {
    values: HashMap<FeatureKey, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: FeatureKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn get_or_zero(&self, key: FeatureKey) -> f64 {
        self.values.get(&key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: FeatureKey, value: f64) {
        self.values.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// JSON-representable view with deterministic key order.
    pub fn named(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.values {
            out.insert(key.name(), *value);
        }
        out
    }

    /// Multiplies every trend feature in place, leaving rolling means and
    /// raw counters untouched. Projection's age scaling applies through this.
    pub fn scale_trends(&mut self, factor: f64) {
        for (key, value) in self.values.iter_mut() {
            if matches!(key, FeatureKey::Trend(_)) {
                *value *= factor;
            }
        }
    }
}

/// Games played per season, ascending by year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonLoad {
    pub year: i32,
    pub samples: u32,
}

/// Per-sample feature rows plus season sample counts for the same span.
#[derive(Debug, Clone, Default)]
pub struct FeatureHistory {
    pub rows: Vec<FeatureVector>,
    pub seasons: Vec<SeasonLoad>,
}

impl FeatureHistory {
    pub fn latest(&self) -> Option<&FeatureVector> {
        self.rows.last()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Derives one `FeatureVector` per sample, time-ordered by (year, round).
/// Missing or non-finite raw values read as 0; short histories yield trend 0.
pub fn derive_features(samples: &[PerformanceSample]) -> FeatureHistory {
    let mut ordered: Vec<&PerformanceSample> = samples.iter().collect();
    ordered.sort_by_key(|s| (s.year, s.round));

    let mut rows = Vec::with_capacity(ordered.len());
    let mut seasons: Vec<SeasonLoad> = Vec::new();

    for (idx, sample) in ordered.iter().enumerate() {
        match seasons.iter_mut().find(|s| s.year == sample.year) {
            Some(load) => load.samples += 1,
            None => seasons.push(SeasonLoad { year: sample.year, samples: 1 }),
        }

        let mut fv = FeatureVector::new();
        fv.set(FeatureKey::CareerSamples, (idx + 1) as f64);
        fv.set(FeatureKey::SeasonsPlayed, seasons.len() as f64);

        for (&key, &value) in &sample.stats {
            fv.set(FeatureKey::Stat(key), if value.is_finite() { value } else { 0.0 });
        }

        for stat in TRACKED_STATS {
            let mean_from = idx + 1 - ROLLING_WINDOW.min(idx + 1);
            let window = &ordered[mean_from..=idx];
            let mean = window.iter().map(|s| s.stat_or_zero(stat)).sum::<f64>() / window.len() as f64;
            fv.set(FeatureKey::RollingMean(stat), mean);

            let trend_from = idx + 1 - TREND_WINDOW.min(idx + 1);
            let series: Vec<f64> = ordered[trend_from..=idx]
                .iter()
                .map(|s| s.stat_or_zero(stat))
                .collect();
            fv.set(FeatureKey::Trend(stat), slope(&series));
        }

        set_ratio_features(&mut fv, sample, idx + 1);
        rows.push(fv);
    }

    FeatureHistory { rows, seasons }
}

/// Batch derivation across a roster.
pub fn derive_features_batch(players: &[Player]) -> Vec<FeatureHistory> {
    players
        .par_iter()
        .map(|p| derive_features(&p.history))
        .collect()
}

/// Copies of the rows with the ratio columns added to the snapshot stats.
/// A ratio is only computed when every input column is present on the row,
/// and values supplied by ingestion are left as they are.
pub fn with_derived_metrics(rows: &[Player]) -> Vec<Player> {
    rows.iter()
        .map(|p| {
            let mut out = p.clone();
            enrich_snapshot(&mut out.stats);
            out
        })
        .collect()
}

/// Snapshot stat row as a feature vector, for the engines that consume
/// `FeatureVector` populations (clustering, ad-hoc scoring).
pub fn snapshot_features(player: &Player) -> FeatureVector {
    let mut fv = FeatureVector::new();
    for (&key, &value) in &player.stats {
        fv.set(FeatureKey::Stat(key), finite(value));
    }
    fv
}

fn enrich_snapshot(stats: &mut HashMap<StatKey, f64>) {
    let total_disposals = match (stats.get(&StatKey::Kicks), stats.get(&StatKey::Handballs)) {
        (Some(k), Some(h)) => Some(finite(*k) + finite(*h)),
        _ => None,
    };

    if let Some(total) = total_disposals {
        if let Some(&marks) = stats.get(&StatKey::Marks)
            && !stats.contains_key(&StatKey::MarkDisposalRatio)
        {
            stats.insert(StatKey::MarkDisposalRatio, finite(marks) / (total + 1.0));
        }
        if let Some(&contested) = stats.get(&StatKey::ContestedPossessions)
            && !stats.contains_key(&StatKey::ContestedRate)
        {
            stats.insert(StatKey::ContestedRate, finite(contested) / (total + 1.0));
        }
    }

    if let (Some(&goals), Some(&behinds)) = (stats.get(&StatKey::Goals), stats.get(&StatKey::Behinds))
        && !stats.contains_key(&StatKey::GoalAccuracy)
    {
        let goals = finite(goals);
        stats.insert(StatKey::GoalAccuracy, goals / (goals + finite(behinds) + 1.0));
    }

    if let (Some(&tackles), Some(&contested)) =
        (stats.get(&StatKey::Tackles), stats.get(&StatKey::ContestedPossessions))
        && !stats.contains_key(&StatKey::TackleEfficiency)
    {
        stats.insert(StatKey::TackleEfficiency, finite(tackles) / (finite(contested) + 1.0));
    }
}

fn set_ratio_features(fv: &mut FeatureVector, sample: &PerformanceSample, career_samples: usize) {
    let disposals = sample.stat_or_zero(StatKey::Disposals);
    let clangers = sample.stat_or_zero(StatKey::Clangers);
    let goals = sample.stat_or_zero(StatKey::Goals);
    let behinds = sample.stat_or_zero(StatKey::Behinds);
    let marks = sample.stat_or_zero(StatKey::Marks);
    let contested = sample.stat_or_zero(StatKey::ContestedPossessions);
    let tackles = sample.stat_or_zero(StatKey::Tackles);
    let votes = sample.stat_or_zero(StatKey::BrownlowVotes);
    let total_disposals = sample.stat_or_zero(StatKey::Kicks) + sample.stat_or_zero(StatKey::Handballs);

    fv.set(
        FeatureKey::Stat(StatKey::DisposalEfficiency),
        (disposals - clangers) / (disposals + 1.0),
    );
    fv.set(FeatureKey::Stat(StatKey::GoalAccuracy), goals / (goals + behinds + 1.0));
    fv.set(FeatureKey::Stat(StatKey::ContestedRate), contested / (total_disposals + 1.0));
    fv.set(FeatureKey::Stat(StatKey::MarkDisposalRatio), marks / (total_disposals + 1.0));
    fv.set(FeatureKey::Stat(StatKey::TackleEfficiency), tackles / (contested + 1.0));
    fv.set(
        FeatureKey::Stat(StatKey::VoteRate),
        votes / (career_samples as f64 + 1.0),
    );
}

fn finite(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Least-squares slope of a short series against its 0-based index;
/// 0 when fewer than 2 points exist.
fn slope(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = series.iter().sum::<f64>() / nf;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in series.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den <= 0.0 { 0.0 } else { num / den }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(year: i32, round: u16, pairs: &[(StatKey, f64)]) -> PerformanceSample {
        PerformanceSample {
            year,
            round,
            stats: pairs.iter().copied().collect(),
        }
    }

    fn disposal_series(values: &[f64]) -> Vec<PerformanceSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| sample(2024, i as u16 + 1, &[(StatKey::Disposals, v)]))
            .collect()
    }

    #[test]
    fn rolling_mean_is_plain_mean_until_window_fills() {
        let values: Vec<f64> = (1..=12).map(f64::from).collect();
        let history = derive_features(&disposal_series(&values));

        let fifth = &history.rows[4];
        assert!((fifth.get_or_zero(FeatureKey::RollingMean(StatKey::Disposals)) - 3.0).abs() < 1e-12);

        // Trailing window of 10 once past the fill.
        let last = &history.rows[11];
        let expected = (3..=12).map(f64::from).sum::<f64>() / 10.0;
        assert!((last.get_or_zero(FeatureKey::RollingMean(StatKey::Disposals)) - expected).abs() < 1e-12);
    }

    #[test]
    fn trend_is_zero_then_tracks_the_slope() {
        let history = derive_features(&disposal_series(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0]));
        assert_eq!(history.rows[0].get_or_zero(FeatureKey::Trend(StatKey::Disposals)), 0.0);
        for fv in &history.rows[1..] {
            assert!((fv.get_or_zero(FeatureKey::Trend(StatKey::Disposals)) - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn career_and_season_counters() {
        let samples = vec![
            sample(2023, 1, &[]),
            sample(2023, 2, &[]),
            sample(2024, 1, &[]),
        ];
        let history = derive_features(&samples);
        let last = history.latest().unwrap();
        assert_eq!(last.get_or_zero(FeatureKey::CareerSamples), 3.0);
        assert_eq!(last.get_or_zero(FeatureKey::SeasonsPlayed), 2.0);
        assert_eq!(
            history.seasons,
            vec![SeasonLoad { year: 2023, samples: 2 }, SeasonLoad { year: 2024, samples: 1 }]
        );
    }

    #[test]
    fn samples_are_ordered_by_year_then_round() {
        let shuffled = vec![
            sample(2024, 2, &[(StatKey::Disposals, 30.0)]),
            sample(2023, 5, &[(StatKey::Disposals, 10.0)]),
            sample(2024, 1, &[(StatKey::Disposals, 20.0)]),
        ];
        let history = derive_features(&shuffled);
        let first = &history.rows[0];
        assert_eq!(first.get_or_zero(FeatureKey::Stat(StatKey::Disposals)), 10.0);
        assert_eq!(
            history.latest().unwrap().get_or_zero(FeatureKey::Stat(StatKey::Disposals)),
            30.0
        );
    }

    #[test]
    fn ratio_features_use_laplace_denominators() {
        let samples = vec![sample(
            2024,
            1,
            &[
                (StatKey::Disposals, 24.0),
                (StatKey::Clangers, 4.0),
                (StatKey::Goals, 3.0),
                (StatKey::Behinds, 2.0),
                (StatKey::Marks, 6.0),
                (StatKey::Kicks, 14.0),
                (StatKey::Handballs, 10.0),
                (StatKey::ContestedPossessions, 10.0),
                (StatKey::Tackles, 5.0),
                (StatKey::BrownlowVotes, 3.0),
            ],
        )];
        let fv = derive_features(&samples).rows.remove(0);
        assert!((fv.get_or_zero(FeatureKey::Stat(StatKey::DisposalEfficiency)) - 20.0 / 25.0).abs() < 1e-12);
        assert!((fv.get_or_zero(FeatureKey::Stat(StatKey::GoalAccuracy)) - 0.5).abs() < 1e-12);
        assert!((fv.get_or_zero(FeatureKey::Stat(StatKey::ContestedRate)) - 0.4).abs() < 1e-12);
        assert!((fv.get_or_zero(FeatureKey::Stat(StatKey::MarkDisposalRatio)) - 0.24).abs() < 1e-12);
        assert!((fv.get_or_zero(FeatureKey::Stat(StatKey::TackleEfficiency)) - 5.0 / 11.0).abs() < 1e-12);
        assert!((fv.get_or_zero(FeatureKey::Stat(StatKey::VoteRate)) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn empty_history_derives_nothing() {
        let history = derive_features(&[]);
        assert!(history.is_empty());
        assert!(history.seasons.is_empty());
    }

    #[test]
    fn batch_matches_single_derivation() {
        let players: Vec<Player> = (0..4)
            .map(|i| Player {
                id: i,
                name: format!("P{i}"),
                team: "Carlton".into(),
                position: "Midfielder".into(),
                age: Some(24.0),
                stats: HashMap::new(),
                history: disposal_series(&[10.0 + f64::from(i), 12.0, 14.0]),
            })
            .collect();
        let batch = derive_features_batch(&players);
        for (p, got) in players.iter().zip(&batch) {
            let single = derive_features(&p.history);
            assert_eq!(single.rows.len(), got.rows.len());
            for (a, b) in single.rows.iter().zip(&got.rows) {
                assert_eq!(a.named(), b.named());
            }
        }
    }

    #[test]
    fn feature_names_round_trip() {
        for key in [
            FeatureKey::Stat(StatKey::Disposals),
            FeatureKey::RollingMean(StatKey::Inside50s),
            FeatureKey::Trend(StatKey::ContestedPossessions),
            FeatureKey::CareerSamples,
            FeatureKey::SeasonsPlayed,
            FeatureKey::Age,
        ] {
            assert_eq!(FeatureKey::parse(&key.name()), Some(key));
        }
        assert_eq!(FeatureKey::parse("no_such_column"), None);
    }

    #[test]
    fn scale_trends_leaves_other_features_alone() {
        let mut fv = FeatureVector::new();
        fv.set(FeatureKey::Trend(StatKey::Goals), 2.0);
        fv.set(FeatureKey::RollingMean(StatKey::Goals), 2.0);
        fv.set(FeatureKey::Stat(StatKey::Goals), 2.0);
        fv.scale_trends(1.05);
        assert!((fv.get_or_zero(FeatureKey::Trend(StatKey::Goals)) - 2.1).abs() < 1e-12);
        assert_eq!(fv.get_or_zero(FeatureKey::RollingMean(StatKey::Goals)), 2.0);
        assert_eq!(fv.get_or_zero(FeatureKey::Stat(StatKey::Goals)), 2.0);
    }

    #[test]
    fn snapshot_enrichment_respects_existing_columns() {
        let base = Player {
            id: 1,
            name: "A".into(),
            team: "Carlton".into(),
            position: "Forward".into(),
            age: Some(23.0),
            stats: [
                (StatKey::Kicks, 10.0),
                (StatKey::Handballs, 9.0),
                (StatKey::Marks, 4.0),
                (StatKey::Goals, 2.0),
                (StatKey::Behinds, 1.0),
                (StatKey::GoalAccuracy, 0.9),
            ]
            .into(),
            history: Vec::new(),
        };
        let enriched = with_derived_metrics(std::slice::from_ref(&base));
        let stats = &enriched[0].stats;
        // Ingested value wins.
        assert_eq!(stats[&StatKey::GoalAccuracy], 0.9);
        assert!((stats[&StatKey::MarkDisposalRatio] - 0.2).abs() < 1e-12);
        // No contested possessions on the row, so no contested-rate column.
        assert!(!stats.contains_key(&StatKey::ContestedRate));
        assert!(!stats.contains_key(&StatKey::TackleEfficiency));
        // Input row untouched.
        assert!(!base.stats.contains_key(&StatKey::MarkDisposalRatio));
    }
}
