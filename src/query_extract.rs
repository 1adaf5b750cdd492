//! Lexical query extraction: free scouting text in, structured `FilterSpec`
//! plus intent and confidence out. Matching is lowercase substring
//! containment against the `vocab` tables; extraction is total and never
//! fails, a signal-free query just comes back empty with confidence 0.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::StatKey;
use crate::vocab::{self, Bucket, Club, League, Position, QueryIntent};

/// Max character distance between a comparison word and the stat it binds to.
pub const DEFAULT_COMPARISON_WINDOW: usize = 50;
/// "young ..." with no explicit number caps the age range here.
pub const YOUNG_DEFAULT_MAX_AGE: u8 = 23;
/// "experienced ..." with no explicit number floors the age range here.
pub const EXPERIENCED_DEFAULT_MIN_AGE: u8 = 28;
/// Superlative query with no explicit count keeps this many rows.
pub const DEFAULT_SUPERLATIVE_LIMIT: i64 = 10;

const W_POSITIONS: f64 = 0.20;
const W_TEAMS: f64 = 0.15;
const W_LEAGUES: f64 = 0.10;
const W_STATS: f64 = 0.30;
const W_AGE_RANGE: f64 = 0.10;
const W_COMPARISONS: f64 = 0.10;
const W_SORT_BY: f64 = 0.05;

/// Inclusive age bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: Option<u8>,
    pub max: Option<u8>,
}

impl AgeRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, age: f64) -> bool {
        if let Some(min) = self.min
            && age < f64::from(min)
        {
            return false;
        }
        if let Some(max) = self.max
            && age > f64::from(max)
        {
            return false;
        }
        true
    }
}

/// Structured query: what to keep, how to compare, how to order and cut.
/// Every field defaults to empty/absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub positions: BTreeSet<Position>,
    #[serde(default)]
    pub teams: BTreeSet<Club>,
    #[serde(default)]
    pub leagues: BTreeSet<League>,
    #[serde(default)]
    pub stats: BTreeSet<StatKey>,
    #[serde(default)]
    pub age_range: AgeRange,
    #[serde(default)]
    pub comparisons: BTreeMap<StatKey, Bucket>,
    #[serde(default)]
    pub sort_by: Option<StatKey>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
            && self.teams.is_empty()
            && self.leagues.is_empty()
            && self.stats.is_empty()
            && self.age_range.is_unbounded()
            && self.comparisons.is_empty()
            && self.sort_by.is_none()
            && self.limit.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedQuery {
    pub original_query: String,
    pub intent: QueryIntent,
    pub spec: FilterSpec,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractorConfig {
    pub comparison_window: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            comparison_window: DEFAULT_COMPARISON_WINDOW,
        }
    }
}

impl ExtractorConfig {
    pub fn with_comparison_window(window: usize) -> Self {
        Self {
            comparison_window: window,
        }
    }
}

/// Stateless; construct once and share by reference across queries.
#[derive(Debug, Clone, Default)]
pub struct QueryExtractor {
    cfg: ExtractorConfig,
}

impl QueryExtractor {
    pub fn new(cfg: ExtractorConfig) -> Self {
        Self { cfg }
    }

    pub fn extract(&self, query: &str) -> ExtractedQuery {
        let lowered = query.to_lowercase();
        debug!(query = %lowered, "processing scouting query");

        let mut spec = FilterSpec::default();
        for (position, aliases) in vocab::POSITION_SYNONYMS {
            if vocab::any_alias_in(&lowered, aliases) {
                spec.positions.insert(position);
            }
        }
        for (club, aliases) in vocab::CLUB_SYNONYMS {
            if vocab::any_alias_in(&lowered, aliases) {
                spec.teams.insert(club);
            }
        }
        for (league, aliases) in vocab::LEAGUE_SYNONYMS {
            if vocab::any_alias_in(&lowered, aliases) {
                spec.leagues.insert(league);
            }
        }
        for (stat, aliases) in vocab::STAT_SYNONYMS {
            if vocab::any_alias_in(&lowered, aliases) {
                spec.stats.insert(stat);
            }
        }
        spec.age_range = extract_age_range(&lowered);
        spec.comparisons = extract_comparisons(&lowered, self.cfg.comparison_window);
        spec.sort_by = extract_sort_stat(&lowered);
        spec.limit = extract_limit(&lowered);

        let intent = classify_intent(&lowered);
        let confidence = confidence_for(&spec);
        debug!(?intent, confidence, "extracted filter spec");

        ExtractedQuery {
            original_query: query.to_string(),
            intent,
            spec,
            confidence,
        }
    }
}

/// Scan 1-2 digit runs; the text right before each run decides which bound
/// it fills ("under"/"below" → max, "over"/"above" → min, bare numbers fill
/// min then max). Longer runs are years or ids, not ages. Afterwards, the
/// young/experienced word defaults fill whichever side is still open.
fn extract_age_range(lowered: &str) -> AgeRange {
    let bytes = lowered.as_bytes();
    let mut out = AgeRange::default();

    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let run = &lowered[start..i];
        if run.len() > 2 {
            continue;
        }
        let Ok(age) = run.parse::<u8>() else { continue };

        let mut before = start;
        while before > 0 && bytes[before - 1].is_ascii_whitespace() {
            before -= 1;
        }
        let prefix = &lowered[..before];
        if vocab::AGE_MAX_PREFIXES.iter().any(|p| prefix.ends_with(p)) {
            out.max = Some(age);
        } else if vocab::AGE_MIN_PREFIXES.iter().any(|p| prefix.ends_with(p)) {
            out.min = Some(age);
        } else if out.min.is_none() {
            out.min = Some(age);
        } else if out.max.is_none() {
            out.max = Some(age);
        }
    }

    if vocab::YOUNG_WORDS.iter().any(|w| lowered.contains(w)) && out.max.is_none() {
        out.max = Some(YOUNG_DEFAULT_MAX_AGE);
    }
    if vocab::EXPERIENCED_WORDS.iter().any(|w| lowered.contains(w)) && out.min.is_none() {
        out.min = Some(EXPERIENCED_DEFAULT_MIN_AGE);
    }
    out
}

/// Bind comparison words to stats by first-occurrence proximity. Families
/// run in table order and later matches overwrite, so when two families sit
/// near the same stat the later family wins.
fn extract_comparisons(lowered: &str, window: usize) -> BTreeMap<StatKey, Bucket> {
    let mut out = BTreeMap::new();
    for (stat, aliases) in vocab::STAT_SYNONYMS {
        for alias in aliases {
            let Some(stat_at) = lowered.find(alias) else {
                continue;
            };
            for (bucket, words) in vocab::COMPARISON_SYNONYMS {
                for word in words {
                    let Some(word_at) = lowered.find(word) else {
                        continue;
                    };
                    if stat_at.abs_diff(word_at) < window {
                        out.insert(stat, bucket);
                        break;
                    }
                }
            }
        }
    }
    out
}

/// First stat in table order with an alias present, but only when the query
/// carries a superlative.
fn extract_sort_stat(lowered: &str) -> Option<StatKey> {
    if !vocab::SUPERLATIVE_WORDS.iter().any(|w| lowered.contains(w)) {
        return None;
    }
    for (stat, aliases) in vocab::STAT_SYNONYMS {
        if vocab::any_alias_in(lowered, aliases) {
            return Some(stat);
        }
    }
    None
}

/// "top/best/first N" takes the leftmost explicit count; a superlative with
/// no number falls back to the default of 10.
fn extract_limit(lowered: &str) -> Option<i64> {
    let mut leftmost: Option<(usize, i64)> = None;
    for word in vocab::LIMIT_PREFIX_WORDS {
        for (at, _) in lowered.match_indices(word) {
            let after = lowered[at + word.len()..].trim_start();
            let digits_len = after.bytes().take_while(|b| b.is_ascii_digit()).count();
            if digits_len == 0 {
                continue;
            }
            let Ok(n) = after[..digits_len].parse::<i64>() else {
                continue;
            };
            if leftmost.is_none_or(|(best_at, _)| at < best_at) {
                leftmost = Some((at, n));
            }
        }
    }
    if let Some((_, n)) = leftmost {
        return Some(n);
    }
    if vocab::LIMIT_DEFAULT_WORDS.iter().any(|w| lowered.contains(w)) {
        return Some(DEFAULT_SUPERLATIVE_LIMIT);
    }
    None
}

fn classify_intent(lowered: &str) -> QueryIntent {
    for (intent, words) in vocab::INTENT_SYNONYMS {
        if words.iter().any(|w| lowered.contains(w)) {
            return intent;
        }
    }
    QueryIntent::Search
}

fn confidence_for(spec: &FilterSpec) -> f64 {
    let categories = [
        (W_POSITIONS, !spec.positions.is_empty()),
        (W_TEAMS, !spec.teams.is_empty()),
        (W_LEAGUES, !spec.leagues.is_empty()),
        (W_STATS, !spec.stats.is_empty()),
        (W_AGE_RANGE, !spec.age_range.is_unbounded()),
        (W_COMPARISONS, !spec.comparisons.is_empty()),
        (W_SORT_BY, spec.sort_by.is_some()),
    ];
    let mut confidence = 0.0;
    let mut total = 0.0;
    for (weight, hit) in categories {
        total += weight;
        if hit {
            confidence += weight;
        }
    }
    (confidence / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(query: &str) -> ExtractedQuery {
        QueryExtractor::default().extract(query)
    }

    #[test]
    fn midfielders_under_23_with_high_disposals() {
        let out = extract("Find midfielders under 23 with high disposal counts");
        assert_eq!(out.intent, QueryIntent::Search);
        assert!(out.spec.positions.contains(&Position::Midfielder));
        assert_eq!(out.spec.age_range, AgeRange { min: None, max: Some(23) });
        assert!(out.spec.stats.contains(&StatKey::Disposals));
        assert_eq!(out.spec.comparisons.get(&StatKey::Disposals), Some(&Bucket::High));
        assert!(out.confidence > 0.0);
        // positions + stats + age + comparisons
        assert!((out.confidence - 0.70).abs() < 1e-9);
    }

    #[test]
    fn empty_query_yields_empty_spec() {
        let out = extract("");
        assert!(out.spec.is_empty());
        assert_eq!(out.intent, QueryIntent::Search);
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn age_prefixes_pick_the_bound() {
        assert_eq!(extract("players over 30").spec.age_range, AgeRange { min: Some(30), max: None });
        assert_eq!(extract("players below 21").spec.age_range, AgeRange { min: None, max: Some(21) });
        // Bare numbers fill min first, then max.
        assert_eq!(extract("aged 22 to 26").spec.age_range, AgeRange { min: Some(22), max: Some(26) });
    }

    #[test]
    fn young_and_experienced_defaults_only_fill_open_bounds() {
        assert_eq!(extract("young talls").spec.age_range.max, Some(23));
        assert_eq!(extract("veteran leaders").spec.age_range.min, Some(28));
        // Explicit number wins over the default.
        assert_eq!(extract("young players under 20").spec.age_range.max, Some(20));
    }

    #[test]
    fn four_digit_runs_are_not_ages() {
        let out = extract("form since 2023");
        assert!(out.spec.age_range.is_unbounded());
    }

    #[test]
    fn comparison_needs_proximity() {
        let near = extract("high tackle numbers");
        assert_eq!(near.spec.comparisons.get(&StatKey::Tackles), Some(&Bucket::High));

        let far = extract(format!("high pressure ratings {} and also tackle counts", "x".repeat(60)).as_str());
        // "tackle" sits beyond the window from "high", but "pressure" is a
        // tackles alias right next to it, so attribution still lands.
        assert_eq!(far.spec.comparisons.get(&StatKey::Tackles), Some(&Bucket::High));

        let none = extract(format!("high intensity {} then tackle counts", "x".repeat(60)).as_str());
        assert_eq!(none.spec.comparisons.get(&StatKey::Tackles), None);
    }

    #[test]
    fn later_comparison_family_overwrites_earlier() {
        let out = extract("good average disposals");
        assert_eq!(out.spec.comparisons.get(&StatKey::Disposals), Some(&Bucket::Medium));
    }

    #[test]
    fn sort_uses_stat_table_order() {
        let out = extract("most goals and marks");
        // Marks precedes goals in the stat table regardless of query order.
        assert_eq!(out.spec.sort_by, Some(StatKey::Marks));
        assert_eq!(out.spec.limit, None);
    }

    #[test]
    fn limit_explicit_and_default() {
        assert_eq!(extract("top 5 forwards").spec.limit, Some(5));
        assert_eq!(extract("best forwards").spec.limit, Some(10));
        assert_eq!(extract("forwards").spec.limit, None);
    }

    #[test]
    fn intent_priority_prefers_search() {
        assert_eq!(extract("find the top ruckmen").intent, QueryIntent::Search);
        assert_eq!(extract("top ruckmen").intent, QueryIntent::Ranking);
        assert_eq!(extract("compare crows and port").intent, QueryIntent::Comparison);
        assert_eq!(extract("potential of young talls").intent, QueryIntent::Prediction);
    }

    #[test]
    fn club_and_league_aliases_hit() {
        let out = extract("compare collingwood pies against freo in the wafl");
        assert!(out.spec.teams.contains(&Club::Collingwood));
        assert!(out.spec.teams.contains(&Club::Fremantle));
        assert!(out.spec.leagues.contains(&League::Wafl));
        assert_eq!(out.intent, QueryIntent::Comparison);
    }

    #[test]
    fn confidence_stays_within_unit_interval() {
        for q in [
            "",
            "top 10 adelaide midfielders under 23 with high disposals in the sanfl",
            "?!@# 77",
            "best best best",
        ] {
            let c = extract(q).confidence;
            assert!((0.0..=1.0).contains(&c), "confidence {c} for {q:?}");
        }
    }
}
