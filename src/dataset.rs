use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical stat columns for AFL player rows.
///
/// The counting stats at the top come straight from ingested match tables.
/// The ratio metrics at the bottom are derived (see `features`); ingestion
/// may also supply them pre-computed. Variant order is the canonical column
/// order used wherever a deterministic iteration is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKey {
    Kicks,
    Handballs,
    Disposals,
    Marks,
    Tackles,
    Goals,
    Behinds,
    ContestedPossessions,
    UncontestedPossessions,
    Clearances,
    #[serde(rename = "inside_50s")]
    Inside50s,
    Clangers,
    BrownlowVotes,
    ForwardPressure,
    DisposalEfficiency,
    GoalAccuracy,
    ContestedRate,
    MarkDisposalRatio,
    TackleEfficiency,
    VoteRate,
}

impl StatKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StatKey::Kicks => "kicks",
            StatKey::Handballs => "handballs",
            StatKey::Disposals => "disposals",
            StatKey::Marks => "marks",
            StatKey::Tackles => "tackles",
            StatKey::Goals => "goals",
            StatKey::Behinds => "behinds",
            StatKey::ContestedPossessions => "contested_possessions",
            StatKey::UncontestedPossessions => "uncontested_possessions",
            StatKey::Clearances => "clearances",
            StatKey::Inside50s => "inside_50s",
            StatKey::Clangers => "clangers",
            StatKey::BrownlowVotes => "brownlow_votes",
            StatKey::ForwardPressure => "forward_pressure",
            StatKey::DisposalEfficiency => "disposal_efficiency",
            StatKey::GoalAccuracy => "goal_accuracy",
            StatKey::ContestedRate => "contested_rate",
            StatKey::MarkDisposalRatio => "mark_disposal_ratio",
            StatKey::TackleEfficiency => "tackle_efficiency",
            StatKey::VoteRate => "vote_rate",
        }
    }

    pub fn parse(raw: &str) -> Option<StatKey> {
        let key = match raw.trim() {
            "kicks" => StatKey::Kicks,
            "handballs" => StatKey::Handballs,
            "disposals" => StatKey::Disposals,
            "marks" => StatKey::Marks,
            "tackles" => StatKey::Tackles,
            "goals" => StatKey::Goals,
            "behinds" => StatKey::Behinds,
            "contested_possessions" => StatKey::ContestedPossessions,
            "uncontested_possessions" => StatKey::UncontestedPossessions,
            "clearances" => StatKey::Clearances,
            "inside_50s" => StatKey::Inside50s,
            "clangers" => StatKey::Clangers,
            "brownlow_votes" => StatKey::BrownlowVotes,
            "forward_pressure" => StatKey::ForwardPressure,
            "disposal_efficiency" => StatKey::DisposalEfficiency,
            "goal_accuracy" => StatKey::GoalAccuracy,
            "contested_rate" => StatKey::ContestedRate,
            "mark_disposal_ratio" => StatKey::MarkDisposalRatio,
            "tackle_efficiency" => StatKey::TackleEfficiency,
            "vote_rate" => StatKey::VoteRate,
            _ => return None,
        };
        Some(key)
    }
}

/// One game row for one player: season year, round within it, raw stat columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub year: i32,
    pub round: u16,
    #[serde(default)]
    pub stats: HashMap<StatKey, f64>,
}

impl PerformanceSample {
    pub fn stat(&self, key: StatKey) -> Option<f64> {
        self.stats.get(&key).copied()
    }

    /// Missing or non-finite values read as 0, the convention across the
    /// derivation pipeline.
    pub fn stat_or_zero(&self, key: StatKey) -> f64 {
        match self.stats.get(&key) {
            Some(v) if v.is_finite() => *v,
            _ => 0.0,
        }
    }
}

/// A scouted player: identity plus a tabular snapshot row (`stats`) and a
/// time-ordered game history. The snapshot feeds filtering, clustering and
/// team-fit; the history feeds feature derivation and projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub position: String,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub stats: HashMap<StatKey, f64>,
    #[serde(default)]
    pub history: Vec<PerformanceSample>,
}

impl Player {
    pub fn stat(&self, key: StatKey) -> Option<f64> {
        self.stats.get(&key).copied()
    }

    pub fn stat_or_zero(&self, key: StatKey) -> f64 {
        match self.stats.get(&key) {
            Some(v) if v.is_finite() => *v,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_key_names_round_trip() {
        assert_eq!(StatKey::parse("inside_50s"), Some(StatKey::Inside50s));
        assert_eq!(StatKey::parse("contested_possessions"), Some(StatKey::ContestedPossessions));
        assert_eq!(StatKey::Inside50s.as_str(), "inside_50s");
        assert_eq!(StatKey::parse("xg"), None);
    }

    #[test]
    fn stat_keys_serialize_as_snake_case_map_keys() {
        let mut stats = HashMap::new();
        stats.insert(StatKey::BrownlowVotes, 3.0);
        let sample = PerformanceSample { year: 2024, round: 1, stats };
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"brownlow_votes\":3.0"));
    }

    #[test]
    fn missing_stat_reads_as_zero() {
        let p = Player {
            id: 1,
            name: "A".into(),
            team: "B".into(),
            position: "Midfielder".into(),
            age: Some(24.0),
            stats: HashMap::new(),
            history: Vec::new(),
        };
        assert_eq!(p.stat(StatKey::Goals), None);
        assert_eq!(p.stat_or_zero(StatKey::Goals), 0.0);
    }
}
