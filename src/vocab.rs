//! Static scouting vocabulary: synonym tables for positions, clubs, leagues,
//! stats, comparison families, age words and intents, plus pure lookups.
//! The extractor walks these tables; nothing here touches control flow.

use serde::{Deserialize, Serialize};

use crate::dataset::StatKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Defender,
    Midfielder,
    Forward,
    Ruck,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Defender => "defender",
            Position::Midfielder => "midfielder",
            Position::Forward => "forward",
            Position::Ruck => "ruck",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Club {
    Adelaide,
    Brisbane,
    Carlton,
    Collingwood,
    Essendon,
    Fremantle,
    Geelong,
    GoldCoast,
    Gws,
    Hawthorn,
    Melbourne,
    NorthMelbourne,
    PortAdelaide,
    Richmond,
    StKilda,
    Sydney,
    WestCoast,
    WesternBulldogs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum League {
    Afl,
    Vfl,
    Sanfl,
    Wafl,
    Neafl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    High,
    Low,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Search,
    Comparison,
    Analysis,
    Ranking,
    Prediction,
}

pub const POSITION_SYNONYMS: [(Position, &[&str]); 4] = [
    (Position::Defender, &["defender", "defence", "back", "backman", "fullback", "halfback"]),
    (Position::Midfielder, &["midfielder", "midfield", "mid", "centre", "wing", "winger"]),
    (Position::Forward, &["forward", "forwards", "key forward", "small forward", "fullforward"]),
    (Position::Ruck, &["ruck", "ruckman", "big man"]),
];

/// Table order doubles as the tie-break order for the sort criterion: the
/// first entry whose alias appears in a superlative query wins.
pub const STAT_SYNONYMS: [(StatKey, &[&str]); 9] = [
    (StatKey::Disposals, &["disposal", "disposals", "possession", "possessions", "touch", "touches"]),
    (StatKey::Marks, &["mark", "marks", "marking", "catch", "catches"]),
    (StatKey::Tackles, &["tackle", "tackles", "tackling", "pressure"]),
    (StatKey::Goals, &["goal", "goals", "scoring", "kicking goals"]),
    (StatKey::ContestedPossessions, &["contested", "contested possession", "hard ball", "contest"]),
    (StatKey::Clearances, &["clearance", "clearances", "clearing"]),
    (StatKey::GoalAccuracy, &["accuracy", "goal accuracy", "kicking accuracy", "accurate"]),
    (StatKey::Kicks, &["kick", "kicks", "kicking"]),
    (StatKey::Handballs, &["handball", "handballs", "handpass"]),
];

pub const CLUB_SYNONYMS: [(Club, &[&str]); 18] = [
    (Club::Adelaide, &["adelaide", "crows"]),
    (Club::Brisbane, &["brisbane", "lions"]),
    (Club::Carlton, &["carlton", "blues"]),
    (Club::Collingwood, &["collingwood", "magpies", "pies"]),
    (Club::Essendon, &["essendon", "bombers"]),
    (Club::Fremantle, &["fremantle", "dockers", "freo"]),
    (Club::Geelong, &["geelong", "cats"]),
    (Club::GoldCoast, &["gold coast", "suns"]),
    (Club::Gws, &["gws", "giants", "greater western sydney"]),
    (Club::Hawthorn, &["hawthorn", "hawks"]),
    (Club::Melbourne, &["melbourne", "demons", "dees"]),
    (Club::NorthMelbourne, &["north melbourne", "kangaroos", "roos"]),
    (Club::PortAdelaide, &["port adelaide", "power", "port"]),
    (Club::Richmond, &["richmond", "tigers"]),
    (Club::StKilda, &["st kilda", "saints"]),
    (Club::Sydney, &["sydney", "swans"]),
    (Club::WestCoast, &["west coast", "eagles"]),
    (Club::WesternBulldogs, &["western bulldogs", "bulldogs", "dogs"]),
];

pub const LEAGUE_SYNONYMS: [(League, &[&str]); 5] = [
    (League::Afl, &["afl", "australian football league"]),
    (League::Vfl, &["vfl", "victorian football league"]),
    (League::Sanfl, &["sanfl", "south australian national football league"]),
    (League::Wafl, &["wafl", "west australian football league"]),
    (League::Neafl, &["neafl", "north east australian football league"]),
];

/// Family order matters: when several families sit near the same stat the
/// last one in this table wins the attribution.
pub const COMPARISON_SYNONYMS: [(Bucket, &[&str]); 3] = [
    (Bucket::High, &["high", "top", "best", "excellent", "great", "good", "above"]),
    (Bucket::Low, &["low", "bottom", "worst", "poor", "below"]),
    (Bucket::Medium, &["medium", "average", "moderate"]),
];

pub const YOUNG_WORDS: &[&str] = &["young", "youth", "junior", "under"];
pub const EXPERIENCED_WORDS: &[&str] = &["experienced", "veteran", "old", "senior", "over"];

pub const AGE_MAX_PREFIXES: &[&str] = &["under", "below"];
pub const AGE_MIN_PREFIXES: &[&str] = &["over", "above"];

pub const SUPERLATIVE_WORDS: &[&str] = &["best", "top", "highest", "most", "leading"];
pub const LIMIT_PREFIX_WORDS: &[&str] = &["top", "best", "first"];
pub const LIMIT_DEFAULT_WORDS: &[&str] = &["top", "best", "leading"];

pub const INTENT_SYNONYMS: [(QueryIntent, &[&str]); 5] = [
    (QueryIntent::Search, &["find", "show", "list", "get"]),
    (QueryIntent::Comparison, &["compare", "vs", "versus"]),
    (QueryIntent::Analysis, &["analyze", "analysis", "breakdown"]),
    (QueryIntent::Ranking, &["rank", "ranking", "top", "best"]),
    (QueryIntent::Prediction, &["predict", "forecast", "potential"]),
];

/// Aliases for one club, for matching raw team strings from ingested rows.
pub fn club_aliases(club: Club) -> &'static [&'static str] {
    for (candidate, aliases) in CLUB_SYNONYMS {
        if candidate == club {
            return aliases;
        }
    }
    &[]
}

/// True when any alias of the list occurs in the (already lowercased) text.
pub fn any_alias_in(text: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|a| text.contains(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn club_aliases_cover_nicknames() {
        assert!(club_aliases(Club::Collingwood).contains(&"pies"));
        assert!(club_aliases(Club::WesternBulldogs).contains(&"dogs"));
        assert_eq!(club_aliases(Club::Gws).len(), 3);
    }

    #[test]
    fn alias_matching_is_substring_based() {
        assert!(any_alias_in("young midfielders", POSITION_SYNONYMS[1].1));
        // "mid" also hits inside unrelated words; matching is plain containment.
        assert!(any_alias_in("amid the contest", POSITION_SYNONYMS[1].1));
        assert!(!any_alias_in("ruckman", POSITION_SYNONYMS[0].1));
    }

    #[test]
    fn stat_table_order_starts_with_disposals() {
        assert_eq!(STAT_SYNONYMS[0].0, StatKey::Disposals);
        assert_eq!(STAT_SYNONYMS[6].0, StatKey::GoalAccuracy);
    }
}
