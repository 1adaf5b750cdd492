//! Team-fit scoring: weighted sums of population-max-normalized stats
//! against named style profiles, floored at zero and bucketed.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dataset::{Player, StatKey};

const EXCELLENT_FIT: f64 = 0.7;
const GOOD_FIT: f64 = 0.5;

/// The four built-in profiles. Weights may be negative; a stat working
/// against the style subtracts from the sum.
static TEAM_STYLE_PROFILES: Lazy<Vec<TeamStyleProfile>> = Lazy::new(|| {
    vec![
        TeamStyleProfile::new(
            "possession_based",
            [
                (StatKey::UncontestedPossessions, 0.3),
                (StatKey::MarkDisposalRatio, 0.2),
                (StatKey::ContestedRate, -0.1),
            ],
        ),
        TeamStyleProfile::new(
            "pressure_based",
            [
                (StatKey::Tackles, 0.4),
                (StatKey::ContestedPossessions, 0.3),
                (StatKey::TackleEfficiency, 0.3),
            ],
        ),
        TeamStyleProfile::new(
            "attacking",
            [
                (StatKey::Goals, 0.4),
                (StatKey::GoalAccuracy, 0.3),
                (StatKey::ForwardPressure, 0.3),
            ],
        ),
        TeamStyleProfile::new(
            "defensive",
            [
                (StatKey::Tackles, 0.3),
                (StatKey::ContestedRate, 0.3),
                (StatKey::MarkDisposalRatio, 0.2),
            ],
        ),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamFitError {
    #[error("unknown team style profile: {0}")]
    UnknownStyleProfile(String),
}

/// A named weight table over stat columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStyleProfile {
    pub name: String,
    pub weights: Vec<(StatKey, f64)>,
}

impl TeamStyleProfile {
    pub fn new(name: &str, weights: impl IntoIterator<Item = (StatKey, f64)>) -> Self {
        Self {
            name: name.to_string(),
            weights: weights.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitBucket {
    Excellent,
    Good,
    Weak,
}

impl FitBucket {
    pub fn from_score(score: f64) -> Self {
        if score > EXCELLENT_FIT {
            FitBucket::Excellent
        } else if score > GOOD_FIT {
            FitBucket::Good
        } else {
            FitBucket::Weak
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitScore {
    pub player_id: u32,
    pub name: String,
    /// Non-negative; has no fixed upper bound.
    pub score: f64,
    pub bucket: FitBucket,
}

pub fn team_style_profiles() -> &'static [TeamStyleProfile] {
    &TEAM_STYLE_PROFILES
}

/// Scores every player against a built-in profile, best fit first.
/// A name that matches no profile leaves the population unscored.
pub fn evaluate_team_fit(players: &[Player], style: &str) -> Result<Vec<FitScore>, TeamFitError> {
    let Some(profile) = TEAM_STYLE_PROFILES.iter().find(|p| p.name == style) else {
        return Err(TeamFitError::UnknownStyleProfile(style.to_string()));
    };
    Ok(evaluate_team_fit_with(players, profile))
}

/// Per player, sums weight × (value / population max) over the profile stats
/// the population carries, then floors the total at 0. A stat nobody carries
/// is skipped; a non-positive population max normalizes by 1 instead.
pub fn evaluate_team_fit_with(players: &[Player], profile: &TeamStyleProfile) -> Vec<FitScore> {
    let columns: Vec<(StatKey, f64, f64)> = profile
        .weights
        .iter()
        .filter_map(|&(stat, weight)| {
            if !players.iter().any(|p| p.stat(stat).is_some()) {
                return None;
            }
            let max = players
                .iter()
                .filter_map(|p| p.stat(stat))
                .filter(|v| v.is_finite())
                .fold(f64::NEG_INFINITY, f64::max);
            let denom = if max > 0.0 { max } else { 1.0 };
            Some((stat, weight, denom))
        })
        .collect();

    let mut scores: Vec<FitScore> = players
        .iter()
        .map(|p| {
            let total: f64 = columns
                .iter()
                .map(|&(stat, weight, denom)| weight * (p.stat_or_zero(stat) / denom))
                .sum();
            let score = total.max(0.0);
            FitScore {
                player_id: p.id,
                name: p.name.clone(),
                score,
                bucket: FitBucket::from_score(score),
            }
        })
        .collect();
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    debug!(style = profile.name.as_str(), players = scores.len(), "scored team fit");
    scores
}
