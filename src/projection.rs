//! Multi-year trajectory projection on top of an external fitted scorer:
//! each year ahead re-scores the current feature vector with extrapolated
//! counters and age-scaled trends, plus career-stage, injury-risk and
//! development-area reads over the recent history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dataset::StatKey;
use crate::features::{FeatureHistory, FeatureKey, FeatureVector, SeasonLoad};
use crate::impact_model::ImpactScorer;

/// AFL home-and-away season length, in games.
pub const SAMPLES_PER_YEAR: u32 = 22;

const DEVELOPMENT_FORM_WINDOW: usize = 10;
const LOW_GOAL_ACCURACY: f64 = 0.6;
const LOW_DISPOSAL_EFFICIENCY: f64 = 0.7;
const LOW_CONTESTED_SHARE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("no fitted scorer attached")]
    ModelNotReady,
    #[error("player has no performance history")]
    EmptyHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareerStage {
    Developing,
    Emerging,
    Peak,
    Experienced,
    Veteran,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryRisk {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentArea {
    GoalAccuracy,
    DisposalEfficiency,
    ContestedBallWinning,
}

impl DevelopmentArea {
    pub fn label(self) -> &'static str {
        match self {
            DevelopmentArea::GoalAccuracy => "Goal Accuracy",
            DevelopmentArea::DisposalEfficiency => "Disposal Efficiency",
            DevelopmentArea::ContestedBallWinning => "Contested Ball Winning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub year_offset: u32,
    pub projected_age: f64,
    pub projected_score: f64,
    pub projected_samples: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryReport {
    pub current_score: f64,
    pub career_stage: CareerStage,
    pub injury_risk: InjuryRisk,
    pub projections: Vec<ProjectionPoint>,
    /// First projection with the maximum score; None only for a 0 horizon.
    pub peak: Option<ProjectionPoint>,
    pub development_areas: Vec<DevelopmentArea>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectionConfig {
    pub samples_per_year: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            samples_per_year: SAMPLES_PER_YEAR,
        }
    }
}

/// Projects trajectories once a fitted scorer has been attached. Shareable
/// by reference across calls; the scorer itself stays read-only.
pub struct TrajectoryProjector {
    scorer: Option<Arc<dyn ImpactScorer>>,
    cfg: ProjectionConfig,
}

impl TrajectoryProjector {
    pub fn new(cfg: ProjectionConfig) -> Self {
        Self { scorer: None, cfg }
    }

    pub fn with_scorer(scorer: Arc<dyn ImpactScorer>, cfg: ProjectionConfig) -> Self {
        Self {
            scorer: Some(scorer),
            cfg,
        }
    }

    pub fn set_scorer(&mut self, scorer: Arc<dyn ImpactScorer>) {
        self.scorer = Some(scorer);
    }

    pub fn is_ready(&self) -> bool {
        self.scorer.is_some()
    }

    /// Scores the latest feature row as-is, then per year ahead re-scores a
    /// fresh copy with extrapolated age/sample counters and the age factor
    /// applied to trend features only. Offsets never compound.
    pub fn project(
        &self,
        history: &FeatureHistory,
        current_age: f64,
        horizon: u32,
    ) -> Result<TrajectoryReport, ProjectionError> {
        let Some(scorer) = self.scorer.as_deref() else {
            return Err(ProjectionError::ModelNotReady);
        };
        let Some(latest) = history.latest() else {
            return Err(ProjectionError::EmptyHistory);
        };

        let mut current = latest.clone();
        current.set(FeatureKey::Age, current_age);
        let current_score = scorer.score(&current);
        let career_samples = current.get_or_zero(FeatureKey::CareerSamples);
        let seasons_played = current.get_or_zero(FeatureKey::SeasonsPlayed);

        let mut projections = Vec::with_capacity(horizon as usize);
        for offset in 1..=horizon {
            let projected_age = current_age + f64::from(offset);
            let extra_samples = self.cfg.samples_per_year * offset;

            let mut fv = current.clone();
            fv.set(FeatureKey::Age, projected_age);
            fv.set(FeatureKey::CareerSamples, career_samples + f64::from(extra_samples));
            fv.set(FeatureKey::SeasonsPlayed, seasons_played + f64::from(offset));
            fv.scale_trends(age_factor(projected_age));

            projections.push(ProjectionPoint {
                year_offset: offset,
                projected_age,
                projected_score: scorer.score(&fv),
                projected_samples: career_samples as u32 + extra_samples,
            });
        }

        let peak = projections.iter().copied().reduce(|best, p| {
            if p.projected_score > best.projected_score {
                p
            } else {
                best
            }
        });

        let report = TrajectoryReport {
            current_score,
            career_stage: career_stage(current_age),
            injury_risk: injury_risk(&history.seasons),
            development_areas: development_areas(&history.rows),
            projections,
            peak,
        };
        debug!(stage = ?report.career_stage, risk = ?report.injury_risk, "projected trajectory");
        Ok(report)
    }
}

/// Discrete age multiplier applied to trend features during projection.
pub fn age_factor(age: f64) -> f64 {
    if age < 20.0 {
        1.10
    } else if age < 25.0 {
        1.05
    } else if age < 30.0 {
        1.00
    } else if age < 33.0 {
        0.95
    } else {
        0.90
    }
}

pub fn career_stage(age: f64) -> CareerStage {
    if age < 22.0 {
        CareerStage::Developing
    } else if age < 26.0 {
        CareerStage::Emerging
    } else if age < 30.0 {
        CareerStage::Peak
    } else if age < 33.0 {
        CareerStage::Experienced
    } else {
        CareerStage::Veteran
    }
}

/// Mean games across up to the last 3 seasons; no seasons at all reads as
/// High.
pub fn injury_risk(seasons: &[SeasonLoad]) -> InjuryRisk {
    let recent = &seasons[seasons.len().saturating_sub(3)..];
    if recent.is_empty() {
        return InjuryRisk::High;
    }
    let avg = recent.iter().map(|s| f64::from(s.samples)).sum::<f64>() / recent.len() as f64;
    if avg >= 20.0 {
        InjuryRisk::Low
    } else if avg >= 15.0 {
        InjuryRisk::Moderate
    } else {
        InjuryRisk::High
    }
}

/// Weak spots over the trailing form window: low goal accuracy, low disposal
/// efficiency, low contested share. An area is only assessed when the window
/// actually carries its inputs.
pub fn development_areas(rows: &[FeatureVector]) -> Vec<DevelopmentArea> {
    let recent = &rows[rows.len().saturating_sub(DEVELOPMENT_FORM_WINDOW)..];
    let mut out = Vec::new();

    if let Some(mean) = mean_of(recent, FeatureKey::Stat(StatKey::GoalAccuracy))
        && mean < LOW_GOAL_ACCURACY
    {
        out.push(DevelopmentArea::GoalAccuracy);
    }
    if let Some(mean) = mean_of(recent, FeatureKey::Stat(StatKey::DisposalEfficiency))
        && mean < LOW_DISPOSAL_EFFICIENCY
    {
        out.push(DevelopmentArea::DisposalEfficiency);
    }

    let contested: Vec<f64> = values_of(recent, FeatureKey::Stat(StatKey::ContestedPossessions));
    let disposals: Vec<f64> = values_of(recent, FeatureKey::Stat(StatKey::Disposals));
    if !contested.is_empty() && !disposals.is_empty() {
        let total_disposals: f64 = disposals.iter().sum();
        let share = if total_disposals > 0.0 {
            contested.iter().sum::<f64>() / total_disposals
        } else {
            0.0
        };
        if share < LOW_CONTESTED_SHARE {
            out.push(DevelopmentArea::ContestedBallWinning);
        }
    }
    out
}

fn values_of(rows: &[FeatureVector], key: FeatureKey) -> Vec<f64> {
    rows.iter().filter_map(|fv| fv.get(key)).collect()
}

fn mean_of(rows: &[FeatureVector], key: FeatureKey) -> Option<f64> {
    let values = values_of(rows, key);
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
