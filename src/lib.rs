//! AFL scouting query and evaluation engine
//!
//! Turns free-text scouting questions into structured filters over player
//! statistics, and computes the derived signals used to rank and explain
//! players: rolling-form features, multi-year trajectory projections,
//! playing-style clusters, and team-fit scores. Everything here is a pure
//! computation over read-only inputs; dataset and model loading happen
//! before invocation and the results share freely across threads.

pub mod dataset;
pub mod features;
pub mod impact_model;
pub mod projection;
pub mod query_extract;
pub mod query_filter;
pub mod style_cluster;
pub mod team_fit;
pub mod vocab;

pub use dataset::{PerformanceSample, Player, StatKey};
pub use features::{
    derive_features, derive_features_batch, snapshot_features, with_derived_metrics,
    FeatureHistory, FeatureKey, FeatureVector,
};
pub use impact_model::{ImpactModelRegistry, ImpactScorer};
pub use projection::{TrajectoryProjector, TrajectoryReport};
pub use query_extract::{ExtractedQuery, ExtractorConfig, FilterSpec, QueryExtractor};
pub use query_filter::{apply_filter, rank_players};
pub use style_cluster::{cluster_styles, ClusterConfig, StyleReport};
pub use team_fit::{evaluate_team_fit, FitScore, TeamStyleProfile};
