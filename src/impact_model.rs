//! The fitted-scorer contract. Training happens offline; what arrives here
//! is a versioned, keyed artifact describing a standardizing linear model,
//! which gets validated once and then scored any number of times.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::features::{FeatureKey, FeatureVector};

pub const IMPACT_ARTIFACT_VERSION: u32 = 1;

const STD_FLOOR: f64 = 1e-6;

/// A fitted scorer: feature vector in, scalar impact out.
pub trait ImpactScorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> f64;
}

impl<F> ImpactScorer for F
where
    F: Fn(&FeatureVector) -> f64 + Send + Sync,
{
    fn score(&self, features: &FeatureVector) -> f64 {
        self(features)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model {key:?} carries no features")]
    Empty { key: String },
    #[error("model {key:?}: feature name/mean/std/coeff lengths disagree")]
    ShapeMismatch { key: String },
    #[error("model {key:?}: unknown feature name {name:?}")]
    UnknownFeature { key: String, name: String },
}

/// On-disk scorer artifact. Feature names use the stable string forms from
/// `FeatureKey::name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactModelArtifact {
    pub version: u32,
    pub model_key: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_means: Vec<f64>,
    #[serde(default)]
    pub feature_stds: Vec<f64>,
    #[serde(default)]
    pub coeffs: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub train_mae: f64,
    #[serde(default)]
    pub val_mae: f64,
    #[serde(default)]
    pub train_samples: usize,
    #[serde(default)]
    pub val_samples: usize,
}

/// Validated linear scorer: standardizes each feature with the artifact's
/// mean/std, then applies the coefficients. Missing features read as 0.
#[derive(Debug, Clone)]
pub struct LinearImpactModel {
    artifact: ImpactModelArtifact,
    terms: Vec<ModelTerm>,
}

#[derive(Debug, Clone, Copy)]
struct ModelTerm {
    key: FeatureKey,
    mean: f64,
    std: f64,
    coeff: f64,
}

impl LinearImpactModel {
    pub fn from_artifact(artifact: ImpactModelArtifact) -> Result<Self, ModelError> {
        let n = artifact.feature_names.len();
        if n == 0 {
            return Err(ModelError::Empty {
                key: artifact.model_key.clone(),
            });
        }
        if artifact.feature_means.len() != n
            || artifact.feature_stds.len() != n
            || artifact.coeffs.len() != n
        {
            return Err(ModelError::ShapeMismatch {
                key: artifact.model_key.clone(),
            });
        }

        let mut terms = Vec::with_capacity(n);
        for (idx, name) in artifact.feature_names.iter().enumerate() {
            let Some(key) = FeatureKey::parse(name) else {
                return Err(ModelError::UnknownFeature {
                    key: artifact.model_key.clone(),
                    name: name.clone(),
                });
            };
            terms.push(ModelTerm {
                key,
                mean: artifact.feature_means[idx],
                std: artifact.feature_stds[idx],
                coeff: artifact.coeffs[idx],
            });
        }
        Ok(Self { artifact, terms })
    }

    pub fn model_key(&self) -> &str {
        &self.artifact.model_key
    }

    pub fn artifact(&self) -> &ImpactModelArtifact {
        &self.artifact
    }
}

impl ImpactScorer for LinearImpactModel {
    fn score(&self, features: &FeatureVector) -> f64 {
        let mut sum = self.artifact.intercept;
        for term in &self.terms {
            let raw = features.get(term.key).unwrap_or(0.0);
            sum += term.coeff * (raw - term.mean) / term.std.max(STD_FLOOR);
        }
        sum
    }
}

/// Validated models keyed by artifact `model_key`, shared as `Arc` scorers.
#[derive(Debug, Clone, Default)]
pub struct ImpactModelRegistry {
    models: HashMap<String, Arc<LinearImpactModel>>,
}

impl ImpactModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: LinearImpactModel) {
        self.models
            .insert(model.model_key().to_string(), Arc::new(model));
    }

    pub fn insert_artifact(&mut self, artifact: ImpactModelArtifact) -> Result<(), ModelError> {
        self.insert(LinearImpactModel::from_artifact(artifact)?);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Arc<LinearImpactModel>> {
        self.models.get(key).cloned()
    }

    /// The abstract-scorer view the projection engine consumes.
    pub fn scorer(&self, key: &str) -> Option<Arc<dyn ImpactScorer>> {
        self.models
            .get(key)
            .map(|m| m.clone() as Arc<dyn ImpactScorer>)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

pub fn load_impact_model(path: impl AsRef<Path>) -> Result<LinearImpactModel> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read impact model {}", path.display()))?;
    let artifact = serde_json::from_str::<ImpactModelArtifact>(&raw)
        .with_context(|| format!("parse impact model {}", path.display()))?;
    let model = LinearImpactModel::from_artifact(artifact)
        .with_context(|| format!("validate impact model {}", path.display()))?;
    info!(key = model.model_key(), "loaded impact model");
    Ok(model)
}

/// Writes the artifact as pretty JSON, stamping `generated_at` and the
/// current format version when the caller left them unset.
pub fn save_impact_artifact(path: impl AsRef<Path>, artifact: &ImpactModelArtifact) -> Result<()> {
    let path = path.as_ref();
    let mut out = artifact.clone();
    if out.generated_at.is_empty() {
        out.generated_at = chrono::Utc::now().to_rfc3339();
    }
    if out.version == 0 {
        out.version = IMPACT_ARTIFACT_VERSION;
    }
    let json = serde_json::to_string_pretty(&out)
        .with_context(|| format!("encode impact model {}", out.model_key))?;
    fs::write(path, json).with_context(|| format!("write impact model {}", path.display()))?;
    Ok(())
}
