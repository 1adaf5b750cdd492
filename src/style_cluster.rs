//! Playing-style discovery: k-means over standardized ratio features with a
//! fixed seed, best-of-n-init by inertia, silhouette cohesion, and a small
//! centroid decision rule that names each cluster.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::dataset::StatKey;
use crate::features::{FeatureKey, FeatureVector};

pub const CLUSTER_FEATURES: [StatKey; 4] = [
    StatKey::MarkDisposalRatio,
    StatKey::ContestedRate,
    StatKey::GoalAccuracy,
    StatKey::TackleEfficiency,
];

const MIN_CLUSTER_FEATURES: usize = 2;
const CONVERGENCE_TOL: f64 = 1e-4;
const STD_FLOOR: f64 = 1e-9;
// Label thresholds read standardized centroid coordinates, not raw ratios.
const HIGH_MARK: f64 = 0.5;
const HIGH_GOAL: f64 = 0.5;
const HIGH_CONTESTED: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("fewer than two usable style features in the population")]
    NotEnoughFeatures,
}

#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
    pub k: usize,
    pub seed: u64,
    pub n_init: u32,
    pub max_iter: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 5,
            seed: 42,
            n_init: 10,
            max_iter: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleCluster {
    pub cluster_id: usize,
    /// Centroid in standardized units, one value per entry of `features`.
    pub centroid: Vec<f64>,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleReport {
    /// The cluster features the population actually carried, in table order.
    pub features: Vec<StatKey>,
    pub clusters: Vec<StyleCluster>,
    /// Per input row, index into `clusters`.
    pub assignments: Vec<usize>,
    /// Mean silhouette across rows; 0 when undefined for the partition.
    pub cohesion: f64,
}

struct KMeansFit {
    centroids: Vec<Vec<f64>>,
    assignments: Vec<usize>,
    inertia: f64,
}

/// Partitions the population into up to `cfg.k` playing styles. Feature
/// columns nobody carries are dropped first; fewer than two left is an
/// error with the input untouched. Fixed seed + fixed input = identical
/// assignments and labels on every call.
pub fn cluster_styles(rows: &[FeatureVector], cfg: ClusterConfig) -> Result<StyleReport, ClusterError> {
    let features: Vec<StatKey> = CLUSTER_FEATURES
        .into_iter()
        .filter(|&stat| rows.iter().any(|fv| fv.get(FeatureKey::Stat(stat)).is_some()))
        .collect();
    if features.len() < MIN_CLUSTER_FEATURES {
        return Err(ClusterError::NotEnoughFeatures);
    }

    let matrix: Vec<Vec<f64>> = rows
        .iter()
        .map(|fv| {
            features
                .iter()
                .map(|&stat| {
                    let value = fv.get_or_zero(FeatureKey::Stat(stat));
                    if value.is_finite() { value } else { 0.0 }
                })
                .collect()
        })
        .collect();
    let scaled = standardize(&matrix, features.len());

    let k = cfg.k.min(rows.len()).max(1);
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut fit = lloyd(&scaled, k, cfg.max_iter, &mut rng);
    for init in 1..cfg.n_init.max(1) {
        let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(u64::from(init)));
        let candidate = lloyd(&scaled, k, cfg.max_iter, &mut rng);
        if candidate.inertia < fit.inertia {
            fit = candidate;
        }
    }

    let cohesion = silhouette(&scaled, &fit.assignments, k);
    let clusters = fit
        .centroids
        .into_iter()
        .enumerate()
        .map(|(cluster_id, centroid)| {
            let label = style_label(cluster_id, &centroid, &features);
            StyleCluster { cluster_id, centroid, label }
        })
        .collect();
    info!(clusters = k, cohesion, "clustered playing styles");

    Ok(StyleReport {
        features,
        clusters,
        assignments: fit.assignments,
        cohesion,
    })
}

/// Zero-mean unit-variance per column, population standard deviation.
fn standardize(matrix: &[Vec<f64>], dims: usize) -> Vec<Vec<f64>> {
    let n = matrix.len().max(1) as f64;
    let mut means = vec![0.0f64; dims];
    for row in matrix {
        for (acc, v) in means.iter_mut().zip(row) {
            *acc += v;
        }
    }
    for m in means.iter_mut() {
        *m /= n;
    }

    let mut stds = vec![0.0f64; dims];
    for row in matrix {
        for ((acc, v), m) in stds.iter_mut().zip(row).zip(&means) {
            *acc += (v - m) * (v - m);
        }
    }
    for s in stds.iter_mut() {
        *s = (*s / n).sqrt().max(STD_FLOOR);
    }

    matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(means.iter().zip(&stds))
                .map(|(v, (m, s))| (v - m) / s)
                .collect()
        })
        .collect()
}

fn lloyd(data: &[Vec<f64>], k: usize, max_iter: u32, rng: &mut StdRng) -> KMeansFit {
    let dims = data[0].len();
    let mut centroids = seed_centroids(data, k, rng);
    let mut assignments = vec![0usize; data.len()];

    for _ in 0..max_iter {
        for (row, slot) in data.iter().zip(assignments.iter_mut()) {
            *slot = nearest_centroid(row, &centroids);
        }

        let mut sums = vec![vec![0.0f64; dims]; k];
        let mut counts = vec![0usize; k];
        for (row, &cluster) in data.iter().zip(&assignments) {
            counts[cluster] += 1;
            for (acc, v) in sums[cluster].iter_mut().zip(row) {
                *acc += v;
            }
        }

        let mut shift = 0.0f64;
        for (cluster, sum) in sums.into_iter().enumerate() {
            if counts[cluster] == 0 {
                // an emptied cluster keeps its centroid
                continue;
            }
            let next: Vec<f64> = sum.into_iter().map(|s| s / counts[cluster] as f64).collect();
            shift = shift.max(sq_dist(&centroids[cluster], &next));
            centroids[cluster] = next;
        }
        if shift < CONVERGENCE_TOL {
            break;
        }
    }

    for (row, slot) in data.iter().zip(assignments.iter_mut()) {
        *slot = nearest_centroid(row, &centroids);
    }
    let inertia = data
        .iter()
        .zip(&assignments)
        .map(|(row, &cluster)| sq_dist(row, &centroids[cluster]))
        .sum();
    KMeansFit { centroids, assignments, inertia }
}

/// k-means++ seeding: first centroid uniform, the rest weighted by squared
/// distance to the nearest centroid chosen so far.
fn seed_centroids(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..data.len())].clone());
    while centroids.len() < k {
        let weights: Vec<f64> = data
            .iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|c| sq_dist(row, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            centroids.push(data[rng.gen_range(0..data.len())].clone());
            continue;
        }
        let mut draw = rng.r#gen::<f64>() * total;
        let mut chosen = data.len() - 1;
        for (idx, w) in weights.iter().enumerate() {
            draw -= w;
            if draw <= 0.0 {
                chosen = idx;
                break;
            }
        }
        centroids.push(data[chosen].clone());
    }
    centroids
}

fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = sq_dist(row, centroid);
        if d < best_dist {
            best_dist = d;
            best = idx;
        }
    }
    best
}

fn sq_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Mean silhouette over all rows. Undefined partitions (fewer than two
/// populated clusters, or every row its own cluster) read as 0.
fn silhouette(data: &[Vec<f64>], assignments: &[usize], k: usize) -> f64 {
    let n = data.len();
    let mut counts = vec![0usize; k];
    for &cluster in assignments {
        counts[cluster] += 1;
    }
    let populated = counts.iter().filter(|&&c| c > 0).count();
    if populated < 2 || populated > n.saturating_sub(1) {
        return 0.0;
    }

    let mut total = 0.0;
    for (i, row) in data.iter().enumerate() {
        let own = assignments[i];
        if counts[own] == 1 {
            // singletons score 0
            continue;
        }
        let mut dist_sums = vec![0.0f64; k];
        for (j, other) in data.iter().enumerate() {
            if i != j {
                dist_sums[assignments[j]] += sq_dist(row, other).sqrt();
            }
        }
        let a = dist_sums[own] / (counts[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && counts[c] > 0)
            .map(|c| dist_sums[c] / counts[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / n as f64
}

/// Names a cluster from its standardized centroid: strong marking splits
/// into forward/defender/marker by goal accuracy, the rest split into
/// inside/outside midfield by contested rate, anything undistinguishable
/// gets a numbered style.
fn style_label(cluster_id: usize, centroid: &[f64], features: &[StatKey]) -> String {
    let coord = |stat: StatKey| {
        features
            .iter()
            .position(|&f| f == stat)
            .map(|idx| centroid[idx])
    };

    let generic = format!("Style_{}", cluster_id + 1);
    let Some(mark) = coord(StatKey::MarkDisposalRatio) else {
        return generic;
    };
    if mark > HIGH_MARK {
        return match coord(StatKey::GoalAccuracy) {
            Some(goal) if goal > HIGH_GOAL => "Key Forward".to_string(),
            Some(_) => "Marking Defender".to_string(),
            None => "Strong Marker".to_string(),
        };
    }
    match coord(StatKey::ContestedRate) {
        Some(contested) if contested > HIGH_CONTESTED => "Inside Midfielder".to_string(),
        Some(_) => "Outside Runner".to_string(),
        None => generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(mark: f64, contested: f64) -> FeatureVector {
        let mut fv = FeatureVector::new();
        fv.set(FeatureKey::Stat(StatKey::MarkDisposalRatio), mark);
        fv.set(FeatureKey::Stat(StatKey::ContestedRate), contested);
        fv
    }

    fn two_blobs() -> Vec<FeatureVector> {
        let mut rows = Vec::new();
        for i in 0..6 {
            let jitter = i as f64 * 0.002;
            rows.push(row(0.10 + jitter, 0.10 + jitter));
            rows.push(row(0.90 - jitter, 0.90 - jitter));
        }
        rows
    }

    #[test]
    fn too_few_usable_features_is_an_error() {
        assert_eq!(
            cluster_styles(&[], ClusterConfig::default()).unwrap_err(),
            ClusterError::NotEnoughFeatures
        );

        let mut fv = FeatureVector::new();
        fv.set(FeatureKey::Stat(StatKey::GoalAccuracy), 0.5);
        let rows = vec![fv.clone(), fv];
        assert_eq!(
            cluster_styles(&rows, ClusterConfig::default()).unwrap_err(),
            ClusterError::NotEnoughFeatures
        );
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let rows = two_blobs();
        let cfg = ClusterConfig::default();
        let first = cluster_styles(&rows, cfg).unwrap();
        let second = cluster_styles(&rows, cfg).unwrap();
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.cohesion, second.cohesion);
        let labels =
            |r: &StyleReport| r.clusters.iter().map(|c| c.label.clone()).collect::<Vec<_>>();
        assert_eq!(labels(&first), labels(&second));
    }

    #[test]
    fn separated_blobs_split_cleanly_with_k2() {
        let rows = two_blobs();
        let cfg = ClusterConfig { k: 2, ..ClusterConfig::default() };
        let report = cluster_styles(&rows, cfg).unwrap();
        assert_eq!(report.clusters.len(), 2);
        assert_eq!(report.assignments.len(), rows.len());

        // Even indices are the low blob, odd the high; each side uniform.
        let low = report.assignments[0];
        let high = report.assignments[1];
        assert_ne!(low, high);
        for (idx, &cluster) in report.assignments.iter().enumerate() {
            assert_eq!(cluster, if idx % 2 == 0 { low } else { high });
        }
        assert!(report.cohesion > 0.5);
    }

    #[test]
    fn k_clamps_to_population_size() {
        let rows = vec![row(0.1, 0.1), row(0.5, 0.5), row(0.9, 0.9)];
        let report = cluster_styles(&rows, ClusterConfig::default()).unwrap();
        assert_eq!(report.clusters.len(), 3);
        // Three singletons leave the silhouette undefined.
        assert_eq!(report.cohesion, 0.0);
    }

    #[test]
    fn column_scaling_does_not_change_assignments() {
        let rows = two_blobs();
        let scaled_rows: Vec<FeatureVector> = rows
            .iter()
            .map(|fv| {
                let mut out = FeatureVector::new();
                out.set(
                    FeatureKey::Stat(StatKey::MarkDisposalRatio),
                    fv.get_or_zero(FeatureKey::Stat(StatKey::MarkDisposalRatio)) * 100.0,
                );
                out.set(
                    FeatureKey::Stat(StatKey::ContestedRate),
                    fv.get_or_zero(FeatureKey::Stat(StatKey::ContestedRate)),
                );
                out
            })
            .collect();
        let cfg = ClusterConfig { k: 2, ..ClusterConfig::default() };
        let base = cluster_styles(&rows, cfg).unwrap();
        let rescaled = cluster_styles(&scaled_rows, cfg).unwrap();
        assert_eq!(base.assignments, rescaled.assignments);
    }

    #[test]
    fn label_rule_reads_centroid_coordinates() {
        let all = vec![
            StatKey::MarkDisposalRatio,
            StatKey::ContestedRate,
            StatKey::GoalAccuracy,
            StatKey::TackleEfficiency,
        ];
        assert_eq!(style_label(0, &[1.0, 0.0, 1.0, 0.0], &all), "Key Forward");
        assert_eq!(style_label(0, &[1.0, 0.0, 0.0, 0.0], &all), "Marking Defender");
        assert_eq!(style_label(0, &[0.0, 0.5, 0.0, 0.0], &all), "Inside Midfielder");
        assert_eq!(style_label(0, &[0.0, 0.2, 0.0, 0.0], &all), "Outside Runner");

        let without_goal = vec![StatKey::MarkDisposalRatio, StatKey::ContestedRate];
        assert_eq!(style_label(0, &[1.0, 0.0], &without_goal), "Strong Marker");

        let without_mark = vec![StatKey::ContestedRate, StatKey::GoalAccuracy];
        assert_eq!(style_label(2, &[1.0, 1.0], &without_mark), "Style_3");

        let mark_only_low = vec![StatKey::MarkDisposalRatio, StatKey::GoalAccuracy];
        assert_eq!(style_label(1, &[0.0, 1.0], &mark_only_low), "Style_2");
    }
}
