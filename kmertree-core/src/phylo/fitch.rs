//! Fitch-Margoliash least-squares clustering and branch-length refinement.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::cluster::{argmin_pair, cluster, Clustering};
use super::distance::DistanceMatrix;
use super::tree::Tree;
use crate::error::{PhyloError, PhyloResult};

/// Distances below this are treated as this when weighting.
const MIN_WEIGHTED_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitchConfig {
    /// Residuals are weighted by `1 / d^power`.
    pub power: f64,
    /// Upper bound on optimizer sweeps.
    pub max_iterations: usize,
    /// A sweep that improves the fit by less than this ends the optimizer.
    pub tolerance: f64,
}

impl Default for FitchConfig {
    fn default() -> Self {
        Self {
            power: 2.0,
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

impl FitchConfig {
    pub fn validate(&self) -> PhyloResult<()> {
        if !self.power.is_finite() || self.power < 0.0 {
            return Err(PhyloError::InvalidParameter {
                name: "power",
                msg: format!("must be finite and non-negative, got {}", self.power),
            });
        }
        if self.max_iterations == 0 {
            return Err(PhyloError::InvalidParameter {
                name: "max_iterations",
                msg: "must be at least 1".to_string(),
            });
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(PhyloError::InvalidParameter {
                name: "tolerance",
                msg: format!("must be finite and non-negative, got {}", self.tolerance),
            });
        }
        Ok(())
    }
}

fn weight(d: f64, power: f64) -> f64 {
    1.0 / d.max(MIN_WEIGHTED_DISTANCE).powf(power)
}

fn weights(dist: &DistanceMatrix, power: f64) -> Vec<Vec<f64>> {
    let n = dist.n();
    let mut floored = 0usize;
    let mut w = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = dist.get(i, j);
            if d < MIN_WEIGHTED_DISTANCE {
                floored += 1;
            }
            let x = weight(d, power);
            w[i][j] = x;
            w[j][i] = x;
        }
    }
    if floored > 0 {
        debug!(pairs = floored, "floored near-zero distances before weighting");
    }
    w
}

fn weighted_residual(patristic: &[Vec<f64>], dist: &DistanceMatrix, w: &[Vec<f64>]) -> f64 {
    let n = dist.n();
    let mut fit = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let r = dist.get(i, j) - patristic[i][j];
            fit += w[i][j] * r * r;
        }
    }
    fit
}

fn check_leaves(tree: &Tree, dist: &DistanceMatrix) -> PhyloResult<()> {
    if tree.num_leaves() != dist.n() {
        return Err(PhyloError::LabelCountMismatch {
            labels: tree.num_leaves(),
            rows: dist.n(),
        });
    }
    Ok(())
}

/// Weighted sum of squared differences between the tree's patristic
/// distances and `dist`, over every leaf pair.
///
/// Leaf `i` of the tree is compared with row `i` of `dist`.
pub fn calculate_tree_fit(tree: &Tree, dist: &DistanceMatrix, power: f64) -> PhyloResult<f64> {
    check_leaves(tree, dist)?;
    let fit = weighted_residual(&tree.patristic_matrix(), dist, &weights(dist, power));
    if !fit.is_finite() {
        return Err(PhyloError::NonFiniteFit {
            value: fit,
            context: "scoring a tree",
        });
    }
    Ok(fit)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeReport {
    pub initial_fit: f64,
    pub final_fit: f64,
    pub sweeps: usize,
}

/// Refine every branch length of `tree` against `dist`, topology fixed.
///
/// Each sweep visits every edge and moves it to the non-negative length that
/// minimizes the fit with all other lengths held. The fit never increases.
pub fn optimize_branch_lengths(
    tree: &mut Tree,
    dist: &DistanceMatrix,
    config: &FitchConfig,
) -> PhyloResult<OptimizeReport> {
    config.validate()?;
    check_leaves(tree, dist)?;

    let n = dist.n();
    let w = weights(dist, config.power);
    let original: Vec<Option<f64>> = (0..tree.num_nodes()).map(|i| tree.edge_length(i)).collect();
    let initial_fit = calculate_tree_fit(tree, dist, config.power)?;

    let inside: Vec<Vec<bool>> = (0..tree.num_nodes())
        .map(|idx| {
            let mut mask = vec![false; n];
            for leaf in tree.leaves_below(idx) {
                mask[leaf] = true;
            }
            mask
        })
        .collect();

    let mut patristic = tree.patristic_matrix();
    let mut current = initial_fit;
    let mut sweeps = 0;

    while sweeps < config.max_iterations {
        sweeps += 1;
        for (edge, mask) in inside.iter().enumerate() {
            let Some(len) = tree.edge_length(edge) else {
                continue;
            };
            let mut num = 0.0;
            let mut den = 0.0;
            for i in (0..n).filter(|&i| mask[i]) {
                for j in (0..n).filter(|&j| !mask[j]) {
                    num += w[i][j] * (dist.get(i, j) - patristic[i][j] + len);
                    den += w[i][j];
                }
            }
            if den <= 0.0 {
                continue;
            }
            let best = (num / den).max(0.0);
            let delta = best - len;
            if delta == 0.0 {
                continue;
            }
            tree.set_edge_length(edge, best);
            for i in (0..n).filter(|&i| mask[i]) {
                for j in (0..n).filter(|&j| !mask[j]) {
                    patristic[i][j] += delta;
                    patristic[j][i] += delta;
                }
            }
        }

        let next = weighted_residual(&patristic, dist, &w);
        trace!(sweep = sweeps, fit = next, "branch length sweep");
        let improvement = current - next;
        current = next;
        if improvement < config.tolerance {
            break;
        }
    }

    let mut final_fit = calculate_tree_fit(tree, dist, config.power)?;
    if final_fit > initial_fit {
        debug!(initial_fit, final_fit, "optimizer lost ground; restoring lengths");
        for (idx, len) in original.into_iter().enumerate() {
            if let Some(len) = len {
                tree.set_edge_length(idx, len);
            }
        }
        final_fit = initial_fit;
    }

    Ok(OptimizeReport {
        initial_fit,
        final_fit,
        sweeps,
    })
}

/// Least-squares agglomeration.
///
/// Each candidate pair is scored by how well a cherry with implied branch
/// lengths explains both members' distances to every other row. The result
/// is rooted between the last two clusters.
#[derive(Debug, Clone, Copy)]
pub struct FitchMargoliash {
    pub power: f64,
}

impl Default for FitchMargoliash {
    fn default() -> Self {
        Self {
            power: FitchConfig::default().power,
        }
    }
}

impl FitchMargoliash {
    /// Implied cherry lengths for rows `a` and `b` from their mean distance
    /// to every other row.
    fn implied_lengths(dist: &DistanceMatrix, a: usize, b: usize) -> (f64, f64) {
        let n = dist.n();
        let dab = dist.get(a, b);
        if n <= 2 {
            return (dab / 2.0, dab / 2.0);
        }
        let others = (n - 2) as f64;
        let ra = (dist.row(a).sum - dab) / others;
        let rb = (dist.row(b).sum - dab) / others;
        let la = (dab + ra - rb) / 2.0;
        (la, dab - la)
    }

    fn pair_score(&self, dist: &DistanceMatrix, a: usize, b: usize) -> f64 {
        let (la, lb) = Self::implied_lengths(dist, a, b);
        (0..dist.n())
            .filter(|&k| k != a && k != b)
            .map(|k| {
                let (dak, dbk) = (dist.get(a, k), dist.get(b, k));
                let delta = (dak - la) - (dbk - lb);
                (weight(dak, self.power) + weight(dbk, self.power)) * delta * delta / 4.0
            })
            .sum()
    }
}

impl Clustering for FitchMargoliash {
    fn name(&self) -> &'static str {
        "fm"
    }

    fn select_pair(&self, dist: &DistanceMatrix, _tree: &Tree) -> (usize, usize) {
        argmin_pair(dist.n(), |i, j| self.pair_score(dist, i, j))
    }

    fn branch_lengths(
        &self,
        dist: &DistanceMatrix,
        _tree: &Tree,
        a: usize,
        b: usize,
    ) -> (f64, f64) {
        Self::implied_lengths(dist, a, b)
    }

    fn merged_distance(
        &self,
        dist: &DistanceMatrix,
        tree: &Tree,
        a: usize,
        b: usize,
        k: usize,
        la: f64,
        lb: f64,
    ) -> f64 {
        let sa = tree.node(dist.row(a).id).size as f64;
        let sb = tree.node(dist.row(b).id).size as f64;
        (sa * (dist.get(a, k) - la) + sb * (dist.get(b, k) - lb)) / (sa + sb)
    }

    fn base_lengths(&self, dist: &DistanceMatrix, _tree: &Tree) -> Vec<f64> {
        let half = dist.get(0, 1) / 2.0;
        vec![half, half]
    }
}

/// Fitch-Margoliash tree of `dist` with optimized branch lengths.
pub fn fitch_margoliash(dist: &DistanceMatrix, config: &FitchConfig) -> PhyloResult<Tree> {
    config.validate()?;
    let mut tree = cluster(
        &FitchMargoliash {
            power: config.power,
        },
        dist,
    )?;
    let report = optimize_branch_lengths(&mut tree, dist, config)?;
    info!(
        initial_fit = report.initial_fit,
        final_fit = report.final_fit,
        sweeps = report.sweeps,
        "branch lengths optimized"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn additive_quartet() -> DistanceMatrix {
        // ((A:1,B:2):1,(C:1,D:1)) as an unrooted tree.
        let data = vec![
            0.0, 3.0, 3.0, 3.0, //
            3.0, 0.0, 4.0, 4.0, //
            3.0, 4.0, 0.0, 2.0, //
            3.0, 4.0, 2.0, 0.0, //
        ];
        let labels = ["A", "B", "C", "D"].iter().map(|s| Box::from(*s)).collect();
        DistanceMatrix::new(labels, data).unwrap()
    }

    #[test]
    fn config_validation() {
        assert!(FitchConfig::default().validate().is_ok());
        let bad = FitchConfig {
            power: -1.0,
            ..FitchConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = FitchConfig {
            max_iterations: 0,
            ..FitchConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = FitchConfig {
            tolerance: f64::NAN,
            ..FitchConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn weights_floor_zero_distances() {
        assert_eq!(weight(0.0, 0.0), 1.0);
        assert!(weight(0.0, 2.0).is_finite());
        assert!((weight(2.0, 2.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn additive_quartet_fits_exactly() {
        let dm = additive_quartet();
        let tree = fitch_margoliash(&dm, &FitchConfig::default()).unwrap();
        assert_eq!(tree.num_nodes(), 6);
        assert!(tree.is_rooted());
        let fit = calculate_tree_fit(&tree, &dm, 2.0).unwrap();
        assert!(fit < 1e-12, "fit {fit}");
    }

    #[test]
    fn sister_pair_scores_zero() {
        let dm = additive_quartet();
        let fm = FitchMargoliash::default();
        assert!(fm.pair_score(&dm, 2, 3).abs() < 1e-12);
        assert!(fm.pair_score(&dm, 0, 2) > 0.0);
    }

    #[test]
    fn optimizer_repairs_bad_lengths() {
        let dm = additive_quartet();
        let mut tree = fitch_margoliash(&dm, &FitchConfig::default()).unwrap();
        for idx in 0..tree.num_nodes() {
            tree.set_edge_length(idx, 5.0);
        }
        let report = optimize_branch_lengths(&mut tree, &dm, &FitchConfig::default()).unwrap();
        assert!(report.final_fit < report.initial_fit);
        assert!(report.sweeps >= 1);
        assert!(report.sweeps <= 100);
    }

    #[test]
    fn leaf_count_must_match() {
        let dm = additive_quartet();
        let other = DistanceMatrix::new(
            vec!["x".into(), "y".into()],
            vec![0.0, 1.0, 1.0, 0.0],
        )
        .unwrap();
        let tree = fitch_margoliash(&other, &FitchConfig::default()).unwrap();
        assert!(calculate_tree_fit(&tree, &dm, 2.0).is_err());
    }
}
