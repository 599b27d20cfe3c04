use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::distance::DistanceMatrix;
use super::tree::{Child, Tree};
use crate::error::{PhyloError, PhyloResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Nj,
    Upgma,
    Fm,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Nj => "nj",
            Algorithm::Upgma => "upgma",
            Algorithm::Fm => "fm",
        }
    }
}

impl FromStr for Algorithm {
    type Err = PhyloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nj" => Ok(Algorithm::Nj),
            "upgma" => Ok(Algorithm::Upgma),
            "fm" => Ok(Algorithm::Fm),
            _ => Err(PhyloError::UnknownAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// Selection and update rules of one agglomerative clustering method.
///
/// Row arguments are positions in the live matrix, not node ids. The matrix
/// shrinks by one row per join; `tree` holds every node created so far and
/// is indexed through `DistanceRow::id`.
pub trait Clustering {
    fn name(&self) -> &'static str;

    fn min_taxa(&self) -> usize {
        2
    }

    /// Number of subtrees left unjoined when the loop stops.
    fn base_size(&self) -> usize {
        2
    }

    /// Pick the two rows to join next, `a < b`.
    fn select_pair(&self, dist: &DistanceMatrix, tree: &Tree) -> (usize, usize);

    /// Branch lengths from the new node down to rows `a` and `b`.
    fn branch_lengths(
        &self,
        dist: &DistanceMatrix,
        tree: &Tree,
        a: usize,
        b: usize,
    ) -> (f64, f64);

    /// Distance from the node joining `a` and `b` to row `k`.
    #[allow(clippy::too_many_arguments)]
    fn merged_distance(
        &self,
        dist: &DistanceMatrix,
        tree: &Tree,
        a: usize,
        b: usize,
        k: usize,
        la: f64,
        lb: f64,
    ) -> f64;

    /// Branch lengths for the rows left when the loop stops, in row order.
    fn base_lengths(&self, dist: &DistanceMatrix, tree: &Tree) -> Vec<f64>;
}

/// Lowest-scoring pair `(i, j)` with `i < j`; ties keep the earliest pair.
pub(crate) fn argmin_pair<F>(n: usize, mut score: F) -> (usize, usize)
where
    F: FnMut(usize, usize) -> f64,
{
    let mut best = (0, 1);
    let mut best_score = f64::INFINITY;
    for i in 0..n {
        for j in (i + 1)..n {
            let s = score(i, j);
            if s < best_score {
                best_score = s;
                best = (i, j);
            }
        }
    }
    best
}

fn clamp_non_negative(value: f64, what: &'static str) -> f64 {
    if value < 0.0 {
        debug!(value, what, "clamped negative value to zero");
        0.0
    } else {
        value
    }
}

/// Collapse `dist` into a tree, one join per iteration.
pub fn cluster<C>(strategy: &C, dist: &DistanceMatrix) -> PhyloResult<Tree>
where
    C: Clustering + ?Sized,
{
    let n = dist.n();
    let min = strategy.min_taxa();
    if n < min {
        return Err(PhyloError::TooFewTaxa { n, min });
    }

    let mut tree = Tree::from_matrix(dist);
    let mut matrix = dist.clone();

    while matrix.n() > strategy.base_size() {
        let (a, b) = strategy.select_pair(&matrix, &tree);
        let (la, lb) = strategy.branch_lengths(&matrix, &tree, a, b);
        let la = clamp_non_negative(la, "branch length");
        let lb = clamp_non_negative(lb, "branch length");

        let distances = (0..matrix.n())
            .filter(|&k| k != a && k != b)
            .map(|k| {
                let d = strategy.merged_distance(&matrix, &tree, a, b, k, la, lb);
                clamp_non_negative(d, "merged distance")
            })
            .collect();

        let (ia, ib) = (matrix.row(a).id, matrix.row(b).id);
        let u = tree.join_nodes(ia, ib, la, lb);
        debug!(
            algorithm = strategy.name(),
            left = ia,
            right = ib,
            node = u,
            la,
            lb,
            "joined"
        );
        matrix.merge(a, b, u, distances);
    }

    let lengths = strategy.base_lengths(&matrix, &tree);
    let base = matrix
        .rows()
        .iter()
        .zip(lengths)
        .map(|(row, len)| Child {
            node: row.id,
            distance: clamp_non_negative(len, "branch length"),
        })
        .collect();
    tree.finish(base);

    info!(
        algorithm = strategy.name(),
        taxa = n,
        nodes = tree.num_nodes(),
        "tree built"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmin_prefers_earliest_tie() {
        let scores = [[0.0, 1.0, 0.5], [1.0, 0.0, 0.5], [0.5, 0.5, 0.0]];
        assert_eq!(argmin_pair(3, |i, j| scores[i][j]), (0, 2));
        assert_eq!(argmin_pair(3, |_, _| 7.0), (0, 1));
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!("UPGMA".parse::<Algorithm>().unwrap(), Algorithm::Upgma);
        assert_eq!("fm".parse::<Algorithm>().unwrap().name(), "fm");
        assert!(matches!(
            "ml".parse::<Algorithm>(),
            Err(PhyloError::UnknownAlgorithm { .. })
        ));
    }
}
