use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cluster::{argmin_pair, cluster, Clustering};
use super::distance::DistanceMatrix;
use super::tree::Tree;
use crate::error::{PhyloError, PhyloResult};

/// How neighbor-joining closes the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NjTermination {
    /// Stop at three subtrees and leave them as an unrooted base.
    #[default]
    Trifurcation,
    /// Join once more and root between the last two subtrees.
    Bifurcation,
}

impl FromStr for NjTermination {
    type Err = PhyloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trifurcation" => Ok(NjTermination::Trifurcation),
            "bifurcation" => Ok(NjTermination::Bifurcation),
            _ => Err(PhyloError::UnknownOption {
                what: "nj termination",
                name: s.to_string(),
                valid: "'trifurcation', 'bifurcation'",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborJoining {
    pub termination: NjTermination,
}

impl Clustering for NeighborJoining {
    fn name(&self) -> &'static str {
        "nj"
    }

    fn min_taxa(&self) -> usize {
        3
    }

    fn base_size(&self) -> usize {
        match self.termination {
            NjTermination::Trifurcation => 3,
            NjTermination::Bifurcation => 2,
        }
    }

    fn select_pair(&self, dist: &DistanceMatrix, _tree: &Tree) -> (usize, usize) {
        let r = dist.n() as f64;
        argmin_pair(dist.n(), |i, j| {
            (r - 2.0) * dist.get(i, j) - dist.row(i).sum - dist.row(j).sum
        })
    }

    fn branch_lengths(
        &self,
        dist: &DistanceMatrix,
        _tree: &Tree,
        a: usize,
        b: usize,
    ) -> (f64, f64) {
        let r = dist.n() as f64;
        let dab = dist.get(a, b);
        let la = 0.5 * dab + (dist.row(a).sum - dist.row(b).sum) / (2.0 * (r - 2.0));
        (la, dab - la)
    }

    fn merged_distance(
        &self,
        dist: &DistanceMatrix,
        _tree: &Tree,
        a: usize,
        b: usize,
        k: usize,
        _la: f64,
        _lb: f64,
    ) -> f64 {
        (dist.get(a, k) + dist.get(b, k) - dist.get(a, b)) / 2.0
    }

    fn base_lengths(&self, dist: &DistanceMatrix, _tree: &Tree) -> Vec<f64> {
        match dist.n() {
            3 => (0..3)
                .map(|x| {
                    let (y, z) = ((x + 1) % 3, (x + 2) % 3);
                    (dist.get(x, y) + dist.get(x, z) - dist.get(y, z)) / 2.0
                })
                .collect(),
            _ => {
                let half = dist.get(0, 1) / 2.0;
                vec![half, half]
            }
        }
    }
}

/// Neighbor-joining tree of `dist`. Needs at least three taxa.
pub fn neighbor_joining(dist: &DistanceMatrix, termination: NjTermination) -> PhyloResult<Tree> {
    cluster(&NeighborJoining { termination }, dist)
}
