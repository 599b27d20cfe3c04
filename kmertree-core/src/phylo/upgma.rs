use super::cluster::{argmin_pair, cluster, Clustering};
use super::distance::DistanceMatrix;
use super::tree::Tree;
use crate::error::PhyloResult;

/// Average-linkage clustering. Produces a rooted, ultrametric tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Upgma;

impl Upgma {
    fn cluster_size(dist: &DistanceMatrix, tree: &Tree, row: usize) -> f64 {
        tree.node(dist.row(row).id).size as f64
    }
}

impl Clustering for Upgma {
    fn name(&self) -> &'static str {
        "upgma"
    }

    fn select_pair(&self, dist: &DistanceMatrix, _tree: &Tree) -> (usize, usize) {
        argmin_pair(dist.n(), |i, j| dist.get(i, j))
    }

    fn branch_lengths(
        &self,
        dist: &DistanceMatrix,
        tree: &Tree,
        a: usize,
        b: usize,
    ) -> (f64, f64) {
        let half = dist.get(a, b) / 2.0;
        (
            half - tree.height(dist.row(a).id),
            half - tree.height(dist.row(b).id),
        )
    }

    fn merged_distance(
        &self,
        dist: &DistanceMatrix,
        tree: &Tree,
        a: usize,
        b: usize,
        k: usize,
        _la: f64,
        _lb: f64,
    ) -> f64 {
        let sa = Self::cluster_size(dist, tree, a);
        let sb = Self::cluster_size(dist, tree, b);
        (sa * dist.get(a, k) + sb * dist.get(b, k)) / (sa + sb)
    }

    fn base_lengths(&self, dist: &DistanceMatrix, tree: &Tree) -> Vec<f64> {
        let (la, lb) = self.branch_lengths(dist, tree, 0, 1);
        vec![la, lb]
    }
}

pub fn upgma(dist: &DistanceMatrix) -> PhyloResult<Tree> {
    cluster(&Upgma, dist)
}
