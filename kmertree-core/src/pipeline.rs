//! End-to-end drivers: sequences or matrices in, Newick out.

use std::path::Path;

use tracing::info;

use crate::config::TreeConfig;
use crate::error::PhyloResult;
use crate::io::fasta::read_fasta;
use crate::io::paml::read_paml;
use crate::phylo::{
    calculate_tree_fit, distance_matrix, fitch_margoliash, kmer_frequencies, neighbor_joining,
    random_distance_matrix, to_newick, upgma, Algorithm, DistanceMatrix, Tree,
};
use crate::seq::SequenceSet;

#[derive(Debug, Clone)]
pub struct TreeBuild {
    pub tree: Tree,
    pub newick: String,
    /// Weighted least-squares fit of the tree to the input matrix.
    pub fit: f64,
}

/// Run the configured algorithm on `dist`.
pub fn build_tree(dist: &DistanceMatrix, config: &TreeConfig) -> PhyloResult<TreeBuild> {
    config.validate()?;
    let tree = match config.algorithm {
        Algorithm::Nj => neighbor_joining(dist, config.nj_termination)?,
        Algorithm::Upgma => upgma(dist)?,
        Algorithm::Fm => fitch_margoliash(dist, &config.fm)?,
    };
    let fit = calculate_tree_fit(&tree, dist, config.fm.power)?;
    let newick = to_newick(&tree);
    info!(
        algorithm = config.algorithm.name(),
        taxa = dist.n(),
        fit,
        "tree ready"
    );
    Ok(TreeBuild { tree, newick, fit })
}

/// k-mer profile distances between the sequences of `set`.
pub fn sequence_distances(set: &SequenceSet, config: &TreeConfig) -> PhyloResult<DistanceMatrix> {
    config.validate()?;
    let freqs = kmer_frequencies(set, &config.kmer)?;
    distance_matrix(&freqs, set.names().to_vec(), config.method)
}

pub fn sequences_to_newick(set: &SequenceSet, config: &TreeConfig) -> PhyloResult<String> {
    let dist = sequence_distances(set, config)?;
    Ok(build_tree(&dist, config)?.newick)
}

pub fn fasta_to_newick(path: impl AsRef<Path>, config: &TreeConfig) -> PhyloResult<String> {
    let set = read_fasta(path)?;
    sequences_to_newick(&set, config)
}

/// One Newick string per replicate, in file order.
pub fn paml_to_newick(
    path: impl AsRef<Path>,
    n_replicates: usize,
    config: &TreeConfig,
) -> PhyloResult<Vec<String>> {
    let replicates = read_paml(path, n_replicates)?;
    par_try_map!(&replicates, |set: &SequenceSet| sequences_to_newick(set, config))
}

/// Tree over a seeded random matrix, for benchmarking.
pub fn random_newick_tree(n: usize, seed: u64, config: &TreeConfig) -> PhyloResult<String> {
    let dist = random_distance_matrix(n, seed)?;
    Ok(build_tree(&dist, config)?.newick)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, PhyloError};
    use crate::phylo::{parse_newick, DistanceMethod, NjTermination};

    const FASTA: &[u8] = b">human\nACGTACGTTTGACCA\n>chimp\nACGTACGTTTGACCT\n>mouse\nTTGACCAGGTACGAA\n>rat\nTTGACCAGGTACGTA\n";

    fn set() -> SequenceSet {
        crate::io::fasta::read_fasta_from_bytes(FASTA).unwrap()
    }

    #[test]
    fn every_algorithm_names_every_taxon() {
        for algorithm in [Algorithm::Nj, Algorithm::Upgma, Algorithm::Fm] {
            let config = TreeConfig {
                algorithm,
                ..TreeConfig::default()
            };
            let newick = sequences_to_newick(&set(), &config).unwrap();
            assert!(newick.ends_with(';'));
            let mut names = parse_newick(&newick).unwrap().leaf_names();
            names.sort();
            assert_eq!(names, vec!["chimp", "human", "mouse", "rat"]);
        }
    }

    #[test]
    fn close_sequences_pair_up() {
        let config = TreeConfig {
            algorithm: Algorithm::Upgma,
            method: DistanceMethod::Manhattan,
            ..TreeConfig::default()
        };
        let dist = sequence_distances(&set(), &config).unwrap();
        let build = build_tree(&dist, &config).unwrap();
        let tree = &build.tree;
        assert_eq!(tree.node(0).parent, tree.node(1).parent);
        assert_eq!(tree.node(2).parent, tree.node(3).parent);
        assert!(build.fit >= 0.0);
    }

    #[test]
    fn fasta_and_paml_files() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = dir.path().join("seqs.fa");
        std::fs::write(&fasta, FASTA).unwrap();
        let config = TreeConfig::default();
        let from_file = fasta_to_newick(&fasta, &config).unwrap();
        assert_eq!(from_file, sequences_to_newick(&set(), &config).unwrap());

        let paml = dir.path().join("reps.phy");
        std::fs::write(
            &paml,
            "3 8\na ACGTACGT\nb ACGTACGA\nc TTTTACGA\n\n3 8\na ACGTACGT\nb TTGTACGT\nc TTGTACGA\n",
        )
        .unwrap();
        let lines = paml_to_newick(&paml, 2, &config).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.ends_with(';')));
    }

    #[test]
    fn random_trees_are_reproducible() {
        let config = TreeConfig {
            nj_termination: NjTermination::Bifurcation,
            ..TreeConfig::default()
        };
        let a = random_newick_tree(8, 7, &config).unwrap();
        let b = random_newick_tree(8, 7, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(parse_newick(&a).unwrap().leaf_names().len(), 8);
    }

    #[test]
    fn too_few_sequences_is_a_dimension_error() {
        let one = SequenceSet::new(vec!["x".into()], vec![b"ACGT".to_vec()]).unwrap();
        let err = sequences_to_newick(&one, &TreeConfig::default()).unwrap_err();
        assert!(matches!(err, PhyloError::TooFewTaxa { .. }));
        assert_eq!(err.kind(), ErrorKind::Dimension);
    }
}
