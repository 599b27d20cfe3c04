pub mod cluster;
pub mod distance;
pub mod fitch;
pub mod kmer;
pub mod newick;
pub mod nj;
pub mod random;
pub mod tree;
pub mod upgma;

pub use cluster::{cluster, Algorithm, Clustering};
pub use distance::{distance_matrix, DistanceMatrix, DistanceMethod, DistanceRow};
pub use fitch::{
    calculate_tree_fit, fitch_margoliash, optimize_branch_lengths, FitchConfig, FitchMargoliash,
    OptimizeReport,
};
pub use kmer::{
    kmer_frequencies, AlphabetChoice, KmerConfig, KmerCounter, Normalization, UnknownSymbols,
};
pub use newick::{parse_newick, to_newick, ParsedNode, ParsedTree};
pub use nj::{neighbor_joining, NeighborJoining, NjTermination};
pub use random::random_distance_matrix;
pub use tree::{Child, Tree, TreeNode};
pub use upgma::{upgma, Upgma};
