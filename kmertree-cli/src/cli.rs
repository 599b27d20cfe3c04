use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kmertree_core::phylo::{
    Algorithm, AlphabetChoice, DistanceMethod, NjTermination, Normalization, UnknownSymbols,
};
use kmertree_core::TreeConfig;

#[derive(Parser, Debug)]
#[command(
    name = "kmertree",
    version,
    about = "Distance-based phylogenetic trees from k-mer profiles",
    long_about = "kmertree turns sequences into k-mer frequency profiles, computes a pairwise \
                  distance matrix and clusters it into a Newick tree with neighbor-joining, \
                  UPGMA or Fitch-Margoliash."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a tree from a FASTA file
    Fasta(FastaArgs),

    /// Build one tree per replicate of a PAML sequential alignment file
    Paml(PamlArgs),

    /// Build a tree from a labeled CSV distance matrix
    Matrix(MatrixArgs),

    /// Build a tree from a seeded random distance matrix
    Random(RandomArgs),
}

#[derive(Args, Debug)]
pub struct FastaArgs {
    /// Input FASTA file
    #[arg(value_name = "FASTA")]
    pub input: PathBuf,

    /// Also save the computed distance matrix as CSV
    #[arg(long, value_name = "CSV")]
    pub matrix_out: Option<PathBuf>,

    #[command(flatten)]
    pub tree: TreeArgs,
}

#[derive(Args, Debug)]
pub struct PamlArgs {
    /// Input PAML file
    #[arg(value_name = "PAML")]
    pub input: PathBuf,

    /// Number of replicate alignments to read
    #[arg(short = 'r', long, default_value = "1")]
    pub replicates: usize,

    #[command(flatten)]
    pub tree: TreeArgs,
}

#[derive(Args, Debug)]
pub struct MatrixArgs {
    /// Input CSV distance matrix (header row and first column hold labels)
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    #[command(flatten)]
    pub tree: TreeArgs,
}

#[derive(Args, Debug)]
pub struct RandomArgs {
    /// Number of taxa
    #[arg(short = 'n', long, default_value = "10")]
    pub taxa: usize,

    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub seed: u64,

    /// Also save the generated distance matrix as CSV
    #[arg(long, value_name = "CSV")]
    pub matrix_out: Option<PathBuf>,

    #[command(flatten)]
    pub tree: TreeArgs,
}

/// Options shared by every subcommand. Unset flags fall back to `--config`,
/// then to the library defaults.
#[derive(Args, Debug, Default)]
pub struct TreeArgs {
    /// Output Newick file (stdout if omitted)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// TOML run configuration
    #[arg(long, value_name = "PATH", env = "KMERTREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// k-mer length
    #[arg(short, long = "kmer", value_name = "K")]
    pub k: Option<usize>,

    /// Distance method: euclidean, cosine, manhattan, kmer
    #[arg(short, long)]
    pub method: Option<DistanceMethod>,

    /// Clustering algorithm: nj, upgma, fm
    #[arg(short, long)]
    pub algorithm: Option<Algorithm>,

    /// How neighbor-joining closes the tree: trifurcation, bifurcation
    #[arg(long)]
    pub nj_termination: Option<NjTermination>,

    /// k-mer vector normalization: counts, frequencies
    #[arg(long)]
    pub normalize: Option<Normalization>,

    /// Symbols outside the alphabet: skip, widen
    #[arg(long)]
    pub unknown: Option<UnknownSymbols>,

    /// Sequence alphabet: auto, dna, rna, protein
    #[arg(long)]
    pub alphabet: Option<AlphabetChoice>,
}

impl TreeArgs {
    pub fn resolve(&self) -> anyhow::Result<TreeConfig> {
        let mut config = match &self.config {
            Some(path) => TreeConfig::from_path(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TreeConfig::default(),
        };
        if let Some(k) = self.k {
            config.kmer.k = k;
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(termination) = self.nj_termination {
            config.nj_termination = termination;
        }
        if let Some(normalization) = self.normalize {
            config.kmer.normalization = normalization;
        }
        if let Some(unknown) = self.unknown {
            config.kmer.unknown = unknown;
        }
        if let Some(alphabet) = self.alphabet {
            config.kmer.alphabet = alphabet;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fasta_flags() {
        let cli = Cli::try_parse_from([
            "kmertree", "-vv", "fasta", "seqs.fa", "-k", "4", "-m", "cosine", "-a", "UPGMA",
            "-o", "out.nwk",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Fasta(args) = cli.command else {
            panic!("expected fasta subcommand");
        };
        assert_eq!(args.input, PathBuf::from("seqs.fa"));
        let config = args.tree.resolve().unwrap();
        assert_eq!(config.kmer.k, 4);
        assert_eq!(config.method, DistanceMethod::Cosine);
        assert_eq!(config.algorithm, Algorithm::Upgma);
        assert_eq!(args.tree.output, Some(PathBuf::from("out.nwk")));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let err = Cli::try_parse_from(["kmertree", "random", "-a", "ml"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn missing_input_is_a_usage_error() {
        assert!(Cli::try_parse_from(["kmertree", "fasta"]).is_err());
        assert!(Cli::try_parse_from(["kmertree"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(&path, "algorithm = \"fm\"\n[kmer]\nk = 5\n").unwrap();
        let args = TreeArgs {
            config: Some(path),
            k: Some(2),
            ..TreeArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.algorithm, Algorithm::Fm);
        assert_eq!(config.kmer.k, 2);
    }

    #[test]
    fn zero_k_is_rejected() {
        let args = TreeArgs {
            k: Some(0),
            ..TreeArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
