//! Run configuration, loadable from TOML.
//!
//! ```toml
//! method = "cosine"
//! algorithm = "fm"
//!
//! [kmer]
//! k = 4
//! unknown = "widen"
//!
//! [fm]
//! power = 1.0
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PhyloError, PhyloResult};
use crate::phylo::{Algorithm, DistanceMethod, FitchConfig, KmerConfig, NjTermination};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub method: DistanceMethod,
    pub algorithm: Algorithm,
    pub nj_termination: NjTermination,
    pub kmer: KmerConfig,
    pub fm: FitchConfig,
}

impl TreeConfig {
    pub fn from_toml_str(text: &str) -> PhyloResult<Self> {
        let config: TreeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> PhyloResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> PhyloResult<()> {
        if self.kmer.k == 0 {
            return Err(PhyloError::InvalidKmerLength { k: self.kmer.k });
        }
        self.fm.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::phylo::{AlphabetChoice, Normalization, UnknownSymbols};

    #[test]
    fn empty_file_gives_defaults() {
        let config = TreeConfig::from_toml_str("").unwrap();
        assert_eq!(config, TreeConfig::default());
        assert_eq!(config.kmer.k, 3);
        assert_eq!(config.algorithm, Algorithm::Nj);
        assert_eq!(config.nj_termination, NjTermination::Trifurcation);
    }

    #[test]
    fn partial_tables_keep_defaults() {
        let text = r#"
method = "cosine"
algorithm = "fm"
nj_termination = "bifurcation"

[kmer]
k = 4
normalization = "counts"
unknown = "widen"
alphabet = "protein"

[fm]
power = 1.0
"#;
        let config = TreeConfig::from_toml_str(text).unwrap();
        assert_eq!(config.method, DistanceMethod::Cosine);
        assert_eq!(config.algorithm, Algorithm::Fm);
        assert_eq!(config.nj_termination, NjTermination::Bifurcation);
        assert_eq!(config.kmer.k, 4);
        assert_eq!(config.kmer.normalization, Normalization::Counts);
        assert_eq!(config.kmer.unknown, UnknownSymbols::Widen);
        assert_eq!(config.kmer.alphabet, AlphabetChoice::Protein);
        assert_eq!(config.fm.power, 1.0);
        assert_eq!(config.fm.max_iterations, 100);
    }

    #[test]
    fn rejects_bad_values() {
        let err = TreeConfig::from_toml_str("[kmer]\nk = 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = TreeConfig::from_toml_str("[fm]\nmax_iterations = 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = TreeConfig::from_toml_str("algorithm = \"ml\"\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = TreeConfig {
            method: DistanceMethod::Kmer,
            algorithm: Algorithm::Upgma,
            ..TreeConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("method = \"kmer\""));
        assert_eq!(TreeConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.toml");
        std::fs::write(&path, "algorithm = \"upgma\"\n").unwrap();
        assert_eq!(TreeConfig::from_path(&path).unwrap().algorithm, Algorithm::Upgma);
        assert!(TreeConfig::from_path(dir.path().join("missing.toml")).is_err());
    }
}
