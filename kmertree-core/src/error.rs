use std::io;
use thiserror::Error;

/// Coarse classification of a [`PhyloError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Dimension,
    InvalidArgument,
    NumericDegeneracy,
    Io,
}

#[derive(Debug, Error)]
pub enum PhyloError {
    #[error("fasta format error at line {line}: {msg}")]
    FastaFormat { msg: &'static str, line: usize },

    #[error("paml format error at line {line}: {msg}")]
    PamlFormat { msg: String, line: usize },

    #[error("newick format error at byte {pos}: {msg}")]
    NewickFormat { msg: &'static str, pos: usize },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("sequence set length mismatch (names={names}, seqs={seqs})")]
    SequenceCountMismatch { names: usize, seqs: usize },

    #[error("csv parse error in {path}: {source}")]
    CsvParse {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("csv distance matrix error in {path} at row {row}: {msg}")]
    CsvMatrix {
        path: String,
        row: usize,
        msg: String,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("too few taxa: {n} (need at least {min})")]
    TooFewTaxa { n: usize, min: usize },

    #[error("distance matrix is not square: row {row} has {len} entries, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("distance matrix data length mismatch: expected {expected}, got {len}")]
    FlatLengthMismatch { len: usize, expected: usize },

    #[error("distance matrix is not symmetric at ({i}, {j}): {dij} != {dji}")]
    Asymmetric {
        i: usize,
        j: usize,
        dij: f64,
        dji: f64,
    },

    #[error("distance matrix diagonal entry ({i}, {i}) is {value}, expected 0")]
    NonZeroDiagonal { i: usize, value: f64 },

    #[error("distance matrix entry ({i}, {j}) is {value}, expected a finite non-negative value")]
    InvalidDistance { i: usize, j: usize, value: f64 },

    #[error("label count mismatch (labels={labels}, rows={rows})")]
    LabelCountMismatch { labels: usize, rows: usize },

    #[error("frequency vector {index} has length {len}, expected {expected}")]
    FrequencyLengthMismatch {
        index: usize,
        len: usize,
        expected: usize,
    },

    #[error("unknown distance method '{name}' (valid: 'euclidean', 'cosine', 'manhattan', 'kmer')")]
    UnknownDistanceMethod { name: String },

    #[error("unknown algorithm '{name}' (valid: 'nj', 'upgma', 'fm')")]
    UnknownAlgorithm { name: String },

    #[error("unknown {what} '{name}' (valid: {valid})")]
    UnknownOption {
        what: &'static str,
        name: String,
        valid: &'static str,
    },

    #[error("invalid k-mer length: {k} (must be at least 1)")]
    InvalidKmerLength { k: usize },

    #[error("k-mer space too large: alphabet of {alphabet} symbols with k={k} exceeds {max} bins")]
    KmerSpaceTooLarge { alphabet: usize, k: usize, max: usize },

    #[error("invalid parameter {name}: {msg}")]
    InvalidParameter { name: &'static str, msg: String },

    #[error("non-finite fit score {value} while {context}")]
    NonFiniteFit { value: f64, context: &'static str },
}

impl PhyloError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PhyloError::FastaFormat { .. }
            | PhyloError::PamlFormat { .. }
            | PhyloError::NewickFormat { .. }
            | PhyloError::SequenceCountMismatch { .. }
            | PhyloError::CsvParse { .. }
            | PhyloError::CsvMatrix { .. }
            | PhyloError::ConfigParse(_) => ErrorKind::Parse,
            PhyloError::Io(_) => ErrorKind::Io,
            PhyloError::TooFewTaxa { .. }
            | PhyloError::NotSquare { .. }
            | PhyloError::FlatLengthMismatch { .. }
            | PhyloError::Asymmetric { .. }
            | PhyloError::NonZeroDiagonal { .. }
            | PhyloError::LabelCountMismatch { .. }
            | PhyloError::FrequencyLengthMismatch { .. } => ErrorKind::Dimension,
            PhyloError::UnknownDistanceMethod { .. }
            | PhyloError::UnknownAlgorithm { .. }
            | PhyloError::UnknownOption { .. }
            | PhyloError::InvalidKmerLength { .. }
            | PhyloError::KmerSpaceTooLarge { .. }
            | PhyloError::InvalidParameter { .. } => ErrorKind::InvalidArgument,
            PhyloError::InvalidDistance { .. } | PhyloError::NonFiniteFit { .. } => {
                ErrorKind::NumericDegeneracy
            }
        }
    }
}

pub type PhyloResult<T> = Result<T, PhyloError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_error_family() {
        let err = PhyloError::UnknownAlgorithm { name: "ml".into() };
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = PhyloError::Asymmetric {
            i: 0,
            j: 1,
            dij: 1.0,
            dji: 2.0,
        };
        assert_eq!(err.kind(), ErrorKind::Dimension);

        let err = PhyloError::FastaFormat {
            msg: "empty header",
            line: 3,
        };
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(err.to_string(), "fasta format error at line 3: empty header");
    }
}
