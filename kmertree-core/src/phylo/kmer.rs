//! Fixed-length k-mer profiles of sequences.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alphabets::{dna, protein, rna, Alphabet, RankTransform};
use crate::error::{PhyloError, PhyloResult};
use crate::io::detect::{detect_set_type, SeqType};
use crate::seq::SequenceSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Raw window counts.
    Counts,
    /// Counts divided by the number of counted windows.
    #[default]
    Frequencies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSymbols {
    /// Windows containing a symbol outside the alphabet are not counted.
    #[default]
    Skip,
    /// Every symbol seen in the input joins the alphabet.
    Widen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlphabetChoice {
    #[default]
    Auto,
    Dna,
    Rna,
    Protein,
}

impl FromStr for Normalization {
    type Err = PhyloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counts" => Ok(Normalization::Counts),
            "frequencies" => Ok(Normalization::Frequencies),
            _ => Err(PhyloError::UnknownOption {
                what: "normalization",
                name: s.to_string(),
                valid: "'counts', 'frequencies'",
            }),
        }
    }
}

impl FromStr for UnknownSymbols {
    type Err = PhyloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(UnknownSymbols::Skip),
            "widen" => Ok(UnknownSymbols::Widen),
            _ => Err(PhyloError::UnknownOption {
                what: "unknown-symbol policy",
                name: s.to_string(),
                valid: "'skip', 'widen'",
            }),
        }
    }
}

impl FromStr for AlphabetChoice {
    type Err = PhyloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(AlphabetChoice::Auto),
            "dna" => Ok(AlphabetChoice::Dna),
            "rna" => Ok(AlphabetChoice::Rna),
            "protein" => Ok(AlphabetChoice::Protein),
            _ => Err(PhyloError::UnknownOption {
                what: "alphabet",
                name: s.to_string(),
                valid: "'auto', 'dna', 'rna', 'protein'",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmerConfig {
    pub k: usize,
    pub normalization: Normalization,
    pub unknown: UnknownSymbols,
    pub alphabet: AlphabetChoice,
}

impl Default for KmerConfig {
    fn default() -> Self {
        Self {
            k: 3,
            normalization: Normalization::default(),
            unknown: UnknownSymbols::default(),
            alphabet: AlphabetChoice::default(),
        }
    }
}

#[inline]
fn is_gap(b: u8) -> bool {
    b == b'-' || b == b'.'
}

/// Upper-cased symbols of `seq` with gaps and whitespace removed.
fn cleaned(seq: &[u8]) -> impl Iterator<Item = u8> + '_ {
    seq.iter()
        .copied()
        .filter(|&b| !is_gap(b) && !b.is_ascii_whitespace())
        .map(|b| b.to_ascii_uppercase())
}

fn base_alphabet(choice: AlphabetChoice, set: &SequenceSet) -> Alphabet {
    let resolved = match choice {
        AlphabetChoice::Auto => match detect_set_type(set.seqs().iter().map(|s| s.as_slice())) {
            SeqType::Dna => AlphabetChoice::Dna,
            SeqType::Rna => AlphabetChoice::Rna,
            SeqType::Protein => AlphabetChoice::Protein,
        },
        other => other,
    };
    match resolved {
        AlphabetChoice::Rna => rna::alphabet(),
        AlphabetChoice::Protein => protein::alphabet(),
        _ => dna::alphabet(),
    }
}

/// Counts overlapping k-mers into dense vectors of length `|alphabet|^k`.
#[derive(Debug, Clone)]
pub struct KmerCounter {
    alphabet: Alphabet,
    transform: RankTransform,
    k: usize,
    dimension: usize,
    normalization: Normalization,
}

impl KmerCounter {
    /// Largest supported vector length.
    pub const MAX_DIMENSION: usize = 1 << 26;

    pub fn new(alphabet: Alphabet, k: usize, normalization: Normalization) -> PhyloResult<Self> {
        if k == 0 {
            return Err(PhyloError::InvalidKmerLength { k });
        }
        let dimension = u32::try_from(k)
            .ok()
            .and_then(|exp| alphabet.len().checked_pow(exp))
            .filter(|&d| d <= Self::MAX_DIMENSION)
            .ok_or(PhyloError::KmerSpaceTooLarge {
                alphabet: alphabet.len(),
                k,
                max: Self::MAX_DIMENSION,
            })?;

        Ok(Self {
            transform: RankTransform::new(&alphabet),
            alphabet,
            k,
            dimension,
            normalization,
        })
    }

    /// Build one counter for a whole set, resolving the alphabet from `config`.
    pub fn for_sequences(set: &SequenceSet, config: &KmerConfig) -> PhyloResult<Self> {
        let mut alphabet = base_alphabet(config.alphabet, set);
        if config.unknown == UnknownSymbols::Widen {
            for seq in set.seqs() {
                for b in cleaned(seq) {
                    alphabet.insert(b);
                }
            }
        }
        let counter = Self::new(alphabet, config.k, config.normalization)?;
        debug!(
            alphabet = counter.alphabet.len(),
            k = counter.k,
            dimension = counter.dimension,
            "k-mer counter ready"
        );
        Ok(counter)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn count(&self, seq: &[u8]) -> Vec<f64> {
        let mut counts = vec![0.0f64; self.dimension];
        let mut windows = 0usize;
        for code in self.transform.kmers(self.k as u32, cleaned(seq)) {
            counts[code] += 1.0;
            windows += 1;
        }

        if self.normalization == Normalization::Frequencies && windows > 0 {
            let total = windows as f64;
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        counts
    }

    /// The k-mer spelled by bin `code`.
    pub fn decode(&self, mut code: usize) -> String {
        let symbols = self.alphabet.symbols();
        let size = symbols.len();
        let mut word = vec![0u8; self.k];
        for slot in word.iter_mut().rev() {
            *slot = symbols[code % size];
            code /= size;
        }
        String::from_utf8_lossy(&word).into_owned()
    }
}

/// One k-mer vector per sequence of `set`, all of the same length.
pub fn kmer_frequencies(set: &SequenceSet, config: &KmerConfig) -> PhyloResult<Vec<Vec<f64>>> {
    let counter = KmerCounter::for_sequences(set, config)?;
    let vectors: Vec<Vec<f64>> = par_map!(set.seqs(), |seq: &Vec<u8>| counter.count(seq));
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts_config(k: usize) -> KmerConfig {
        KmerConfig {
            k,
            normalization: Normalization::Counts,
            unknown: UnknownSymbols::Skip,
            alphabet: AlphabetChoice::Dna,
        }
    }

    fn set_of(seqs: &[&[u8]]) -> SequenceSet {
        let names = (0..seqs.len()).map(|i| i.to_string().into()).collect();
        SequenceSet::new(names, seqs.iter().map(|s| s.to_vec()).collect()).unwrap()
    }

    #[test]
    fn homopolymer_fills_one_bin() {
        let set = set_of(&[b"AAAA"]);
        let vectors = kmer_frequencies(&set, &counts_config(2)).unwrap();
        assert_eq!(vectors[0].len(), 16);
        let nonzero: Vec<(usize, f64)> = vectors[0]
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, c)| *c != 0.0)
            .collect();
        assert_eq!(nonzero, vec![(0, 3.0)]);

        let counter = KmerCounter::for_sequences(&set, &counts_config(2)).unwrap();
        assert_eq!(counter.decode(0), "AA");
    }

    #[test]
    fn case_insensitive_and_gaps_removed() {
        let set = set_of(&[b"ac-gT", b"ACGT"]);
        let vectors = kmer_frequencies(&set, &counts_config(2)).unwrap();
        assert_eq!(vectors[0], vectors[1]);
    }

    #[test]
    fn short_sequence_yields_zero_vector() {
        let set = set_of(&[b"AC"]);
        let mut config = counts_config(3);
        config.normalization = Normalization::Frequencies;
        let vectors = kmer_frequencies(&set, &config).unwrap();
        assert_eq!(vectors[0].len(), 64);
        assert!(vectors[0].iter().all(|&c| c == 0.0));
    }

    #[test]
    fn frequencies_sum_to_one() {
        let set = set_of(&[b"ACGTTGCA"]);
        let mut config = counts_config(3);
        config.normalization = Normalization::Frequencies;
        let vectors = kmer_frequencies(&set, &config).unwrap();
        let total: f64 = vectors[0].iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn skip_policy_drops_unknown_windows() {
        let set = set_of(&[b"AANAA"]);
        let vectors = kmer_frequencies(&set, &counts_config(2)).unwrap();
        assert_eq!(vectors[0][0], 2.0);
        assert_eq!(vectors[0].iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn widen_policy_grows_alphabet_for_every_vector() {
        let set = set_of(&[b"AANAA", b"ACGT"]);
        let mut config = counts_config(1);
        config.unknown = UnknownSymbols::Widen;
        let vectors = kmer_frequencies(&set, &config).unwrap();
        assert_eq!(vectors[0].len(), 5);
        assert_eq!(vectors[1].len(), 5);
        // ranks: A C G N T
        assert_eq!(vectors[0], vec![4.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn auto_detects_protein() {
        let set = set_of(&[b"MKVLA", b"MKVIA"]);
        let mut config = counts_config(1);
        config.alphabet = AlphabetChoice::Auto;
        let counter = KmerCounter::for_sequences(&set, &config).unwrap();
        assert_eq!(counter.dimension(), 20);
    }

    #[test]
    fn zero_k_rejected() {
        let set = set_of(&[b"ACGT"]);
        let err = kmer_frequencies(&set, &counts_config(0)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn oversized_space_rejected() {
        let err = KmerCounter::new(protein::alphabet(), 8, Normalization::Counts).unwrap_err();
        match err {
            PhyloError::KmerSpaceTooLarge { alphabet: 20, k: 8, .. } => {}
            other => panic!("expected k-mer space error, got {other:?}"),
        }
    }

    #[test]
    fn option_names_parse() {
        assert_eq!("Counts".parse::<Normalization>().unwrap(), Normalization::Counts);
        assert_eq!("widen".parse::<UnknownSymbols>().unwrap(), UnknownSymbols::Widen);
        assert_eq!("RNA".parse::<AlphabetChoice>().unwrap(), AlphabetChoice::Rna);
        assert!("binary".parse::<AlphabetChoice>().is_err());
    }
}
