/// Sequence-type auto-detection.
///
/// Rules (deterministic, not probabilistic):
/// - Contains any protein-only character (DEFHIKLMPQRSVWY) → Protein
/// - Contains U but not T → RNA
/// - Otherwise → DNA (the safe default)

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqType {
    Dna,
    Rna,
    Protein,
}

/// Characters that appear in protein sequences but never in DNA/RNA IUPAC alphabets.
const PROTEIN_ONLY: &[u8] = b"DEFHIKLMPQRSVWYdefhiklmpqrsvwy";

/// Detect the sequence type of a single sequence.
pub fn detect_seq_type(bytes: &[u8]) -> SeqType {
    detect_set_type(std::iter::once(bytes))
}

/// Detect one type for a whole collection, so every sequence is counted over the same alphabet.
///
/// Short-circuits on the first protein-only character in any sequence.
pub fn detect_set_type<'a, I>(seqs: I) -> SeqType
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut has_t = false;
    let mut has_u = false;

    for seq in seqs {
        for &b in seq {
            if PROTEIN_ONLY.contains(&b) {
                return SeqType::Protein;
            }
            match b {
                b'T' | b't' => has_t = true,
                b'U' | b'u' => has_u = true,
                _ => {}
            }
        }
    }

    if has_u && !has_t {
        SeqType::Rna
    } else {
        SeqType::Dna
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_protein() {
        assert_eq!(detect_seq_type(b"MFVFLVLLPLVSS"), SeqType::Protein);
        assert_eq!(detect_seq_type(b"acdefghiklm"), SeqType::Protein);
    }

    #[test]
    fn detect_rna_via_u() {
        assert_eq!(detect_seq_type(b"ACGU"), SeqType::Rna);
        assert_eq!(detect_seq_type(b"acgu"), SeqType::Rna);
    }

    #[test]
    fn detect_dna_ambiguous() {
        // Both T and U → defaults to DNA
        assert_eq!(detect_seq_type(b"ACGTU"), SeqType::Dna);
    }

    #[test]
    fn detect_empty() {
        assert_eq!(detect_seq_type(b""), SeqType::Dna);
    }

    #[test]
    fn set_detection_spans_sequences() {
        // T in one sequence and U in another is still DNA
        let seqs: Vec<&[u8]> = vec![b"ACGU", b"ACGT"];
        assert_eq!(detect_set_type(seqs), SeqType::Dna);

        let seqs: Vec<&[u8]> = vec![b"ACGU", b"GGCU"];
        assert_eq!(detect_set_type(seqs), SeqType::Rna);

        let seqs: Vec<&[u8]> = vec![b"ACGT", b"ACGTW"];
        assert_eq!(detect_set_type(seqs), SeqType::Protein);
    }
}
