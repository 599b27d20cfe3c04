use crate::alphabets::Alphabet;

/// Unambiguous nucleotides, upper case.
pub fn alphabet() -> Alphabet {
    Alphabet::new(b"ACGT")
}
