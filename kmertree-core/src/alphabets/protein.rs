use crate::alphabets::Alphabet;

/// The 20 standard amino acids, upper case.
pub fn alphabet() -> Alphabet {
    Alphabet::new(&b"ARNDCEQGHILKMFPSTWYV"[..])
}
