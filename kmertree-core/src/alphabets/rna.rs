use crate::alphabets::Alphabet;

pub fn alphabet() -> Alphabet {
    Alphabet::new(b"ACGU")
}
