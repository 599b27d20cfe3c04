pub mod dna;
pub mod protein;
pub mod rna;

use bit_set::BitSet;
use std::borrow::Borrow;
use vector_map::VecMap;

pub type SymbolRanks = VecMap<usize, u8>;

#[derive(Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Alphabet {
    pub symbols: BitSet,
}

impl Alphabet {
    pub fn new<C, T>(symbols: T) -> Self
    where
        C: Borrow<u8>,
        T: IntoIterator<Item = C>,
    {
        let mut s = BitSet::new();
        s.extend(symbols.into_iter().map(|c| *c.borrow() as usize));

        Alphabet { symbols: s }
    }

    pub fn insert(&mut self, a: u8) {
        self.symbols.insert(a as usize);
    }

    pub fn contains(&self, a: u8) -> bool {
        self.symbols.contains(a as usize)
    }

    pub fn is_word<C, T>(&self, text: T) -> bool
    where
        C: Borrow<u8>,
        T: IntoIterator<Item = C>,
    {
        text.into_iter()
            .all(|c| self.symbols.contains(*c.borrow() as usize))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in ascending byte order, which is also their rank order.
    pub fn symbols(&self) -> Vec<u8> {
        self.symbols.iter().map(|a| a as u8).collect()
    }

    pub fn union(&self, others: &Alphabet) -> Self {
        Alphabet {
            symbols: self.symbols.union(&others.symbols).collect(),
        }
    }
}

/// Maps each alphabet symbol to a dense rank in `0..alphabet.len()`.
#[derive(Default, Clone, Debug)]
pub struct RankTransform {
    pub ranks: SymbolRanks,
}

impl RankTransform {
    pub fn new(alphabet: &Alphabet) -> Self {
        let mut ranks = VecMap::new();
        for (r, c) in alphabet.symbols.iter().enumerate() {
            ranks.insert(c, r as u8);
        }
        RankTransform { ranks }
    }

    #[inline]
    pub fn get(&self, a: u8) -> Option<u8> {
        self.ranks.get(&(a as usize)).copied()
    }

    pub fn size(&self) -> usize {
        self.ranks.len()
    }

    /// Dense codes of every length-`k` window of `text` made only of alphabet symbols.
    ///
    /// A window's code is its base-`size()` value, so codes fall in `0..size()^k`.
    /// Windows touching a symbol outside the alphabet are skipped.
    pub fn kmers<C, T>(&self, k: u32, text: T) -> Kmers<'_, C, T::IntoIter>
    where
        C: Borrow<u8>,
        T: IntoIterator<Item = C>,
    {
        assert!(k > 0, "Expecting k-mer length to be larger than 0.");
        let modulus = self
            .size()
            .checked_pow(k)
            .expect("Expecting size^k to fit in usize");

        Kmers {
            text: text.into_iter(),
            ranks: self,
            k: k as usize,
            size: self.size(),
            modulus,
            code: 0,
            filled: 0,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Kmers<'a, C, T>
where
    C: Borrow<u8>,
    T: Iterator<Item = C>,
{
    text: T,
    ranks: &'a RankTransform,
    k: usize,
    size: usize,
    modulus: usize,
    code: usize,
    filled: usize,
}

impl<'a, C, T> Iterator for Kmers<'a, C, T>
where
    C: Borrow<u8>,
    T: Iterator<Item = C>,
{
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        loop {
            let a = *self.text.next()?.borrow();
            match self.ranks.get(a) {
                Some(r) => {
                    self.code = (self.code * self.size + r as usize) % self.modulus;
                    if self.filled < self.k {
                        self.filled += 1;
                    }
                    if self.filled == self.k {
                        return Some(self.code);
                    }
                }
                None => {
                    self.code = 0;
                    self.filled = 0;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.text.size_hint().1)
    }
}
