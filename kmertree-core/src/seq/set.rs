use crate::error::{PhyloError, PhyloResult};
use crate::seq::record::SeqRecord;

/// Index-aligned display names and raw sequences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceSet {
    names: Vec<Box<str>>,
    seqs: Vec<Vec<u8>>,
}

impl SequenceSet {
    pub fn new(names: Vec<Box<str>>, seqs: Vec<Vec<u8>>) -> PhyloResult<Self> {
        if names.len() != seqs.len() {
            return Err(PhyloError::SequenceCountMismatch {
                names: names.len(),
                seqs: seqs.len(),
            });
        }
        Ok(Self { names, seqs })
    }

    pub fn from_records(records: Vec<SeqRecord>) -> Self {
        let mut names = Vec::with_capacity(records.len());
        let mut seqs = Vec::with_capacity(records.len());
        for record in records {
            names.push(record.id);
            seqs.push(record.seq);
        }
        Self { names, seqs }
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn names(&self) -> &[Box<str>] {
        &self.names
    }

    pub fn seqs(&self) -> &[Vec<u8>] {
        &self.seqs
    }

    pub fn name(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(|s| s.as_ref())
    }

    pub fn seq(&self, i: usize) -> Option<&[u8]> {
        self.seqs.get(i).map(|s| s.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.names
            .iter()
            .map(|n| n.as_ref())
            .zip(self.seqs.iter().map(|s| s.as_slice()))
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.seqs.iter().map(|s| s.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lengths_rejected() {
        let err = SequenceSet::new(vec!["a".into()], vec![b"AC".to_vec(), b"GT".to_vec()])
            .unwrap_err();
        match err {
            PhyloError::SequenceCountMismatch { names: 1, seqs: 2 } => {}
            other => panic!("expected count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn from_records_keeps_order() {
        let set = SequenceSet::from_records(vec![
            SeqRecord::new("x", b"AC".to_vec()),
            SeqRecord::new("y", b"GTT".to_vec()).with_desc("second"),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.name(1), Some("y"));
        assert_eq!(set.seq(0), Some(&b"AC"[..]));
        assert_eq!(set.lengths(), vec![2, 3]);
    }
}
