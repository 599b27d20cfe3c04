pub mod record;
pub mod set;

pub use record::SeqRecord;
pub use set::SequenceSet;
