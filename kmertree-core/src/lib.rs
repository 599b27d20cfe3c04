#[macro_use]
mod par;

pub mod alphabets;
pub mod config;
pub mod error;
pub mod io;
pub mod phylo;
pub mod pipeline;
pub mod seq;

pub use config::TreeConfig;
pub use error::{ErrorKind, PhyloError, PhyloResult};
pub use pipeline::{build_tree, TreeBuild};
