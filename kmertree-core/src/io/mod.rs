pub mod csv;
pub mod detect;
pub mod fasta;
pub mod paml;

use crate::error::PhyloResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write each entry of `lines` followed by a newline, replacing any existing file.
pub fn write_lines<S: AsRef<str>>(path: impl AsRef<Path>, lines: &[S]) -> PhyloResult<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    for line in lines {
        out.write_all(line.as_ref().as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_lines_terminates_each_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trees.nwk");
        write_lines(&path, &["(A:1,B:1);", "(A:2,B:2);"]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "(A:1,B:1);\n(A:2,B:2);\n");
    }
}
