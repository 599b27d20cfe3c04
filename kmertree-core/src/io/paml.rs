//! Sequential PAML alignments, as written by `evolver` for simulation replicates.
//!
//! Each replicate is one block: a `ntaxa nsites` header followed by `ntaxa`
//! records. A record starts with the taxon name; its sites follow on the same
//! line and may continue on later lines until `nsites` characters are read.

use crate::error::{PhyloError, PhyloResult};
use crate::seq::record::SeqRecord;
use crate::seq::set::SequenceSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

struct PamlLines<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> PamlLines<R> {
    fn next_non_blank(&mut self) -> PhyloResult<Option<(usize, String)>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if !self.buf.trim().is_empty() {
                return Ok(Some((self.line_no, self.buf.trim().to_string())));
            }
        }
    }

    fn unexpected_eof(&self, msg: String) -> PhyloError {
        PhyloError::PamlFormat {
            msg,
            line: self.line_no,
        }
    }
}

fn parse_block_header(header: &str, line_no: usize) -> PhyloResult<(usize, usize)> {
    let mut fields = header.split_whitespace();
    let mut next_count = |what: &str| -> PhyloResult<usize> {
        fields
            .next()
            .and_then(|f| f.parse::<usize>().ok())
            .ok_or_else(|| PhyloError::PamlFormat {
                msg: format!("expected {what} in block header, found '{header}'"),
                line: line_no,
            })
    };
    let ntaxa = next_count("taxon count")?;
    let nsites = next_count("site count")?;
    if fields.any(|f| f.eq_ignore_ascii_case("I")) {
        return Err(PhyloError::PamlFormat {
            msg: "interleaved alignments are not supported".into(),
            line: line_no,
        });
    }
    if ntaxa == 0 {
        return Err(PhyloError::PamlFormat {
            msg: "block declares zero taxa".into(),
            line: line_no,
        });
    }
    Ok((ntaxa, nsites))
}

fn site_bytes(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.bytes().filter(|b| !b.is_ascii_whitespace())
}

pub fn read_paml_from_reader<R: BufRead>(
    reader: R,
    n_replicates: usize,
) -> PhyloResult<Vec<SequenceSet>> {
    if n_replicates == 0 {
        return Err(PhyloError::InvalidParameter {
            name: "n_replicates",
            msg: "must be at least 1".into(),
        });
    }

    let mut lines = PamlLines {
        reader,
        line_no: 0,
        buf: String::new(),
    };
    let mut replicates = Vec::with_capacity(n_replicates);

    while replicates.len() < n_replicates {
        let Some((header_line, header)) = lines.next_non_blank()? else {
            return Err(lines.unexpected_eof(format!(
                "expected {} replicates, found {}",
                n_replicates,
                replicates.len()
            )));
        };
        let (ntaxa, nsites) = parse_block_header(&header, header_line)?;

        let mut records = Vec::with_capacity(ntaxa);
        for _ in 0..ntaxa {
            let Some((_, line)) = lines.next_non_blank()? else {
                return Err(lines.unexpected_eof(format!(
                    "block at line {header_line} ends after {} of {ntaxa} taxa",
                    records.len()
                )));
            };
            let (name, rest) = match line.find(char::is_whitespace) {
                Some(idx) => (&line[..idx], &line[idx..]),
                None => (line.as_str(), ""),
            };
            let mut seq: Vec<u8> = site_bytes(rest).collect();
            while seq.len() < nsites {
                let Some((_, more)) = lines.next_non_blank()? else {
                    return Err(lines.unexpected_eof(format!(
                        "sequence '{name}' ends after {} of {nsites} sites",
                        seq.len()
                    )));
                };
                seq.extend(site_bytes(&more));
            }
            if seq.len() != nsites {
                return Err(PhyloError::PamlFormat {
                    msg: format!("sequence '{name}' has {} sites, expected {nsites}", seq.len()),
                    line: lines.line_no,
                });
            }
            records.push(SeqRecord::new(name, seq));
        }

        replicates.push(SequenceSet::from_records(records));
    }

    Ok(replicates)
}

pub fn read_paml(path: impl AsRef<Path>, n_replicates: usize) -> PhyloResult<Vec<SequenceSet>> {
    let file = File::open(path)?;
    read_paml_from_reader(BufReader::new(file), n_replicates)
}

pub fn read_paml_from_bytes(data: &[u8], n_replicates: usize) -> PhyloResult<Vec<SequenceSet>> {
    read_paml_from_reader(BufReader::new(Cursor::new(data)), n_replicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_REPLICATES: &[u8] = b"  3  8\n\nalpha   ACGTACGT\nbeta    ACGTACGA\ngamma   ACGA\nACGA\n\n  3  8\n\nalpha   TTTTACGT\nbeta    ACGTACGA\ngamma   ACGAACGA\n";

    #[test]
    fn reads_requested_replicates() {
        let reps = read_paml_from_bytes(TWO_REPLICATES, 2).unwrap();
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[0].len(), 3);
        assert_eq!(reps[0].name(2), Some("gamma"));
        assert_eq!(reps[0].seq(2), Some(&b"ACGAACGA"[..]));
        assert_eq!(reps[1].seq(0), Some(&b"TTTTACGT"[..]));
    }

    #[test]
    fn reads_prefix_of_replicates() {
        let reps = read_paml_from_bytes(TWO_REPLICATES, 1).unwrap();
        assert_eq!(reps.len(), 1);
    }

    #[test]
    fn too_few_replicates() {
        let err = read_paml_from_bytes(TWO_REPLICATES, 3).unwrap_err();
        match err {
            PhyloError::PamlFormat { msg, .. } => {
                assert_eq!(msg, "expected 3 replicates, found 2")
            }
            other => panic!("expected paml format error, got {other:?}"),
        }
    }

    #[test]
    fn overlong_sequence_rejected() {
        let err = read_paml_from_bytes(b"2 4\na ACGTA\nb ACGT\n", 1).unwrap_err();
        match err {
            PhyloError::PamlFormat { line: 2, .. } => {}
            other => panic!("expected paml format error, got {other:?}"),
        }
    }

    #[test]
    fn bad_header_rejected() {
        assert!(read_paml_from_bytes(b"x 4\na ACGT\n", 1).is_err());
        assert!(read_paml_from_bytes(b"2 4 I\na ACGT\nb ACGT\n", 1).is_err());
    }

    #[test]
    fn zero_replicates_is_invalid() {
        let err = read_paml_from_bytes(TWO_REPLICATES, 0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }
}
