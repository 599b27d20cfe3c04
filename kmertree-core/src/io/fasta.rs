use crate::error::{PhyloError, PhyloResult};
use crate::seq::record::SeqRecord;
use crate::seq::set::SequenceSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

pub struct FastaRecords<R> {
    reader: R,
    line_no: usize,
    pending_header: Option<(String, usize)>,
    buf_line: String,
    seq_buf: Vec<u8>,
}

impl<R: BufRead> FastaRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            pending_header: None,
            buf_line: String::new(),
            seq_buf: Vec::new(),
        }
    }

    fn next_header(&mut self) -> Option<PhyloResult<(String, usize)>> {
        if let Some(pending) = self.pending_header.take() {
            return Some(Ok(pending));
        }

        loop {
            self.buf_line.clear();
            match self.reader.read_line(&mut self.buf_line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let line_no = self.line_no;
                    if self.buf_line.starts_with('>') {
                        return Some(Ok((self.buf_line.clone(), line_no)));
                    }
                    if self.buf_line.trim().is_empty() {
                        continue;
                    }
                    return Some(Err(PhyloError::FastaFormat {
                        msg: "expected header line starting with '>'",
                        line: line_no,
                    }));
                }
                Err(err) => return Some(Err(PhyloError::Io(err))),
            }
        }
    }
}

impl<R: BufRead> Iterator for FastaRecords<R> {
    type Item = PhyloResult<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let (header_line, header_line_no) = match self.next_header()? {
            Ok(header) => header,
            Err(err) => return Some(Err(err)),
        };

        let (id, desc) = match parse_header(&header_line, header_line_no) {
            Ok(parsed) => parsed,
            Err(err) => return Some(Err(err)),
        };

        self.seq_buf.clear();

        loop {
            self.buf_line.clear();
            match self.reader.read_line(&mut self.buf_line) {
                Ok(0) => break,
                Ok(_) => {
                    self.line_no += 1;
                    let line_no = self.line_no;
                    if self.buf_line.starts_with('>') {
                        self.pending_header = Some((self.buf_line.clone(), line_no));
                        break;
                    }
                    // ';' opens a comment line in classic FASTA
                    if self.buf_line.starts_with(';') {
                        continue;
                    }
                    for b in self.buf_line.bytes() {
                        if !b.is_ascii_whitespace() {
                            self.seq_buf.push(b);
                        }
                    }
                }
                Err(err) => return Some(Err(PhyloError::Io(err))),
            }
        }

        let capacity = self.seq_buf.capacity();
        let seq = std::mem::replace(&mut self.seq_buf, Vec::with_capacity(capacity));

        Some(Ok(SeqRecord { id, desc, seq }))
    }
}

pub fn fasta_records_from_reader<R: BufRead>(reader: R) -> FastaRecords<R> {
    FastaRecords::new(reader)
}

pub fn read_fasta_records_from_reader<R: BufRead>(reader: R) -> PhyloResult<Vec<SeqRecord>> {
    fasta_records_from_reader(reader).collect()
}

pub fn read_fasta_from_reader<R: BufRead>(reader: R) -> PhyloResult<SequenceSet> {
    let records = read_fasta_records_from_reader(reader)?;
    Ok(SequenceSet::from_records(records))
}

pub fn read_fasta(path: impl AsRef<Path>) -> PhyloResult<SequenceSet> {
    let file = File::open(path)?;
    read_fasta_from_reader(BufReader::new(file))
}

pub fn read_fasta_from_bytes(data: &[u8]) -> PhyloResult<SequenceSet> {
    read_fasta_from_reader(BufReader::new(Cursor::new(data)))
}

fn parse_header(header_line: &str, line_no: usize) -> PhyloResult<(Box<str>, Option<Box<str>>)> {
    let header = header_line.strip_prefix('>').ok_or(PhyloError::FastaFormat {
        msg: "expected header line starting with '>'",
        line: line_no,
    })?;

    let header = header.trim_end_matches(&['\n', '\r'][..]).trim_start();
    if header.is_empty() {
        return Err(PhyloError::FastaFormat {
            msg: "empty header",
            line: line_no,
        });
    }

    let (id, desc) = match header.find(|c: char| c.is_whitespace()) {
        Some(idx) => {
            let id = &header[..idx];
            let desc = header[idx..].trim();
            let desc = if desc.is_empty() { None } else { Some(desc) };
            (id, desc)
        }
        None => (header, None),
    };

    Ok((id.into(), desc.map(|s| s.into())))
}
