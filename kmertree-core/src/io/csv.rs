//! Labeled square distance matrices in CSV.
//!
//! The header row holds the taxon labels after one leading cell; every
//! following row starts with its label and then holds one distance per column.

use crate::error::{PhyloError, PhyloResult};
use crate::phylo::distance::DistanceMatrix;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

pub fn read_distance_matrix_csv(path: impl AsRef<Path>) -> PhyloResult<DistanceMatrix> {
    let path_ref = path.as_ref();
    let path_str = path_ref.display().to_string();
    let file = File::open(path_ref)?;
    read_distance_matrix_from_reader(file, &path_str)
}

pub fn read_distance_matrix_from_reader<R: Read>(
    reader: R,
    path: &str,
) -> PhyloResult<DistanceMatrix> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PhyloError::CsvParse {
            path: path.to_string(),
            source: e,
        })?
        .clone();
    let labels: Vec<Box<str>> = headers.iter().skip(1).map(Box::from).collect();
    let n = labels.len();

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(n);
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| PhyloError::CsvParse {
            path: path.to_string(),
            source: e,
        })?;
        let row = row_idx + 1;
        rows.push(parse_row(&record, &labels, row, path)?);
    }

    if rows.len() != n {
        return Err(PhyloError::CsvMatrix {
            path: path.to_string(),
            row: rows.len(),
            msg: format!("found {} data rows for {} labels", rows.len(), n),
        });
    }

    DistanceMatrix::from_rows(labels, rows)
}

fn parse_row(
    record: &StringRecord,
    labels: &[Box<str>],
    row: usize,
    path: &str,
) -> PhyloResult<Vec<f64>> {
    let matrix_err = |msg: String| PhyloError::CsvMatrix {
        path: path.to_string(),
        row,
        msg,
    };

    let label = record.get(0).unwrap_or("");
    match labels.get(row - 1) {
        Some(expected) if &**expected == label => {}
        Some(expected) => {
            return Err(matrix_err(format!(
                "row label '{label}' does not match column label '{expected}'"
            )))
        }
        None => return Err(matrix_err("more rows than labels".into())),
    }

    if record.len() != labels.len() + 1 {
        return Err(matrix_err(format!(
            "expected {} distances, found {}",
            labels.len(),
            record.len().saturating_sub(1)
        )));
    }

    record
        .iter()
        .skip(1)
        .map(|field| {
            field
                .parse::<f64>()
                .map_err(|_| matrix_err(format!("'{field}' is not a number")))
        })
        .collect()
}

pub fn write_distance_matrix_csv(
    path: impl AsRef<Path>,
    matrix: &DistanceMatrix,
) -> PhyloResult<()> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref)?;
    write_distance_matrix_to_writer(file, matrix, &path_ref.display().to_string())
}

pub fn write_distance_matrix_to_writer<W: Write>(
    writer: W,
    matrix: &DistanceMatrix,
    path: &str,
) -> PhyloResult<()> {
    let csv_err = |e: csv::Error| PhyloError::CsvParse {
        path: path.to_string(),
        source: e,
    };
    let mut out = WriterBuilder::new().from_writer(writer);

    let mut header = vec![String::new()];
    header.extend(matrix.labels().iter().map(|l| l.to_string()));
    out.write_record(&header).map_err(csv_err)?;

    for (i, label) in matrix.labels().iter().enumerate() {
        let mut record = vec![label.to_string()];
        record.extend(matrix.row(i).distances.iter().map(|d| d.to_string()));
        out.write_record(&record).map_err(csv_err)?;
    }
    out.flush()?;
    Ok(())
}
