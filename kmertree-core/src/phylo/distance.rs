use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PhyloError, PhyloResult};

/// Relative tolerance used when checking symmetry of user-supplied matrices.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMethod {
    /// L2 distance between profiles.
    #[default]
    Euclidean,
    /// One minus the cosine similarity of the profiles.
    Cosine,
    /// L1 distance between profiles.
    Manhattan,
    /// Fractional common k-mer distance: `1 - sum(min(a, b)) / min(sum(a), sum(b))`.
    Kmer,
}

impl DistanceMethod {
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMethod::Euclidean => "euclidean",
            DistanceMethod::Cosine => "cosine",
            DistanceMethod::Manhattan => "manhattan",
            DistanceMethod::Kmer => "kmer",
        }
    }

    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMethod::Euclidean => euclidean(a, b),
            DistanceMethod::Cosine => cosine(a, b),
            DistanceMethod::Manhattan => manhattan(a, b),
            DistanceMethod::Kmer => shared_kmer(a, b),
        }
    }
}

impl FromStr for DistanceMethod {
    type Err = PhyloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(DistanceMethod::Euclidean),
            "cosine" => Ok(DistanceMethod::Cosine),
            "manhattan" => Ok(DistanceMethod::Manhattan),
            "kmer" => Ok(DistanceMethod::Kmer),
            _ => Err(PhyloError::UnknownDistanceMethod {
                name: s.to_string(),
            }),
        }
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    match (na == 0.0, nb == 0.0) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => (1.0 - dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 1.0),
    }
}

fn shared_kmer(a: &[f64], b: &[f64]) -> f64 {
    let mut shared = 0.0f64;
    let mut sa = 0.0f64;
    let mut sb = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        shared += x.min(y);
        sa += x;
        sb += y;
    }
    let denom = sa.min(sb);
    if denom <= 0.0 {
        return if sa == 0.0 && sb == 0.0 { 0.0 } else { 1.0 };
    }
    (1.0 - shared / denom).clamp(0.0, 1.0)
}

/// One row of a symmetric distance matrix.
///
/// `id` names the tree node the row stands for. Leaf rows carry their input
/// index; rows created by a merge carry the index of the new arena node.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRow {
    pub distances: Vec<f64>,
    pub sum: f64,
    pub id: usize,
}

impl DistanceRow {
    fn new(distances: Vec<f64>, id: usize) -> Self {
        let sum = distances.iter().sum();
        Self { distances, sum, id }
    }

    fn refresh_sum(&mut self) {
        self.sum = self.distances.iter().sum();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    labels: Vec<Box<str>>,
    rows: Vec<DistanceRow>,
}

impl DistanceMatrix {
    /// Build from a row-major `n * n` buffer, where `n` is the number of labels.
    pub fn new(labels: Vec<Box<str>>, data: Vec<f64>) -> PhyloResult<Self> {
        let n = labels.len();
        if data.len() != n * n {
            return Err(PhyloError::FlatLengthMismatch {
                len: data.len(),
                expected: n * n,
            });
        }
        let rows = if n == 0 {
            Vec::new()
        } else {
            data.chunks(n).map(|r| r.to_vec()).collect()
        };
        Self::from_rows(labels, rows)
    }

    /// Build from one distance list per taxon, validating shape and values.
    pub fn from_rows(labels: Vec<Box<str>>, mut rows: Vec<Vec<f64>>) -> PhyloResult<Self> {
        let n = rows.len();
        if labels.len() != n {
            return Err(PhyloError::LabelCountMismatch {
                labels: labels.len(),
                rows: n,
            });
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(PhyloError::NotSquare {
                    row: i,
                    len: row.len(),
                    expected: n,
                });
            }
            for (j, &value) in row.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(PhyloError::InvalidDistance { i, j, value });
                }
            }
            if row[i] != 0.0 {
                return Err(PhyloError::NonZeroDiagonal { i, value: row[i] });
            }
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let (dij, dji) = (rows[i][j], rows[j][i]);
                let scale = dij.abs().max(dji.abs()).max(1.0);
                if (dij - dji).abs() > SYMMETRY_TOLERANCE * scale {
                    return Err(PhyloError::Asymmetric { i, j, dij, dji });
                }
                // Absorb rounding noise so both halves agree exactly.
                let mean = 0.5 * (dij + dji);
                rows[i][j] = mean;
                rows[j][i] = mean;
            }
        }

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(id, distances)| DistanceRow::new(distances, id))
            .collect();
        Ok(Self { labels, rows })
    }

    pub fn n(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> &[Box<str>] {
        &self.labels
    }

    pub fn rows(&self) -> &[DistanceRow] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &DistanceRow {
        &self.rows[i]
    }

    pub fn ids(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.id).collect()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i].distances[j]
    }

    pub fn set(&mut self, i: usize, j: usize, val: f64) {
        self.rows[i].distances[j] = val;
        self.rows[j].distances[i] = val;
        self.rows[i].refresh_sum();
        self.rows[j].refresh_sum();
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.rows
            .iter()
            .flat_map(|r| r.distances.iter().copied())
            .collect()
    }

    /// Replace rows `a` and `b` by one row for node `id`.
    ///
    /// `distances` holds the new row's distance to every other row, in the
    /// order those rows keep after `a` and `b` are removed. The new row is
    /// appended last, so positions stay sorted by creation order.
    pub(crate) fn merge(&mut self, a: usize, b: usize, id: usize, distances: Vec<f64>) {
        assert!(a < b && b < self.n(), "merge rows out of order or range");
        assert_eq!(
            distances.len(),
            self.n() - 2,
            "merged row must have one distance per remaining row"
        );

        self.rows.remove(b);
        self.rows.remove(a);
        self.labels.remove(b);
        self.labels.remove(a);

        for (row, &d) in self.rows.iter_mut().zip(&distances) {
            row.distances.remove(b);
            row.distances.remove(a);
            row.distances.push(d);
            row.refresh_sum();
        }

        let mut own = distances;
        own.push(0.0);
        self.rows.push(DistanceRow::new(own, id));
        self.labels.push(Box::from(""));
    }
}

fn validate_frequencies(frequencies: &[Vec<f64>], labels: &[Box<str>]) -> PhyloResult<()> {
    let n = frequencies.len();
    if n < 2 {
        return Err(PhyloError::TooFewTaxa { n, min: 2 });
    }
    if labels.len() != n {
        return Err(PhyloError::LabelCountMismatch {
            labels: labels.len(),
            rows: n,
        });
    }
    let expected = frequencies[0].len();
    for (index, v) in frequencies.iter().enumerate() {
        if v.len() != expected {
            return Err(PhyloError::FrequencyLengthMismatch {
                index,
                len: v.len(),
                expected,
            });
        }
    }
    Ok(())
}

/// Pairwise distances between k-mer profiles, one row per profile in input order.
pub fn distance_matrix(
    frequencies: &[Vec<f64>],
    labels: Vec<Box<str>>,
    method: DistanceMethod,
) -> PhyloResult<DistanceMatrix> {
    validate_frequencies(frequencies, &labels)?;
    let n = frequencies.len();

    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    let results: Vec<(usize, usize, f64)> = par_map!(&pairs, |&(i, j)| {
        (i, j, method.distance(&frequencies[i], &frequencies[j]))
    });

    let mut data = vec![vec![0.0f64; n]; n];
    for (i, j, d) in results {
        data[i][j] = d;
        data[j][i] = d;
    }
    debug!(taxa = n, method = method.name(), "distance matrix built");

    DistanceMatrix::from_rows(labels, data)
}
