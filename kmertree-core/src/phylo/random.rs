use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::distance::DistanceMatrix;
use crate::error::PhyloResult;

/// Symmetric matrix of uniform values in `[1, 100)` with a zero diagonal,
/// labeled `"0".."n-1"`. Only meant for tests and benchmarks; the values have
/// no biological meaning.
pub fn random_distance_matrix(n: usize, seed: u64) -> PhyloResult<DistanceMatrix> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = rng.gen_range(1.0..100.0);
            rows[i][j] = d;
            rows[j][i] = d;
        }
    }
    let labels = (0..n).map(|i| i.to_string().into_boxed_str()).collect();
    DistanceMatrix::from_rows(labels, rows)
}
