//! Seeded train/test split.

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg64;

/// Row indices of the two partitions, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a generator seeded from `seed` and takes the first
/// `ceil(test_fraction · n)` indices as the test partition.
///
/// The split is not stratified by event status.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Pcg64::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_test);
    Split {
        train,
        test: indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_round_test_up() {
        let split = train_test_split(11, 0.2, 42);
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);

        let split = train_test_split(10, 0.2, 42);
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn test_partitions_cover_all_rows() {
        let split = train_test_split(50, 0.2, 42);
        let mut all: Vec<_> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_seed_determines_split() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
        assert_ne!(
            train_test_split(50, 0.2, 42).test,
            train_test_split(50, 0.2, 43).test
        );
    }

    #[test]
    fn test_zero_fraction() {
        let split = train_test_split(5, 0.0, 1);
        assert!(split.test.is_empty());
        assert_eq!(split.train.len(), 5);
    }
}
