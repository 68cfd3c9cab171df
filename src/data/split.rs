use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Inputs (one sample per row) with their class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A train/test partition together with the source row of every sample.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Batch,
    pub test: Batch,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Shuffles the rows with a `seed`-ed RNG and puts the first
/// `ceil(test_ratio * n)` of them in the test set, the rest in the train set.
///
/// Fails with [`Error::InvalidDataset`] if the lengths disagree or the ratio
/// leaves either side empty.
pub fn train_test_split(
    inputs: &Matrix,
    labels: &[usize],
    test_ratio: f64,
    seed: u64,
) -> Result<Split> {
    if inputs.rows != labels.len() {
        return Err(Error::InvalidDataset(format!(
            "{} rows but {} labels",
            inputs.rows,
            labels.len()
        )));
    }
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(Error::InvalidDataset(format!(
            "test_ratio must be in (0, 1), got {test_ratio}"
        )));
    }

    let n = labels.len();
    let n_test = (test_ratio * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::InvalidDataset(format!(
            "test_ratio {test_ratio} splits {n} samples into {} train and {n_test} test",
            n.saturating_sub(n_test)
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let (test_indices, train_indices) = order.split_at(n_test);

    let gather = |indices: &[usize]| Batch {
        inputs: inputs.select_rows(indices),
        labels: indices.iter().map(|&i| labels[i]).collect(),
    };

    Ok(Split {
        train: gather(train_indices),
        test: gather(test_indices),
        train_indices: train_indices.to_vec(),
        test_indices: test_indices.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::iris::IrisDataset;
    use std::collections::HashSet;

    #[test]
    fn iris_split_is_80_20_disjoint_and_covering() {
        let iris = IrisDataset::load().unwrap();
        let split = train_test_split(iris.features(), iris.labels(), 0.2, 2).unwrap();

        assert_eq!(split.train.len(), 120);
        assert_eq!(split.test.len(), 30);

        let train: HashSet<_> = split.train_indices.iter().copied().collect();
        let test: HashSet<_> = split.test_indices.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.union(&test).count(), 150);
    }

    #[test]
    fn same_seed_gives_same_split() {
        let iris = IrisDataset::load().unwrap();
        let a = train_test_split(iris.features(), iris.labels(), 0.2, 2).unwrap();
        let b = train_test_split(iris.features(), iris.labels(), 0.2, 2).unwrap();
        let c = train_test_split(iris.features(), iris.labels(), 0.2, 3).unwrap();

        assert_eq!(a.test_indices, b.test_indices);
        assert_eq!(a.train, b.train);
        assert_ne!(a.test_indices, c.test_indices);
    }

    #[test]
    fn degenerate_ratios_are_rejected() {
        let iris = IrisDataset::load().unwrap();
        for ratio in [0.0, 1.0, -0.5, 1.5, f64::NAN, 0.999] {
            assert!(
                matches!(
                    train_test_split(iris.features(), iris.labels(), ratio, 2),
                    Err(Error::InvalidDataset(_))
                ),
                "ratio {ratio} accepted"
            );
        }
    }

    #[test]
    fn mismatched_labels_are_rejected() {
        let iris = IrisDataset::load().unwrap();
        assert!(matches!(
            train_test_split(iris.features(), &iris.labels()[..10], 0.2, 2),
            Err(Error::InvalidDataset(_))
        ));
    }

    #[test]
    fn rows_follow_their_labels() {
        let iris = IrisDataset::load().unwrap();
        let split = train_test_split(iris.features(), iris.labels(), 0.2, 2).unwrap();

        for (row, &src) in split.test_indices.iter().enumerate() {
            assert_eq!(split.test.inputs.row(row), iris.features().row(src));
            assert_eq!(split.test.labels[row], iris.labels()[src]);
        }
    }
}
