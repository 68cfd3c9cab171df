use std::io::Read;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Iris flower dataset, as distributed with [scikit-learn](https://scikit-learn.org/stable/).
/// See [Iris dataset](https://scikit-learn.org/stable/datasets/toy_dataset.html#iris-dataset).
///
/// 150 samples of 3 species (50 each), 4 measurements in centimetres per
/// sample. The CSV is compiled into the crate, so loading never touches the
/// filesystem or the network.
const IRIS_CSV: &str = include_str!("iris.csv");

pub const IRIS_SAMPLES: usize = 150;

pub const FEATURE_NAMES: [&str; 4] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];

pub const TARGET_NAMES: [&str; 3] = ["setosa", "versicolor", "virginica"];

#[derive(Debug, Deserialize)]
struct IrisRecord {
    sepal_length: f64,
    sepal_width: f64,
    petal_length: f64,
    petal_width: f64,
    species: usize,
}

/// Unscaled features (one sample per row) and class labels, in file order.
#[derive(Debug, Clone)]
pub struct IrisDataset {
    features: Matrix,
    labels: Vec<usize>,
}

impl IrisDataset {
    /// Loads the bundled dataset.
    pub fn load() -> Result<Self> {
        let dataset = Self::from_csv(IRIS_CSV.as_bytes())?;
        if dataset.len() != IRIS_SAMPLES {
            return Err(Error::InvalidDataset(format!(
                "expected {} samples, found {}",
                IRIS_SAMPLES,
                dataset.len()
            )));
        }
        Ok(dataset)
    }

    /// Parses Iris-formatted CSV (header row, four feature columns, integer
    /// `species` column).
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut data = Vec::new();
        let mut labels = Vec::new();
        for record in rdr.deserialize() {
            let record: IrisRecord = record?;
            if record.species >= TARGET_NAMES.len() {
                return Err(Error::InvalidDataset(format!(
                    "species index {} out of range",
                    record.species
                )));
            }
            data.extend([
                record.sepal_length,
                record.sepal_width,
                record.petal_length,
                record.petal_width,
            ]);
            labels.push(record.species);
        }

        if labels.is_empty() {
            return Err(Error::InvalidDataset("no samples".into()));
        }

        Ok(IrisDataset {
            features: Matrix::from_vec(labels.len(), FEATURE_NAMES.len(), data),
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &Matrix {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
}
