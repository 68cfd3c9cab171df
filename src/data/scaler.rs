use crate::math::matrix::Matrix;

/// Per-feature standardization: `(x - mean) / std`, with the population
/// standard deviation. A constant feature keeps a scale of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(data: &Matrix) -> StandardScaler {
        assert!(data.rows > 0, "cannot fit a scaler on an empty matrix");
        let n = data.rows as f64;

        let mean: Vec<f64> = data.sum_rows().as_slice().iter().map(|s| s / n).collect();

        let mut variance = vec![0.0; data.cols];
        for i in 0..data.rows {
            for ((v, x), m) in variance.iter_mut().zip(data.row(i)).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }

        let scale = variance
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        StandardScaler { mean, scale }
    }

    pub fn transform(&self, data: &Matrix) -> Matrix {
        assert_eq!(data.cols, self.mean.len(), "scaler fitted on a different width");
        let mut out = data.clone();
        for i in 0..out.rows {
            for ((x, m), s) in out.row_mut(i).iter_mut().zip(&self.mean).zip(&self.scale) {
                *x = (*x - m) / s;
            }
        }
        out
    }

    pub fn fit_transform(data: &Matrix) -> (StandardScaler, Matrix) {
        let scaler = StandardScaler::fit(data);
        let scaled = scaler.transform(data);
        (scaler, scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::iris::IrisDataset;

    #[test]
    fn scaled_columns_have_zero_mean_unit_variance() {
        let iris = IrisDataset::load().unwrap();
        let (_, scaled) = StandardScaler::fit_transform(iris.features());

        let n = scaled.rows as f64;
        for j in 0..scaled.cols {
            let col: Vec<f64> = (0..scaled.rows).map(|i| scaled.get(i, j)).collect();
            let mean = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            assert!(mean.abs() < 1e-9);
            assert!((var - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_feature_is_only_centred() {
        let data = Matrix::from_data(vec![vec![2.0, 1.0], vec![2.0, 3.0]]);
        let (scaler, scaled) = StandardScaler::fit_transform(&data);

        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaled.as_slice(), &[0.0, -1.0, 0.0, 1.0]);
    }
}
