use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFunction {
    ReLU,
    /// Row-wise softmax.
    Softmax,
}

impl ActivationFunction {
    /// Applies the activation to a batch of pre-activations (one sample per row).
    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::ReLU => z.map(|x| if x < 0.0 { 0.0 } else { x }),
            ActivationFunction::Softmax => softmax_rows(z),
        }
    }

    /// Maps `∂L/∂a` to `∂L/∂z` given the cached pre-activations `z`.
    ///
    /// For `Softmax` this is the row-wise Jacobian product
    /// `p ⊙ (g - Σ g⊙p)` with `p = softmax(z)`.
    pub fn backprop(&self, z: &Matrix, grad: &Matrix) -> Matrix {
        match self {
            ActivationFunction::ReLU => {
                grad.hadamard(&z.map(|x| if x > 0.0 { 1.0 } else { 0.0 }))
            }
            ActivationFunction::Softmax => {
                let p = softmax_rows(z);
                let mut out = grad.hadamard(&p);
                for i in 0..out.rows {
                    let dot: f64 = out.row(i).iter().sum();
                    for (o, &pk) in out.row_mut(i).iter_mut().zip(p.row(i)) {
                        *o -= pk * dot;
                    }
                }
                out
            }
        }
    }

    /// ONNX operator implementing this activation.
    pub fn onnx_op(&self) -> &'static str {
        match self {
            ActivationFunction::ReLU => "Relu",
            ActivationFunction::Softmax => "Softmax",
        }
    }
}

/// Numerically stable softmax over each row.
fn softmax_rows(z: &Matrix) -> Matrix {
    let mut out = z.clone();
    for i in 0..out.rows {
        let row = out.row_mut(i);
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for x in row.iter_mut() {
            *x = (*x - max).exp();
            sum += *x;
        }
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
    out
}
