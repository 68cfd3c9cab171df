use crate::math::matrix::Matrix;

/// Categorical cross-entropy over the network output, which is treated as a
/// row of logits: `L_n = logsumexp(out_n) - out_n[label_n]`.
///
/// The classifier's output layer is already a Softmax, so the probabilities
/// go through a second softmax inside the loss. With probabilities in [0, 1]
/// the loss therefore never drops below `ln(C - 1 + e) - 1` for `C` classes.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Mean cross-entropy over the batch:
    ///   L = (1/N) * sum_n (logsumexp(output[n]) - output[n][labels[n]])
    ///
    /// `output` : network output, shape [N, n_classes]
    /// `labels` : class index per row, length N
    pub fn loss(output: &Matrix, labels: &[usize]) -> f64 {
        assert_eq!(output.rows, labels.len(), "one label per row");
        let n = labels.len() as f64;
        labels
            .iter()
            .enumerate()
            .map(|(i, &label)| log_sum_exp(output.row(i)) - output.get(i, label))
            .sum::<f64>()
            / n
    }

    /// Gradient of the mean loss w.r.t. the network output:
    ///   ∂L/∂out[n][k] = (softmax(out[n])[k] - onehot(labels[n])[k]) / N
    ///
    /// The output layer's Softmax backprop applies its Jacobian to this.
    pub fn derivative(output: &Matrix, labels: &[usize]) -> Matrix {
        assert_eq!(output.rows, labels.len(), "one label per row");
        let inv_n = 1.0 / labels.len() as f64;
        let mut grad = output.clone();
        for (i, &label) in labels.iter().enumerate() {
            let row = grad.row_mut(i);
            let lse = log_sum_exp(row);
            for x in row.iter_mut() {
                *x = (*x - lse).exp() * inv_n;
            }
            row[label] -= inv_n;
        }
        grad
    }
}

/// `ln(sum(exp(x)))`, shifted by the row maximum. NaN inputs yield NaN.
fn log_sum_exp(row: &[f64]) -> f64 {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::INFINITY {
        return max;
    }
    max + row.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}
