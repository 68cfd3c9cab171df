use rand::Rng;

use crate::{activation::activation::ActivationFunction, math::matrix::Matrix};

/// Fully-connected layer: `a = σ(x·W + b)` over a batch `x` (one sample per row).
#[derive(Debug)]
pub struct Layer {
    /// Shape `input_size x size`.
    pub weights: Matrix,
    /// Shape `1 x size`.
    pub biases: Matrix,
    pub activator: ActivationFunction,
    input: Matrix,
    pre_activation: Matrix, // z = xW + b, needed for the activation derivative
}

/// Parameter gradients of one layer, same shapes as the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl Layer {
    /// Creates a layer with weights and biases drawn from
    /// `U(-1/sqrt(input_size), 1/sqrt(input_size))`, the usual default for
    /// linear layers.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let bound = 1.0 / (input_size as f64).sqrt();

        Layer {
            weights: Matrix::uniform(input_size, size, bound, rng),
            biases: Matrix::uniform(1, size, bound, rng),
            activator: activation,
            input: Matrix::default(),
            pre_activation: Matrix::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.weights.cols
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// Forward pass that caches the input and pre-activations for `backward`.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights).add_row(&self.biases);
        let a = self.activator.apply(&z);
        self.input = input.clone();
        self.pre_activation = z;
        a
    }

    /// Forward pass without touching the backprop cache.
    pub fn infer(&self, input: &Matrix) -> Matrix {
        self.activator
            .apply(&(input * &self.weights).add_row(&self.biases))
    }

    /// Accumulates this layer's parameter gradients into `grads` and returns
    /// `∂L/∂x` for the previous layer.
    ///
    /// `grad_output` is `∂L/∂a` for this layer, one row per sample of the last
    /// `forward` batch.
    pub fn backward(&self, grad_output: &Matrix, grads: &mut LayerGradients) -> Matrix {
        let delta = self.activator.backprop(&self.pre_activation, grad_output);

        grads.weights = &grads.weights + &(&self.input.transpose() * &delta);
        grads.biases = &grads.biases + &delta.sum_rows();

        &delta * &self.weights.transpose()
    }
}

impl LayerGradients {
    pub fn zeros_like(layer: &Layer) -> LayerGradients {
        LayerGradients {
            weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            biases: Matrix::zeros(layer.biases.rows, layer.biases.cols),
        }
    }
}
