use rand::Rng;

use crate::{
    activation::activation::ActivationFunction,
    layers::dense::{Layer, LayerGradients},
    loss::cross_entropy::CrossEntropyLoss,
    math::matrix::Matrix,
};

/// Number of input features of the Iris classifier.
pub const IRIS_FEATURES: usize = 4;
/// Width of both hidden layers of the Iris classifier.
pub const IRIS_HIDDEN: usize = 50;
/// Number of Iris classes.
pub const IRIS_CLASSES: usize = 3;

#[derive(Debug)]
pub struct Network {
    pub layers: Vec<Layer>,
}

/// Gradients for every layer of a `Network`, in layer order.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub layers: Vec<LayerGradients>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        layer_specs: Vec<(usize, usize, ActivationFunction)>,
        rng: &mut R,
    ) -> Network {
        let layers: Vec<Layer> = layer_specs
            .into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, &mut *rng))
            .collect();

        for pair in layers.windows(2) {
            assert_eq!(
                pair[0].size(),
                pair[1].input_size(),
                "layer widths do not chain"
            );
        }

        Network { layers }
    }

    /// The fixed Iris architecture: 4 → 50 (ReLU) → 50 (ReLU) → 3 (Softmax).
    pub fn iris_classifier<R: Rng + ?Sized>(rng: &mut R) -> Network {
        Network::new(
            vec![
                (IRIS_HIDDEN, IRIS_FEATURES, ActivationFunction::ReLU),
                (IRIS_HIDDEN, IRIS_HIDDEN, ActivationFunction::ReLU),
                (IRIS_CLASSES, IRIS_HIDDEN, ActivationFunction::Softmax),
            ],
            rng,
        )
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, Layer::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, Layer::size)
    }

    /// Forward pass; stores activations in each layer for backprop.
    ///
    /// # Panics
    /// Panics if `input` does not have `input_size()` columns.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        self.check_input(input);
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current);
        }
        current
    }

    /// Forward pass for evaluation; leaves the backprop cache untouched.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        self.check_input(input);
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.infer(&current);
        }
        current
    }

    /// Predicted class index per row.
    pub fn classify(&self, input: &Matrix) -> Vec<usize> {
        self.predict(input).argmax_rows()
    }

    /// Backpropagates `grad_output` (∂L/∂output of the last `forward`) through
    /// every layer, accumulating into `grads`.
    pub fn backward(&self, grad_output: &Matrix, grads: &mut Gradients) {
        let mut delta = grad_output.clone();
        for (layer, layer_grads) in self.layers.iter().zip(grads.layers.iter_mut()).rev() {
            delta = layer.backward(&delta, layer_grads);
        }
    }

    /// Runs forward + backward for a labelled batch and returns the mean
    /// cross-entropy together with freshly zeroed-then-accumulated gradients.
    pub fn loss_and_gradients(&mut self, inputs: &Matrix, labels: &[usize]) -> (f64, Gradients) {
        let output = self.forward(inputs);
        let loss = CrossEntropyLoss::loss(&output, labels);

        let mut grads = Gradients::zeros_like(self);
        self.backward(&CrossEntropyLoss::derivative(&output, labels), &mut grads);

        (loss, grads)
    }

    fn check_input(&self, input: &Matrix) {
        if input.cols != self.input_size() {
            panic!(
                "network expects {} input features, got {}",
                self.input_size(),
                input.cols
            );
        }
    }
}

impl Gradients {
    pub fn zeros_like(network: &Network) -> Gradients {
        Gradients {
            layers: network.layers.iter().map(LayerGradients::zeros_like).collect(),
        }
    }
}
