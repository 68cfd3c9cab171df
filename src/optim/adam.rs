use serde::{Deserialize, Serialize};

use crate::{
    math::matrix::Matrix,
    network::network::{Gradients, Network},
};

/// Hyperparameters of [`Adam`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta_1: f64,
    pub beta_2: f64,
    /// A value required for numerical stability.
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        AdamConfig {
            learning_rate: 1e-3,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Adam optimizer as described in the paper
/// [Adam: A Method for Stochastic Optimization](https://arxiv.org/pdf/1412.6980.pdf).
///
/// Moment estimates are kept per parameter tensor (weights and biases of
/// every layer) and created lazily on the first step.
pub struct Adam {
    config: AdamConfig,
    states: Vec<AdaptiveMomentumState>,
}

#[derive(Debug, Clone)]
struct AdaptiveMomentumState {
    time: i32,
    moment_1: Matrix,
    moment_2: Matrix,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Adam {
        Adam { config, states: Vec::new() }
    }

    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> usize {
        self.states.first().map_or(0, |s| s.time as usize)
    }

    /// Applies one update to every parameter of `network` in place.
    ///
    /// # Panics
    /// Panics if `grads` does not match the network's layout.
    pub fn step(&mut self, network: &mut Network, grads: &Gradients) {
        assert_eq!(
            network.layers.len(),
            grads.layers.len(),
            "gradients do not match the network"
        );

        if self.states.is_empty() {
            self.states = grads
                .layers
                .iter()
                .flat_map(|g| [&g.weights, &g.biases])
                .map(AdaptiveMomentumState::zeros_like)
                .collect();
        }

        let params = network
            .layers
            .iter_mut()
            .flat_map(|layer| [&mut layer.weights, &mut layer.biases]);
        let grads = grads.layers.iter().flat_map(|g| [&g.weights, &g.biases]);

        for ((param, grad), state) in params.zip(grads).zip(self.states.iter_mut()) {
            state.update(param, grad, &self.config);
        }
    }
}

impl AdaptiveMomentumState {
    fn zeros_like(param: &Matrix) -> Self {
        AdaptiveMomentumState {
            time: 0,
            moment_1: Matrix::zeros(param.rows, param.cols),
            moment_2: Matrix::zeros(param.rows, param.cols),
        }
    }

    fn update(&mut self, param: &mut Matrix, grad: &Matrix, config: &AdamConfig) {
        self.time += 1;

        let correction_1 = 1.0 - config.beta_1.powi(self.time);
        let correction_2 = 1.0 - config.beta_2.powi(self.time);

        let values = param
            .as_mut_slice()
            .iter_mut()
            .zip(grad.as_slice())
            .zip(self.moment_1.as_mut_slice().iter_mut())
            .zip(self.moment_2.as_mut_slice().iter_mut());

        for (((p, &g), m), v) in values {
            *m = config.beta_1 * *m + (1.0 - config.beta_1) * g;
            *v = config.beta_2 * *v + (1.0 - config.beta_2) * g * g;

            let m_hat = *m / correction_1;
            let v_hat = *v / correction_2;

            *p -= config.learning_rate * m_hat / (v_hat.sqrt() + config.epsilon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiny_network() -> Network {
        let mut rng = StdRng::seed_from_u64(9);
        Network::new(vec![(2, 2, ActivationFunction::Softmax)], &mut rng)
    }

    fn constant_gradients(network: &Network, value: f64) -> Gradients {
        let mut grads = Gradients::zeros_like(network);
        for g in &mut grads.layers {
            g.weights = g.weights.map(|_| value);
            g.biases = g.biases.map(|_| value);
        }
        grads
    }

    #[test]
    fn first_step_moves_each_parameter_by_learning_rate() {
        let mut network = tiny_network();
        let before = network.layers[0].weights.clone();
        let grads = constant_gradients(&network, 0.37);

        let mut adam = Adam::new(AdamConfig::default());
        adam.step(&mut network, &grads);

        // With bias correction the first update is lr * g / (|g| + eps).
        let expected = 1e-3 * 0.37 / (0.37 + 1e-8);
        for (b, a) in before.as_slice().iter().zip(network.layers[0].weights.as_slice()) {
            assert!(((b - a) - expected).abs() < 1e-12);
        }
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn matches_reference_update_over_several_steps() {
        let mut network = tiny_network();
        let start = network.layers[0].biases.get(0, 0);
        let config = AdamConfig { learning_rate: 0.1, ..AdamConfig::default() };
        let mut adam = Adam::new(config);

        let schedule = [1.0, -0.5, 0.25];
        let (mut m, mut v, mut p) = (0.0f64, 0.0f64, start);
        for (t, &g) in schedule.iter().enumerate() {
            let grads = constant_gradients(&network, g);
            adam.step(&mut network, &grads);

            let t = t as i32 + 1;
            m = 0.9 * m + 0.1 * g;
            v = 0.999 * v + 0.001 * g * g;
            let m_hat = m / (1.0 - 0.9f64.powi(t));
            let v_hat = v / (1.0 - 0.999f64.powi(t));
            p -= 0.1 * m_hat / (v_hat.sqrt() + 1e-8);
        }

        assert!((network.layers[0].biases.get(0, 0) - p).abs() < 1e-12);
        assert_eq!(adam.steps(), 3);
    }

    #[test]
    fn zero_gradient_leaves_parameters_unchanged() {
        let mut network = tiny_network();
        let before = network.layers[0].weights.clone();

        let mut adam = Adam::new(AdamConfig::default());
        let grads = Gradients::zeros_like(&network);
        adam.step(&mut network, &grads);

        assert_eq!(network.layers[0].weights, before);
    }
}
