use serde::{Deserialize, Serialize};

use crate::optim::adam::AdamConfig;
use crate::train::train_config::TrainConfig;

/// Everything that parameterizes one training run.
///
/// The binary always uses `RunConfig::default()`; the fields exist so tests
/// and library callers can shorten or reseed a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Fraction of samples held out for evaluation.
    pub test_ratio: f64,
    pub split_seed: u64,
    /// Seed for parameter initialization.
    pub init_seed: u64,
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            epochs: 100,
            learning_rate: 1e-3,
            test_ratio: 0.2,
            split_seed: 2,
            init_seed: 0,
            show_progress: true,
        }
    }
}

impl RunConfig {
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig::new(self.epochs).with_progress(self.show_progress)
    }

    pub fn adam_config(&self) -> AdamConfig {
        AdamConfig {
            learning_rate: self.learning_rate,
            ..AdamConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_reference_run() {
        let config = RunConfig::default();
        assert_eq!(config.epochs, 100);
        assert_eq!(config.adam_config().learning_rate, 0.001);
        assert_eq!(config.adam_config().beta_2, 0.999);
        assert_eq!(config.test_ratio, 0.2);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{ "epochs": 5 }"#).unwrap();
        assert_eq!(config.epochs, 5);
        assert_eq!(config.split_seed, RunConfig::default().split_seed);
    }
}
