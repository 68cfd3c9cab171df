use serde::{Deserialize, Serialize};

/// Per-epoch training statistics emitted by `train_loop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Full-batch training loss, computed before this epoch's update.
    pub train_loss: f64,
    /// Test accuracy as a fraction in [0, 1], computed after this epoch's update.
    pub test_accuracy: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Progress notifications sent on `TrainConfig::progress_tx`.
///
/// Within an epoch `StepApplied` always precedes the matching `Epoch`.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainEvent {
    /// The optimizer has updated the parameters for this (1-based) epoch.
    StepApplied { epoch: usize },
    /// Evaluation of the updated parameters has finished.
    Epoch(EpochStats),
}

/// Loss and accuracy per epoch, indexed from 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub accuracy: Vec<f64>,
}

impl TrainingHistory {
    pub fn with_capacity(epochs: usize) -> Self {
        TrainingHistory {
            loss: Vec::with_capacity(epochs),
            accuracy: Vec::with_capacity(epochs),
        }
    }

    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn final_accuracy(&self) -> Option<f64> {
        self.accuracy.last().copied()
    }
}
