use std::sync::mpsc;

use crate::train::epoch_stats::TrainEvent;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`        : number of full-batch updates; the loop always runs all of them
/// - `show_progress` : draw a progress bar on stderr
/// - `progress_tx`   : optional channel sender receiving a `TrainEvent` after
///                     each optimizer step and after each evaluation.  A
///                     dropped receiver is ignored.
pub struct TrainConfig {
    pub epochs: usize,
    pub show_progress: bool,
    pub progress_tx: Option<mpsc::Sender<TrainEvent>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with a visible progress bar and no channel.
    pub fn new(epochs: usize) -> Self {
        TrainConfig {
            epochs,
            show_progress: true,
            progress_tx: None,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<TrainEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }
}
