pub mod epoch_stats;
pub mod train_config;
pub mod loop_fn;

pub use epoch_stats::{EpochStats, TrainEvent, TrainingHistory};
pub use train_config::TrainConfig;
pub use loop_fn::{compute_accuracy, train_loop};
