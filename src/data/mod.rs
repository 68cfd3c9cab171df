pub mod iris;
pub mod scaler;
pub mod split;

pub use iris::IrisDataset;
pub use scaler::StandardScaler;
pub use split::{train_test_split, Batch, Split};
