pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod data;
pub mod onnx;
pub mod dump;
pub mod bench;
pub mod config;
pub mod pipeline;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::network::Network;
pub use loss::cross_entropy::CrossEntropyLoss;
pub use optim::adam::{Adam, AdamConfig};
pub use train::loop_fn::train_loop;
pub use config::RunConfig;
pub use error::{Error, Result};
