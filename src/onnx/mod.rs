//! ONNX interchange: writing the trained classifier as an inference graph and
//! executing such graphs without the training code.

pub mod export;
pub mod runtime;

pub(crate) mod protos {
    include!(concat!(env!("OUT_DIR"), "/onnx-protos/mod.rs"));

    pub use self::onnx::*;
}

/// IR version written into exported models.
pub const IR_VERSION: i64 = 8;

/// Default-domain operator set the exported graphs target.
pub const OPSET_VERSION: i64 = 13;

pub use export::export_onnx;
pub use runtime::InferenceSession;
