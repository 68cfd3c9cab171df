//! Inference benchmark over the exported artifacts: runs `model.onnx` on the
//! raw dataset dumps and reports wall-clock time and accuracy.

use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::data::iris::IRIS_SAMPLES;
use crate::dump::{read_f32_le, DATA_FILE, LABELS_FILE};
use crate::error::{Error, Result};
use crate::network::network::{IRIS_CLASSES, IRIS_FEATURES};
use crate::onnx::runtime::{InferenceSession, Tensor};
use crate::pipeline::MODEL_FILE;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub seconds: f64,
    /// Fraction of samples whose argmax prediction equals the stored label.
    pub accuracy: f64,
    pub samples: usize,
}

impl Display for BenchmarkResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Seconds: {:.2}, Accuracy: {:.2}%",
            self.seconds,
            self.accuracy * 100.0
        )
    }
}

pub struct InferenceBenchmark {
    session: InferenceSession,
    data: Vec<f32>,
    labels: Vec<f32>,
}

impl InferenceBenchmark {
    /// Loads `model.onnx`, `iris_data.dat` and `iris_labels.dat` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let session = InferenceSession::load(&dir.join(MODEL_FILE))?;
        let data = read_f32_le(&dir.join(DATA_FILE))?;
        let labels = read_f32_le(&dir.join(LABELS_FILE))?;
        Self::new(session, data, labels)
    }

    pub fn new(session: InferenceSession, data: Vec<f32>, labels: Vec<f32>) -> Result<Self> {
        match session.input_dims() {
            [_, Some(IRIS_FEATURES)] | [_, None] => {}
            dims => {
                return Err(Error::UnsupportedModel(format!(
                    "model input {dims:?} does not take {IRIS_FEATURES} features per row"
                )))
            }
        }
        if data.len() != labels.len() * IRIS_FEATURES {
            return Err(Error::InvalidDump(format!(
                "{} feature values do not match {} labels",
                data.len(),
                labels.len()
            )));
        }
        if labels.len() != IRIS_SAMPLES {
            return Err(Error::InvalidDump(format!(
                "expected {} samples, found {}",
                IRIS_SAMPLES,
                labels.len()
            )));
        }
        Ok(InferenceBenchmark {
            session,
            data,
            labels,
        })
    }

    /// Runs every sample through the model once.
    ///
    /// Samples are fed in chunks of the model's static batch size; the last
    /// chunk is zero-padded and the padded rows are discarded.
    pub fn run(&self) -> Result<BenchmarkResult> {
        let samples = self.labels.len();
        let batch = self.session.batch_size().unwrap_or(samples);

        let start = Instant::now();
        let mut correct = 0;
        for (chunk_index, chunk) in self.data.chunks(batch * IRIS_FEATURES).enumerate() {
            let rows = chunk.len() / IRIS_FEATURES;
            let mut input = chunk.to_vec();
            input.resize(batch * IRIS_FEATURES, 0.0);

            let output = self
                .session
                .run(Tensor::new(vec![batch, IRIS_FEATURES], input)?)?;

            let labels = &self.labels[chunk_index * batch..chunk_index * batch + rows];
            for (probs, &label) in output.data.chunks(IRIS_CLASSES).zip(labels) {
                if argmax(probs) as f32 == label {
                    correct += 1;
                }
            }
        }
        let seconds = start.elapsed().as_secs_f64();

        Ok(BenchmarkResult {
            seconds,
            accuracy: correct as f64 / samples as f64,
            samples,
        })
    }
}

/// Index of the largest entry; ties resolve to the first index.
fn argmax(v: &[f32]) -> usize {
    v.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &x)| if x > best.1 { (i, x) } else { best })
        .0
}
