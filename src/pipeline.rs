use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::RunConfig;
use crate::data::{train_test_split, IrisDataset, Split, StandardScaler};
use crate::dump::dump_dataset;
use crate::error::Result;
use crate::network::network::Network;
use crate::onnx::export_onnx;
use crate::optim::adam::Adam;
use crate::train::{train_loop, TrainingHistory};

/// Exported inference graph.
pub const MODEL_FILE: &str = "model.onnx";

/// A trained classifier together with the data it was trained on.
#[derive(Debug)]
pub struct TrainedModel {
    pub dataset: IrisDataset,
    pub scaler: StandardScaler,
    pub split: Split,
    pub network: Network,
    pub history: TrainingHistory,
}

/// Paths of the files written by [`export`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifacts {
    pub model: PathBuf,
    pub data: PathBuf,
    pub labels: PathBuf,
}

/// Load → scale → split → train.
pub fn train(config: &RunConfig) -> Result<TrainedModel> {
    let dataset = IrisDataset::load()?;
    log::info!("loaded {} iris samples", dataset.len());

    let (scaler, scaled) = StandardScaler::fit_transform(dataset.features());
    let split = train_test_split(&scaled, dataset.labels(), config.test_ratio, config.split_seed)?;
    log::info!(
        "split into {} training and {} test samples (seed {})",
        split.train.len(),
        split.test.len(),
        config.split_seed
    );

    let mut network = Network::iris_classifier(&mut StdRng::seed_from_u64(config.init_seed));
    let mut optimizer = Adam::new(config.adam_config());
    log::info!(
        "training for {} epochs with Adam (learning rate {})",
        config.epochs,
        optimizer.learning_rate()
    );

    let history = train_loop(
        &mut network,
        &mut optimizer,
        &split.train,
        &split.test,
        &config.train_config(),
    );

    if let (Some(loss), Some(accuracy)) = (history.loss.last(), history.final_accuracy()) {
        log::info!(
            "finished {} epochs: loss {:.4}, test accuracy {:.2}%",
            history.epochs(),
            loss,
            accuracy * 100.0
        );
    }

    Ok(TrainedModel {
        dataset,
        scaler,
        split,
        network,
        history,
    })
}

/// Writes the ONNX model (traced on the test partition) and the raw
/// dataset dumps into `out_dir`.
pub fn export(trained: &TrainedModel, out_dir: &Path) -> Result<Artifacts> {
    let model = out_dir.join(MODEL_FILE);
    export_onnx(&trained.network, &trained.split.test.inputs, &model)?;

    let (data, labels) = dump_dataset(&trained.dataset, out_dir)?;

    Ok(Artifacts {
        model,
        data,
        labels,
    })
}

/// The whole run: train with `config`, then export into `out_dir`.
pub fn run(config: &RunConfig, out_dir: &Path) -> Result<(TrainingHistory, Artifacts)> {
    log::info!("run configuration: {}", serde_json::to_string(config)?);

    let trained = train(config)?;
    let artifacts = export(&trained, out_dir)?;

    Ok((trained.history, artifacts))
}
