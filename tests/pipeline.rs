use iris_nn::bench::InferenceBenchmark;
use iris_nn::data::IrisDataset;
use iris_nn::dump::read_f32_le;
use iris_nn::onnx::runtime::{InferenceSession, Tensor};
use iris_nn::pipeline::{self, MODEL_FILE};
use iris_nn::train::compute_accuracy;
use iris_nn::{Error, RunConfig};

fn quiet_config() -> RunConfig {
    RunConfig {
        show_progress: false,
        ..RunConfig::default()
    }
}

#[test]
fn full_run_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();

    let (history, artifacts) = pipeline::run(&quiet_config(), dir.path()).unwrap();

    assert_eq!(history.loss.len(), 100);
    assert_eq!(history.accuracy.len(), 100);
    assert!(history.accuracy.iter().all(|a| (0.0..=1.0).contains(a)));
    assert!(history.loss.last().unwrap() < history.loss.first().unwrap());

    assert_eq!(artifacts.model, dir.path().join(MODEL_FILE));
    assert!(artifacts.model.exists());
    assert_eq!(std::fs::metadata(&artifacts.data).unwrap().len(), 2400);
    assert_eq!(std::fs::metadata(&artifacts.labels).unwrap().len(), 600);
}

#[test]
fn dumps_decode_to_the_unscaled_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        epochs: 3,
        ..quiet_config()
    };
    let (_, artifacts) = pipeline::run(&config, dir.path()).unwrap();

    let iris = IrisDataset::load().unwrap();

    let data = read_f32_le(&artifacts.data).unwrap();
    assert_eq!(data, iris.features().to_f32_vec());
    assert_eq!(&data[..4], &[5.1, 3.5, 1.4, 0.2]);

    let labels = read_f32_le(&artifacts.labels).unwrap();
    let expected: Vec<f32> = iris.labels().iter().map(|&l| l as f32).collect();
    assert_eq!(labels, expected);
}

#[test]
fn exported_model_reproduces_the_trained_network() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        epochs: 20,
        ..quiet_config()
    };
    let trained = pipeline::train(&config).unwrap();
    let artifacts = pipeline::export(&trained, dir.path()).unwrap();

    // The last recorded accuracy is the final network's test accuracy.
    assert_eq!(
        trained.history.final_accuracy(),
        Some(compute_accuracy(&trained.network, &trained.split.test))
    );

    let test_inputs = &trained.split.test.inputs;
    let session = InferenceSession::load(&artifacts.model).unwrap();
    assert_eq!(session.batch_size(), Some(test_inputs.rows));

    let output = session
        .run(Tensor::new(vec![test_inputs.rows, test_inputs.cols], test_inputs.to_f32_vec()).unwrap())
        .unwrap();
    let expected = trained.network.predict(test_inputs);

    assert_eq!(output.dims, vec![test_inputs.rows, 3]);
    for (got, want) in output.data.iter().zip(expected.as_slice()) {
        assert!((*got as f64 - want).abs() < 1e-4, "{got} vs {want}");
    }
}

#[test]
fn benchmark_runs_over_exported_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        epochs: 5,
        ..quiet_config()
    };
    pipeline::run(&config, dir.path()).unwrap();

    let result = InferenceBenchmark::load(dir.path()).unwrap().run().unwrap();

    assert_eq!(result.samples, 150);
    assert!((0.0..=1.0).contains(&result.accuracy));
    assert!(result.seconds >= 0.0);
}

#[test]
fn benchmark_without_artifacts_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(InferenceBenchmark::load(dir.path()).is_err());
}

#[test]
fn unusable_test_ratio_is_a_dataset_error() {
    for test_ratio in [0.0, 1.0, 2.5] {
        let config = RunConfig {
            test_ratio,
            ..quiet_config()
        };
        assert!(matches!(
            pipeline::train(&config),
            Err(Error::InvalidDataset(_))
        ));
    }
}

#[test]
fn final_loss_stays_above_the_cross_entropy_floor() {
    let trained = pipeline::train(&quiet_config()).unwrap();
    let floor = (2.0 + std::f64::consts::E).ln() - 1.0;
    assert!(trained.history.loss.iter().all(|&l| l > floor));
}
