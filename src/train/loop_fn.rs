use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use crate::data::split::Batch;
use crate::network::network::Network;
use crate::optim::adam::Adam;
use crate::train::epoch_stats::{EpochStats, TrainEvent, TrainingHistory};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` with full-batch updates for `config.epochs` epochs and
/// returns the loss and test accuracy of every epoch.
///
/// Each epoch:
/// 1. forward pass over the whole training batch,
/// 2. mean cross-entropy, recorded as this epoch's loss,
/// 3. zeroed gradients, backward pass, one optimizer step,
/// 4. evaluation of the *updated* network on `test`, recorded as this
///    epoch's accuracy.
///
/// The loop never stops early; non-finite losses are recorded as they are.
///
/// # Panics
/// Panics if `train` is empty or the batches do not fit the network.
pub fn train_loop(
    network: &mut Network,
    optimizer: &mut Adam,
    train: &Batch,
    test: &Batch,
    config: &TrainConfig,
) -> TrainingHistory {
    assert!(!train.is_empty(), "training batch must not be empty");

    let mut history = TrainingHistory::with_capacity(config.epochs);
    let progress = progress_bar(config);

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        // ── Forward, backward, update ──────────────────────────────────────
        let (train_loss, grads) = network.loss_and_gradients(&train.inputs, &train.labels);
        history.loss.push(train_loss);
        if !train_loss.is_finite() {
            log::warn!("epoch {epoch}: non-finite training loss {train_loss}");
        }

        optimizer.step(network, &grads);
        emit(config, TrainEvent::StepApplied { epoch });

        // ── Evaluation on the updated parameters ───────────────────────────
        let test_accuracy = compute_accuracy(network, test);
        history.accuracy.push(test_accuracy);

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            test_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        log::debug!(
            "epoch {}/{}: loss {:.6}, accuracy {:.4}",
            stats.epoch,
            stats.total_epochs,
            stats.train_loss,
            stats.test_accuracy
        );

        progress.set_message(format!("loss {train_loss:.4} acc {test_accuracy:.3}"));
        progress.inc(1);
        emit(config, TrainEvent::Epoch(stats));
    }

    progress.finish();
    history
}

/// Fraction of samples whose argmax prediction matches the label.
/// Returns 0 for an empty batch.
pub fn compute_accuracy(network: &Network, batch: &Batch) -> f64 {
    if batch.is_empty() {
        return 0.0;
    }
    let correct = network
        .classify(&batch.inputs)
        .iter()
        .zip(&batch.labels)
        .filter(|(predicted, label)| predicted == label)
        .count();
    correct as f64 / batch.len() as f64
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn emit(config: &TrainConfig, event: TrainEvent) {
    if let Some(ref tx) = config.progress_tx {
        // A dropped receiver only loses the notification.
        let _ = tx.send(event);
    }
}

fn progress_bar(config: &TrainConfig) -> ProgressBar {
    if !config.show_progress {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template(
        "{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");

    let pb = ProgressBar::new(config.epochs as u64);
    pb.set_style(style);
    pb.set_prefix("epoch");
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{train_test_split, IrisDataset, StandardScaler};
    use crate::optim::adam::AdamConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::mpsc;

    fn iris_batches() -> (Batch, Batch) {
        let iris = IrisDataset::load().unwrap();
        let (_, scaled) = StandardScaler::fit_transform(iris.features());
        let split = train_test_split(&scaled, iris.labels(), 0.2, 2).unwrap();
        (split.train, split.test)
    }

    #[test]
    fn records_one_finite_entry_per_epoch() {
        let (train, test) = iris_batches();
        let mut network = Network::iris_classifier(&mut StdRng::seed_from_u64(0));
        let mut adam = Adam::new(AdamConfig::default());

        let history = train_loop(
            &mut network,
            &mut adam,
            &train,
            &test,
            &TrainConfig::new(100).with_progress(false),
        );

        assert_eq!(history.loss.len(), 100);
        assert_eq!(history.accuracy.len(), 100);
        assert!(history.loss.iter().all(|l| l.is_finite() && *l > 0.0));
        assert!(history.accuracy.iter().all(|a| (0.0..=1.0).contains(a)));
        assert_eq!(adam.steps(), 100);
    }

    #[test]
    fn training_reduces_loss() {
        let (train, test) = iris_batches();
        let mut network = Network::iris_classifier(&mut StdRng::seed_from_u64(0));
        let mut adam = Adam::new(AdamConfig::default());

        let history = train_loop(
            &mut network,
            &mut adam,
            &train,
            &test,
            &TrainConfig::new(100).with_progress(false),
        );

        assert!(history.loss[99] < history.loss[0]);
        assert!(history.final_accuracy().unwrap() > 0.6);
    }

    #[test]
    fn evaluation_follows_the_update() {
        let (train, test) = iris_batches();
        let mut network = Network::iris_classifier(&mut StdRng::seed_from_u64(1));
        let mut adam = Adam::new(AdamConfig::default());
        let (tx, rx) = mpsc::channel();

        let history = train_loop(
            &mut network,
            &mut adam,
            &train,
            &test,
            &TrainConfig::new(5).with_progress(false).with_events(tx),
        );

        let events: Vec<TrainEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 10);
        for (epoch, pair) in events.chunks(2).enumerate() {
            assert_eq!(pair[0], TrainEvent::StepApplied { epoch: epoch + 1 });
            match &pair[1] {
                TrainEvent::Epoch(stats) => {
                    assert_eq!(stats.epoch, epoch + 1);
                    assert_eq!(stats.test_accuracy, history.accuracy[epoch]);
                    assert_eq!(stats.train_loss, history.loss[epoch]);
                }
                other => panic!("expected epoch stats, got {other:?}"),
            }
        }

        // The last recorded accuracy is that of the final parameters.
        assert_eq!(history.accuracy[4], compute_accuracy(&network, &test));
    }

    #[test]
    fn non_finite_parameters_reach_the_history() {
        let (train, test) = iris_batches();
        let mut network = Network::iris_classifier(&mut StdRng::seed_from_u64(3));
        network.layers[0].weights = network.layers[0].weights.map(|_| f64::NAN);
        let mut adam = Adam::new(AdamConfig::default());

        let history = train_loop(
            &mut network,
            &mut adam,
            &train,
            &test,
            &TrainConfig::new(4).with_progress(false),
        );

        assert_eq!(history.loss.len(), 4);
        assert_eq!(history.accuracy.len(), 4);
        assert!(history.loss.iter().all(|l| l.is_nan()));
        assert!(history.accuracy.iter().all(|a| (0.0..=1.0).contains(a)));
        assert!(network.predict(&test.inputs).as_slice().iter().all(|p| p.is_nan()));
    }

    #[test]
    fn loss_is_recorded_before_the_update() {
        let (train, test) = iris_batches();
        let mut network = Network::iris_classifier(&mut StdRng::seed_from_u64(2));
        let mut probe = Network::iris_classifier(&mut StdRng::seed_from_u64(2));
        let mut adam = Adam::new(AdamConfig::default());

        let (initial_loss, _) = probe.loss_and_gradients(&train.inputs, &train.labels);
        let history = train_loop(
            &mut network,
            &mut adam,
            &train,
            &test,
            &TrainConfig::new(1).with_progress(false),
        );

        assert_eq!(history.loss, vec![initial_loss]);
    }
}
