//! Supervised training of the digit network on the MNIST dataset.
//!
//! A plain custom loop: Adam over cross-entropy, evaluated on the test
//! split after every epoch, checkpointed per epoch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::vision::MnistDataset,
    },
    module::AutodiffModule,
    nn::loss::CrossEntropyLoss,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::Serialize;
use tracing::info;

use super::checkpointing::{epoch_name, Checkpointer};
use super::data::{DigitBatch, DigitBatcher};
use crate::config::TrainingConfig;
use crate::error::Result;
use crate::ml::{save_model, DigitNet, DigitNetConfig};

/// Batches between progress log lines
pub const LOG_INTERVAL: usize = 100;

const CHECKPOINT_PREFIX: &str = "digitnet";

/// Loss and accuracy over one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EpochStats {
    /// Mean per-batch loss
    pub loss: f32,
    /// Percentage of correct predictions
    pub accuracy: f32,
}

#[derive(Default)]
struct Accumulator {
    loss_sum: f64,
    batches: usize,
    correct: usize,
    seen: usize,
}

impl Accumulator {
    fn add(&mut self, loss: f32, correct: usize, seen: usize) {
        self.loss_sum += loss as f64;
        self.batches += 1;
        self.correct += correct;
        self.seen += seen;
    }

    fn stats(&self) -> EpochStats {
        EpochStats {
            loss: if self.batches == 0 {
                0.0
            } else {
                (self.loss_sum / self.batches as f64) as f32
            },
            accuracy: if self.seen == 0 {
                0.0
            } else {
                100.0 * self.correct as f32 / self.seen as f32
            },
        }
    }
}

/// Outcome of a full training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub final_test_accuracy: f32,
    pub final_test_loss: f32,
    pub weights_path: PathBuf,
}

/// Number of predictions in `output` whose argmax matches `targets`
pub fn correct_predictions<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = output.argmax(1).squeeze::<1>(1);
    predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// One optimizer step on a batch; returns the updated model, its loss and
/// number of correct predictions.
pub fn train_step<B, O>(
    model: DigitNet<B>,
    optim: &mut O,
    batch: DigitBatch<B>,
    learning_rate: f64,
) -> (DigitNet<B>, f32, usize)
where
    B: AutodiffBackend,
    O: Optimizer<DigitNet<B>, B>,
{
    let output = model.forward(batch.images);
    let loss = CrossEntropyLoss::new(None, &output.device())
        .forward(output.clone(), batch.targets.clone());
    let correct = correct_predictions(output, batch.targets);

    // Gradients for the current backward pass
    let grads = loss.backward();
    // Gradients linked to each parameter of the model.
    let grads = GradientsParams::from_grads(grads, &model);
    let model = optim.step(learning_rate, model, grads);

    (model, loss.into_scalar().elem::<f32>(), correct)
}

/// Mean loss and accuracy of `model` over every batch of `loader`
pub fn evaluate<B: Backend>(
    model: &DigitNet<B>,
    loader: &Arc<dyn DataLoader<DigitBatch<B>>>,
) -> EpochStats {
    let mut acc = Accumulator::default();

    for batch in loader.iter() {
        let seen = batch.targets.dims()[0];
        let output = model.forward(batch.images);
        let loss = CrossEntropyLoss::new(None, &output.device())
            .forward(output.clone(), batch.targets.clone());
        let correct = correct_predictions(output, batch.targets);
        acc.add(loss.into_scalar().elem::<f32>(), correct, seen);
    }

    acc.stats()
}

/// Train from scratch, checkpoint every epoch and write the final weights
/// to `output`.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    output: &Path,
    device: B::Device,
) -> Result<TrainingSummary> {
    B::seed(config.seed);

    let mut model = DigitNetConfig::new().init::<B>(&device);
    let mut optim = AdamConfig::new().init::<B, DigitNet<B>>();
    let checkpointer = Checkpointer::new(&config.checkpoint_dir, config.max_checkpoints);

    let train_loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(MnistDataset::train());

    let test_loader = DataLoaderBuilder::new(DigitBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(MnistDataset::test());

    info!(
        epochs = config.epochs,
        batch_size = config.batch_size,
        learning_rate = config.learning_rate,
        seed = config.seed,
        "Starting training"
    );

    let mut test_stats = EpochStats::default();
    for epoch in 1..=config.epochs {
        let mut acc = Accumulator::default();

        for (iteration, batch) in train_loader.iter().enumerate() {
            let seen = batch.targets.dims()[0];
            let (next, loss, correct) = train_step(model, &mut optim, batch, config.learning_rate);
            model = next;
            acc.add(loss, correct, seen);

            if (iteration + 1) % LOG_INTERVAL == 0 {
                let running = acc.stats();
                info!(
                    "[Train - Epoch {} - Batch {}] Loss {:.4} | Accuracy {:.2} %",
                    epoch,
                    iteration + 1,
                    running.loss,
                    running.accuracy
                );
            }
        }

        let model_valid = model.valid();
        test_stats = evaluate(&model_valid, &test_loader);
        info!(
            "[Test - Epoch {}] Loss {:.4} | Accuracy {:.2} %",
            epoch, test_stats.loss, test_stats.accuracy
        );

        checkpointer.save(&model_valid, &epoch_name(CHECKPOINT_PREFIX, epoch))?;
    }

    let weights_path = save_model(&model.valid(), output)?;
    info!("Saved trained weights to {}", weights_path.display());

    Ok(TrainingSummary {
        epochs: config.epochs,
        final_test_accuracy: test_stats.accuracy,
        final_test_loss: test_stats.loss,
        weights_path,
    })
}
