//! Training loop implementation for ACGAN
//!
//! Each step updates the discriminator and classifier on `d_loss`, then the
//! generator on `g_loss`, using the same real batch, labels and noise.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tch::{Device, Tensor};
use tracing::{info, warn};

use super::losses::{
    classification_loss, discriminator_loss_smoothed, evaluate_losses, generator_loss,
};
use super::metrics::{EmaTracker, TrainingMetrics};
use crate::data::{DataLoader, DatasetKind};
use crate::error::Result;
use crate::model::{Acgan, AcganOptimizers, AdamConfig};
use crate::utils::{save_checkpoint, save_grid, ImageGrid};

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of optimization steps
    pub train_steps: usize,
    /// Images per step
    pub batch_size: usize,
    /// Learning rates and Adam betas
    pub optimizer: AdamConfig,
    /// Report, checkpoint and render a grid every N steps
    pub sample_every: usize,
    /// Directory to save checkpoints
    pub checkpoint_dir: String,
    /// Directory to save sample grids
    pub output_dir: String,
    /// Number of checkpoints kept on disk (0 keeps all)
    pub max_checkpoints: usize,
    /// Sample grid layout
    pub grid_rows: i64,
    pub grid_cols: i64,
    /// Whether to use one-sided label smoothing
    pub label_smoothing: bool,
    /// Smooth label for real samples (e.g., 0.9)
    pub smooth_real: f64,
    /// Dataset recorded in checkpoint metadata
    pub dataset: DatasetKind,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_steps: 100_000,
            batch_size: 100,
            optimizer: AdamConfig::default(),
            sample_every: 1000,
            checkpoint_dir: "ckpt".to_string(),
            output_dir: "out".to_string(),
            max_checkpoints: 3,
            grid_rows: 10,
            grid_cols: 10,
            label_smoothing: false,
            smooth_real: 0.9,
            dataset: DatasetKind::FashionMnist,
        }
    }
}

impl TrainingConfig {
    fn real_target(&self) -> f64 {
        if self.label_smoothing {
            self.smooth_real
        } else {
            1.0
        }
    }
}

/// Losses of a single optimization step
#[derive(Debug, Clone, Copy)]
pub struct StepLosses {
    pub d_loss: f64,
    pub g_loss: f64,
}

/// ACGAN Trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Continue from metrics restored with a checkpoint
    pub fn with_metrics(mut self, metrics: TrainingMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Train the ACGAN model
    ///
    /// # Arguments
    ///
    /// * `model` - ACGAN model to train
    /// * `data_loader` - DataLoader providing random training batches
    /// * `start_step` - First step to run (non-zero when resuming)
    ///
    /// # Returns
    ///
    /// Training metrics
    pub fn train(
        &mut self,
        model: &mut Acgan,
        data_loader: &DataLoader,
        start_step: usize,
    ) -> Result<&TrainingMetrics> {
        let mut optimizers = model.optimizers(&self.config.optimizer)?;
        let grid = ImageGrid::new(self.config.grid_rows, self.config.grid_cols);

        std::fs::create_dir_all(&self.config.checkpoint_dir)?;
        std::fs::create_dir_all(&self.config.output_dir)?;

        info!(
            "Training steps {}..{} with batch size {} on {:?}",
            start_step, self.config.train_steps, data_loader.batch_size(), self.device
        );

        let pb = ProgressBar::new(self.config.train_steps as u64);
        pb.set_position(start_step as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("##-"),
        );

        let mut d_ema = EmaTracker::new(0.05);
        let mut g_ema = EmaTracker::new(0.05);
        let last_step = self.config.train_steps.saturating_sub(1);

        for step in start_step..self.config.train_steps {
            let batch = data_loader.random_batch()?;
            let (real, labels, classes) = batch.to_tensors(self.device);
            let noise = model.sample_noise(batch.len() as i64);

            let losses = train_step(
                model,
                &mut optimizers,
                &real,
                &labels,
                &noise,
                self.config.real_target(),
            );
            d_ema.update(losses.d_loss);
            g_ema.update(losses.g_loss);

            // The final step always reports, so the last checkpoint carries its losses
            if step % self.config.sample_every == 0 || step == last_step {
                let report = evaluate_losses(model, &real, &labels, &classes, &noise);
                self.metrics.record(step, &report);

                pb.suspend(|| {
                    info!(
                        "step {}: D_loss={:.4}, G_loss={:.4}, c_loss={:.4}, real_cls_acc={:.2}%, fake_cls_acc={:.2}%",
                        step,
                        report.d_loss,
                        report.g_loss,
                        report.c_loss,
                        report.real_class_acc * 100.0,
                        report.fake_class_acc * 100.0
                    )
                });

                if self.metrics.check_mode_collapse(5) {
                    warn!("Possible mode collapse detected! Consider adjusting learning rates.");
                }

                self.checkpoint(model, step)?;

                let samples = model.generate(&model.random_labels(grid.len()));
                let path = Path::new(&self.config.output_dir).join(format!("{}.png", step));
                if let Err(e) = save_grid(&samples, &grid, &path) {
                    warn!("Failed to save sample grid {}: {}", path.display(), e);
                }
            }

            pb.set_message(format!("D: {:.4}, G: {:.4}", d_ema.value(), g_ema.value()));
            pb.inc(1);
        }

        pb.finish_with_message("done");

        let metrics_path = Path::new(&self.config.checkpoint_dir).join("training_metrics.csv");
        if let Err(e) = self.metrics.save_csv(&metrics_path) {
            warn!("Failed to save metrics: {}", e);
        }

        Ok(&self.metrics)
    }

    fn checkpoint(&self, model: &Acgan, step: usize) -> Result<()> {
        save_checkpoint(
            model,
            &self.metrics,
            step,
            &self.config.checkpoint_dir,
            self.config.dataset,
            self.config.max_checkpoints,
        )?;
        Ok(())
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

/// Single training step (for more fine-grained control)
///
/// Runs one discriminator/classifier update on `d_loss` followed by one
/// generator update on `g_loss`. `real_target` is 1.0 without smoothing.
pub fn train_step(
    model: &Acgan,
    optimizers: &mut AcganOptimizers,
    real: &Tensor,
    labels: &Tensor,
    noise: &Tensor,
    real_target: f64,
) -> StepLosses {
    let fake = model.generator.forward_t(noise, labels, true);

    // ========== Discriminator + classifier ==========
    let (real_cls, real_logit) = model.discriminate_t(real, true);
    let (_, fake_logit) = model.discriminate_t(&fake.detach(), true);

    let d_loss = discriminator_loss_smoothed(&real_logit, &fake_logit, real_target)
        + classification_loss(&real_cls, labels);

    optimizers.discriminator.zero_grad();
    optimizers.classifier.zero_grad();
    d_loss.backward();
    optimizers.discriminator.step();
    optimizers.classifier.step();

    // ========== Generator ==========
    let (fake_cls, fake_logit) = model.discriminate_t(&fake, true);
    let g_loss = generator_loss(&fake_logit) + classification_loss(&fake_cls, labels);

    optimizers.generator.zero_grad();
    g_loss.backward();
    optimizers.generator.step();

    StepLosses {
        d_loss: d_loss.double_value(&[]),
        g_loss: g_loss.double_value(&[]),
    }
}
