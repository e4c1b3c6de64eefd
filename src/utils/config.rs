//! Configuration management
//!
//! Provides unified configuration for the entire ACGAN pipeline. Files are
//! JSON or TOML depending on their extension; missing fields take defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{DatasetKind, ImageDataset, Split};
use crate::error::{Error, Result};
use crate::model::{Acgan, AdamConfig, ClassifierConfig, DiscriminatorConfig, GeneratorConfig};
use crate::training::TrainingConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfigFile,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Dataset to train on
    pub dataset: DatasetKind,
    /// Directory holding the IDX files
    pub data_dir: String,
    /// Batch size
    pub batch_size: usize,
    /// Number of classes
    pub num_classes: i64,
    /// Side length of the square images
    pub image_size: i64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::FashionMnist,
            data_dir: "data/fashion_mnist".to_string(),
            batch_size: 100,
            num_classes: 10,
            image_size: 28,
        }
    }
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Noise vector size
    pub noise_dim: i64,
    /// Channels of the generator's projected feature map
    pub gen_base_channels: i64,
    /// Filters of the discriminator convolutions
    pub disc_conv1_filters: i64,
    pub disc_conv2_filters: i64,
    /// Width of the discriminator's shared features
    pub disc_hidden_dim: i64,
    /// Classifier head layout
    pub classifier_hidden_dim: i64,
    pub classifier_hidden_layers: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            noise_dim: 100,
            gen_base_channels: 128,
            disc_conv1_filters: 32,
            disc_conv2_filters: 64,
            disc_hidden_dim: 128,
            classifier_hidden_dim: 128,
            classifier_hidden_layers: 3,
        }
    }
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfigFile {
    /// Number of optimization steps
    pub train_steps: usize,
    pub generator_lr: f64,
    pub discriminator_lr: f64,
    pub classifier_lr: f64,
    /// Adam betas
    pub beta1: f64,
    pub beta2: f64,
    /// Report, checkpoint and render a grid every N steps
    pub sample_every: usize,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Directory for rendered sample grids
    pub output_dir: String,
    /// Number of checkpoints kept on disk (0 keeps all)
    pub max_checkpoints: usize,
    /// Layout of the sample grid rendered during training
    pub grid_rows: i64,
    pub grid_cols: i64,
    /// Use one-sided label smoothing
    pub label_smoothing: bool,
    pub smooth_real: f64,
    /// Device: "cpu" or "cuda"
    pub device: String,
}

impl Default for TrainingConfigFile {
    fn default() -> Self {
        Self {
            train_steps: 100_000,
            generator_lr: 1e-3,
            discriminator_lr: 1e-3,
            classifier_lr: 1e-3,
            beta1: 0.5,
            beta2: 0.999,
            sample_every: 1000,
            checkpoint_dir: "ckpt".to_string(),
            output_dir: "out".to_string(),
            max_checkpoints: 3,
            grid_rows: 10,
            grid_cols: 10,
            label_smoothing: false,
            smooth_real: 0.9,
            device: "cpu".to_string(),
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from a `.toml` or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_toml(path) {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save to a `.toml` or JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if is_toml(path) {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Load the file when it exists, otherwise use defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::Config(msg.to_string()));

        if self.data.batch_size == 0 {
            return fail("batch size must be > 0");
        }
        if self.data.num_classes <= 0 {
            return fail("number of classes must be > 0");
        }
        if self.data.image_size <= 0 || self.data.image_size % 4 != 0 {
            return fail("image size must be a positive multiple of 4");
        }
        if self.model.noise_dim <= 0 {
            return fail("noise dimension must be > 0");
        }
        if self.model.gen_base_channels < 2 {
            return fail("generator base channels must be >= 2");
        }
        if self.training.train_steps == 0 {
            return fail("number of training steps must be > 0");
        }
        if self.training.sample_every == 0 {
            return fail("sample interval must be > 0");
        }
        let lrs = [
            self.training.generator_lr,
            self.training.discriminator_lr,
            self.training.classifier_lr,
        ];
        if lrs.iter().any(|&lr| lr <= 0.0) {
            return fail("learning rates must be > 0");
        }
        if self.training.grid_rows <= 0 || self.training.grid_cols <= 0 {
            return fail("sample grid must have at least one row and column");
        }
        Ok(())
    }

    /// Build the ACGAN described by this configuration
    pub fn build_model(&self, device: tch::Device) -> Acgan {
        let gen_config = GeneratorConfig {
            noise_dim: self.model.noise_dim,
            num_classes: self.data.num_classes,
            base_channels: self.model.gen_base_channels,
            image_size: self.data.image_size,
            image_channels: 1,
        };
        let disc_config = DiscriminatorConfig {
            image_channels: 1,
            image_size: self.data.image_size,
            conv1_filters: self.model.disc_conv1_filters,
            conv2_filters: self.model.disc_conv2_filters,
            hidden_dim: self.model.disc_hidden_dim,
        };
        let cls_config = ClassifierConfig {
            input_dim: self.model.disc_hidden_dim,
            hidden_dim: self.model.classifier_hidden_dim,
            hidden_layers: self.model.classifier_hidden_layers,
            num_classes: self.data.num_classes,
        };

        Acgan::new(gen_config, disc_config, cls_config, device)
    }

    /// Load a split of the configured dataset
    ///
    /// Fails when the images do not match the configured image size, since
    /// the discriminator's dense layers are sized from it.
    pub fn load_dataset(&self, split: Split) -> Result<ImageDataset> {
        let dataset = ImageDataset::load(
            &self.data.data_dir,
            split,
            self.data.num_classes as usize,
        )?;

        let size = self.data.image_size as usize;
        if dataset.image_rows() != size || dataset.image_cols() != size {
            return Err(Error::Config(format!(
                "configured image size {} does not match {}x{} images in {}",
                size,
                dataset.image_rows(),
                dataset.image_cols(),
                self.data.data_dir
            )));
        }

        Ok(dataset)
    }

    /// Training loop settings
    pub fn training_config(&self) -> TrainingConfig {
        let t = &self.training;
        TrainingConfig {
            train_steps: t.train_steps,
            batch_size: self.data.batch_size,
            optimizer: AdamConfig {
                generator_lr: t.generator_lr,
                discriminator_lr: t.discriminator_lr,
                classifier_lr: t.classifier_lr,
                beta1: t.beta1,
                beta2: t.beta2,
            },
            sample_every: t.sample_every,
            checkpoint_dir: t.checkpoint_dir.clone(),
            output_dir: t.output_dir.clone(),
            max_checkpoints: t.max_checkpoints,
            grid_rows: t.grid_rows,
            grid_cols: t.grid_cols,
            label_smoothing: t.label_smoothing,
            smooth_real: t.smooth_real,
            dataset: self.data.dataset,
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}
