//! # ACGAN for MNIST and Fashion-MNIST
//!
//! This crate provides a modular implementation of an Auxiliary Classifier
//! Generative Adversarial Network (ACGAN) that generates class-conditioned
//! 28x28 grayscale images.
//!
//! ## Modules
//!
//! - `data`: IDX parsing, dataset download and batching
//! - `model`: Generator, Discriminator and auxiliary Classifier
//! - `training`: Training loop, loss functions and evaluation
//! - `utils`: Configuration, checkpoints and sample grids

pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{DataLoader, DatasetFetcher, DatasetKind, ImageDataset, Split};
pub use error::{Error, Result};
pub use model::{Acgan, Classifier, Discriminator, Generator};
pub use training::{evaluate, EvaluationReport, Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{find_latest_checkpoint, load_checkpoint, save_checkpoint, save_grid, Config};
