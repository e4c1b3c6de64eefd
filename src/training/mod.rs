//! Training module for ACGAN
//!
//! This module provides:
//! - Training loop implementation
//! - Loss functions (adversarial BCE and auxiliary cross entropy)
//! - Training configuration and metrics
//! - Held-out evaluation

mod evaluate;
mod losses;
mod metrics;
mod trainer;

pub use evaluate::{evaluate, EvaluationReport};
pub use losses::{
    class_accuracy, classification_loss, discriminator_loss, discriminator_loss_smoothed,
    evaluate_losses, generator_loss, realness_accuracy, AcganLosses,
};
pub use metrics::{EmaTracker, TrainingMetrics};
pub use trainer::{train_step, StepLosses, Trainer, TrainingConfig};
