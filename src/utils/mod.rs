//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities
//! - Sample grid rendering

mod checkpoint;
mod config;
mod visualize;

pub use checkpoint::{
    checkpoint_name, find_latest_checkpoint, list_checkpoints, load_checkpoint,
    load_checkpoint_meta, prune_checkpoints, save_checkpoint, CheckpointMeta,
};
pub use config::{Config, DataConfig, ModelConfig, TrainingConfigFile};
pub use visualize::{render_grid, save_grid, tensor_to_pixels, ImageGrid};
