//! Checkpoint save/load utilities
//!
//! A checkpoint is a directory `checkpoint_step_{step:08}` holding the three
//! weight files, `meta.json` and the metrics recorded so far. Only the most
//! recent `max_to_keep` checkpoints are retained.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::DatasetKind;
use crate::error::{Error, Result};
use crate::model::Acgan;
use crate::training::TrainingMetrics;

const CHECKPOINT_PREFIX: &str = "checkpoint_step_";
const META_FILE: &str = "meta.json";
const METRICS_FILE: &str = "metrics.csv";

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Training step the checkpoint was taken at
    pub step: usize,
    /// Losses at checkpoint
    pub d_loss: f64,
    pub g_loss: f64,
    pub c_loss: f64,
    /// Timestamp of checkpoint
    pub timestamp: String,
    /// Dataset the model was trained on
    pub dataset: DatasetKind,
    /// Model dimensions
    pub noise_dim: i64,
    pub num_classes: i64,
    pub image_size: i64,
}

/// Directory name of the checkpoint for `step`
pub fn checkpoint_name(step: usize) -> String {
    format!("{}{:08}", CHECKPOINT_PREFIX, step)
}

/// Save a complete checkpoint (model + metadata + metrics)
///
/// # Arguments
///
/// * `model` - ACGAN model to save
/// * `metrics` - Training metrics so far
/// * `step` - Current training step
/// * `dir` - Root checkpoint directory
/// * `dataset` - Dataset the model is trained on
/// * `max_to_keep` - Number of checkpoints to retain (0 keeps all)
///
/// # Returns
///
/// Path to saved checkpoint
pub fn save_checkpoint(
    model: &Acgan,
    metrics: &TrainingMetrics,
    step: usize,
    dir: impl AsRef<Path>,
    dataset: DatasetKind,
    max_to_keep: usize,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let checkpoint_dir = dir.join(checkpoint_name(step));
    std::fs::create_dir_all(&checkpoint_dir)?;

    model.save(&checkpoint_dir)?;

    let meta = CheckpointMeta {
        step,
        d_loss: metrics.latest_d_loss().unwrap_or(0.0),
        g_loss: metrics.latest_g_loss().unwrap_or(0.0),
        c_loss: metrics.latest_c_loss().unwrap_or(0.0),
        timestamp: chrono::Utc::now().to_rfc3339(),
        dataset,
        noise_dim: model.noise_dim(),
        num_classes: model.num_classes(),
        image_size: model.image_size(),
    };
    std::fs::write(
        checkpoint_dir.join(META_FILE),
        serde_json::to_string_pretty(&meta)?,
    )?;

    metrics.save_csv(checkpoint_dir.join(METRICS_FILE))?;

    info!("Saved checkpoint to {}", checkpoint_dir.display());

    if max_to_keep > 0 {
        prune_checkpoints(dir, max_to_keep)?;
    }

    Ok(checkpoint_dir)
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta(checkpoint_dir: impl AsRef<Path>) -> Result<CheckpointMeta> {
    let content = std::fs::read_to_string(checkpoint_dir.as_ref().join(META_FILE))?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a complete checkpoint
///
/// # Returns
///
/// Tuple of (step, metrics)
pub fn load_checkpoint(
    model: &mut Acgan,
    checkpoint_dir: impl AsRef<Path>,
) -> Result<(usize, TrainingMetrics)> {
    let checkpoint_dir = checkpoint_dir.as_ref();
    let meta = load_checkpoint_meta(checkpoint_dir)?;

    if meta.noise_dim != model.noise_dim()
        || meta.num_classes != model.num_classes()
        || meta.image_size != model.image_size()
    {
        return Err(Error::Config(format!(
            "checkpoint {} was trained with noise_dim={}, num_classes={}, image_size={}",
            checkpoint_dir.display(),
            meta.noise_dim,
            meta.num_classes,
            meta.image_size
        )));
    }

    model.load(checkpoint_dir)?;

    let metrics_path = checkpoint_dir.join(METRICS_FILE);
    let metrics = if metrics_path.exists() {
        TrainingMetrics::load_csv(&metrics_path)?
    } else {
        TrainingMetrics::new()
    };

    info!(
        "Loaded checkpoint from {} (step {})",
        checkpoint_dir.display(),
        meta.step
    );
    Ok((meta.step, metrics))
}

/// List all checkpoints in a directory, oldest step first
pub fn list_checkpoints(dir: impl AsRef<Path>) -> Vec<(PathBuf, CheckpointMeta)> {
    let Ok(entries) = std::fs::read_dir(dir.as_ref()) else {
        return vec![];
    };

    let mut checkpoints: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(CHECKPOINT_PREFIX))
                .unwrap_or(false)
        })
        .filter_map(|e| {
            let path = e.path();
            load_checkpoint_meta(&path).ok().map(|meta| (path, meta))
        })
        .collect();

    checkpoints.sort_by_key(|(_, meta)| meta.step);
    checkpoints
}

/// Find the latest checkpoint in a directory
pub fn find_latest_checkpoint(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    list_checkpoints(dir)
        .pop()
        .map(|(path, _)| path)
        .ok_or_else(|| Error::CheckpointNotFound(dir.to_path_buf()))
}

/// Remove the oldest checkpoints so at most `max_to_keep` remain
///
/// Returns the number of checkpoints removed.
pub fn prune_checkpoints(dir: impl AsRef<Path>, max_to_keep: usize) -> Result<usize> {
    let checkpoints = list_checkpoints(dir);
    let excess = checkpoints.len().saturating_sub(max_to_keep);

    for (path, meta) in checkpoints.iter().take(excess) {
        debug!("Removing checkpoint at step {}", meta.step);
        std::fs::remove_dir_all(path)?;
    }

    Ok(excess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    fn tiny_model() -> Acgan {
        Acgan::with_defaults(8, 3, 4, Device::Cpu)
    }

    #[test]
    fn test_checkpoint_name_sorts_by_step() {
        assert_eq!(checkpoint_name(1000), "checkpoint_step_00001000");
        assert!(checkpoint_name(9000) < checkpoint_name(10000));
    }

    #[test]
    fn test_checkpoint_meta_serialization() {
        let meta = CheckpointMeta {
            step: 10,
            d_loss: 0.5,
            g_loss: 0.6,
            c_loss: 0.7,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            dataset: DatasetKind::FashionMnist,
            noise_dim: 100,
            num_classes: 10,
            image_size: 28,
        };

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"fashion_mnist\""));
        let loaded: CheckpointMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(meta.step, loaded.step);
    }

    #[test]
    fn test_save_and_load_latest() {
        let dir = tempfile::tempdir().unwrap();
        let model = tiny_model();
        let metrics = TrainingMetrics::new();

        save_checkpoint(&model, &metrics, 0, dir.path(), DatasetKind::Mnist, 0).unwrap();
        save_checkpoint(&model, &metrics, 1000, dir.path(), DatasetKind::Mnist, 0).unwrap();

        let latest = find_latest_checkpoint(dir.path()).unwrap();
        assert!(latest.ends_with(checkpoint_name(1000)));

        let mut restored = tiny_model();
        let (step, loaded_metrics) = load_checkpoint(&mut restored, &latest).unwrap();
        assert_eq!(step, 1000);
        assert!(loaded_metrics.is_empty());
    }

    #[test]
    fn test_retention_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let model = tiny_model();
        let metrics = TrainingMetrics::new();

        for step in [0, 1000, 2000, 3000, 4000] {
            save_checkpoint(&model, &metrics, step, dir.path(), DatasetKind::Mnist, 3).unwrap();
        }

        let steps: Vec<usize> = list_checkpoints(dir.path())
            .into_iter()
            .map(|(_, meta)| meta.step)
            .collect();
        assert_eq!(steps, vec![2000, 3000, 4000]);
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let result = find_latest_checkpoint(dir.path().join("nothing"));
        assert!(matches!(result, Err(Error::CheckpointNotFound(_))));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_checkpoint(
            &tiny_model(),
            &TrainingMetrics::new(),
            0,
            dir.path(),
            DatasetKind::Mnist,
            0,
        )
        .unwrap();

        let mut other = Acgan::with_defaults(8, 5, 4, Device::Cpu);
        assert!(matches!(load_checkpoint(&mut other, &path), Err(Error::Config(_))));
    }
}
