//! Training metrics for monitoring ACGAN progress

use std::path::Path;

use super::losses::AcganLosses;
use crate::error::Result;

/// Metrics collected at every report step
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Step at which each report was taken
    pub steps: Vec<usize>,
    pub d_losses: Vec<f64>,
    pub g_losses: Vec<f64>,
    pub c_losses: Vec<f64>,
    /// Classifier accuracy on real images
    pub real_class_acc: Vec<f64>,
    /// Classifier accuracy on generated images
    pub fake_class_acc: Vec<f64>,
    /// Discriminator accuracy on real images
    pub real_acc: Vec<f64>,
    /// Discriminator accuracy on generated images
    pub fake_acc: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the losses evaluated at `step`
    pub fn record(&mut self, step: usize, losses: &AcganLosses) {
        self.steps.push(step);
        self.d_losses.push(losses.d_loss);
        self.g_losses.push(losses.g_loss);
        self.c_losses.push(losses.c_loss);
        self.real_class_acc.push(losses.real_class_acc);
        self.fake_class_acc.push(losses.fake_class_acc);
        self.real_acc.push(losses.real_acc);
        self.fake_acc.push(losses.fake_acc);
    }

    /// Number of recorded reports
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn latest_d_loss(&self) -> Option<f64> {
        self.d_losses.last().copied()
    }

    pub fn latest_g_loss(&self) -> Option<f64> {
        self.g_losses.last().copied()
    }

    pub fn latest_c_loss(&self) -> Option<f64> {
        self.c_losses.last().copied()
    }

    /// Check if training appears to have collapsed
    ///
    /// Over the last `window` reports the discriminator wins easily
    /// (tiny loss) while the generator cannot fool it (huge loss).
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if window == 0 || self.len() < window {
            return false;
        }

        let disc_ma = moving_average(&self.d_losses, window);
        let gen_ma = moving_average(&self.g_losses, window);

        disc_ma < 0.1 && gen_ma > 5.0
    }

    /// Save metrics to CSV file
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record([
            "step",
            "d_loss",
            "g_loss",
            "c_loss",
            "real_class_acc",
            "fake_class_acc",
            "real_acc",
            "fake_acc",
        ])?;

        for i in 0..self.len() {
            writer.write_record([
                self.steps[i].to_string(),
                self.d_losses[i].to_string(),
                self.g_losses[i].to_string(),
                self.c_losses[i].to_string(),
                self.real_class_acc[i].to_string(),
                self.fake_class_acc[i].to_string(),
                self.real_acc[i].to_string(),
                self.fake_acc[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load metrics from CSV file
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.deserialize() {
            let row: MetricsRow = result?;
            metrics.steps.push(row.step);
            metrics.d_losses.push(row.d_loss);
            metrics.g_losses.push(row.g_loss);
            metrics.c_losses.push(row.c_loss);
            metrics.real_class_acc.push(row.real_class_acc);
            metrics.fake_class_acc.push(row.fake_class_acc);
            metrics.real_acc.push(row.real_acc);
            metrics.fake_acc.push(row.fake_acc);
        }

        Ok(metrics)
    }
}

#[derive(serde::Deserialize)]
struct MetricsRow {
    step: usize,
    d_loss: f64,
    g_loss: f64,
    c_loss: f64,
    real_class_acc: f64,
    fake_class_acc: f64,
    real_acc: f64,
    fake_acc: f64,
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EmaTracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EmaTracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value
    pub fn update(&mut self, new_value: f64) {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Average of the last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn losses(d_loss: f64, g_loss: f64) -> AcganLosses {
        AcganLosses {
            d_loss,
            g_loss,
            c_loss: 0.5,
            real_class_acc: 0.9,
            fake_class_acc: 0.8,
            real_acc: 0.6,
            fake_acc: 0.7,
        }
    }

    #[test]
    fn test_training_metrics() {
        let mut metrics = TrainingMetrics::new();

        metrics.record(0, &losses(1.5, 0.8));
        metrics.record(1000, &losses(1.3, 0.75));

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics.latest_d_loss(), Some(1.3));
        assert_eq!(metrics.steps, vec![0, 1000]);
    }

    #[test]
    fn test_mode_collapse_detection() {
        let mut metrics = TrainingMetrics::new();
        for step in 0..3 {
            metrics.record(step, &losses(0.01, 8.0));
        }

        assert!(metrics.check_mode_collapse(3));
        assert!(!metrics.check_mode_collapse(4));
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");

        let mut metrics = TrainingMetrics::new();
        metrics.record(0, &losses(1.0, 2.0));
        metrics.record(1000, &losses(0.9, 1.8));
        metrics.save_csv(&path).unwrap();

        let loaded = TrainingMetrics::load_csv(&path).unwrap();
        assert_eq!(loaded.steps, vec![0, 1000]);
        assert_eq!(loaded.g_losses, vec![2.0, 1.8]);
        assert_eq!(loaded.fake_acc, vec![0.7, 0.7]);
    }

    #[test]
    fn test_ema_tracker() {
        let mut ema = EmaTracker::new(0.5);

        ema.update(10.0);
        assert_eq!(ema.value(), 10.0);

        ema.update(20.0);
        assert_eq!(ema.value(), 15.0); // 0.5 * 20 + 0.5 * 10
    }
}
