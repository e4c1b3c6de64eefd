//! Discriminator network for ACGAN
//!
//! The Discriminator extracts features from an image and scores it as real
//! or fake. The shared features also feed the auxiliary classifier head.

use tch::{nn, nn::Module, Tensor};

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Channels of the input image
    pub image_channels: i64,
    /// Side length of the square input image (must be divisible by 4)
    pub image_size: i64,
    /// Filters of the first convolution
    pub conv1_filters: i64,
    /// Filters of the second convolution
    pub conv2_filters: i64,
    /// Width of the dense feature layers
    pub hidden_dim: i64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            image_channels: 1,
            image_size: 28,
            conv1_filters: 32,
            conv2_filters: 64,
            hidden_dim: 128,
        }
    }
}

/// Discriminator network
///
/// Architecture:
/// 1. Conv2d 5x5 "same" + ReLU + MaxPool 2, twice
/// 2. Flatten, two Dense(hidden_dim) + ReLU layers (shared features)
/// 3. Dense(1) real/fake logit
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    fc1: nn::Linear,
    fc2: nn::Linear,
    logit: nn::Linear,
}

impl Discriminator {
    /// Create a new Discriminator network
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Self {
        let same = nn::ConvConfig {
            padding: 2,
            ..Default::default()
        };

        let conv1 = nn::conv2d(vs / "conv1", config.image_channels, config.conv1_filters, 5, same);
        let conv2 = nn::conv2d(vs / "conv2", config.conv1_filters, config.conv2_filters, 5, same);

        // Two 2x2 poolings quarter each side
        let pooled = config.image_size / 4;
        let flat_size = config.conv2_filters * pooled * pooled;

        let fc1 = nn::linear(vs / "fc1", flat_size, config.hidden_dim, Default::default());
        let fc2 = nn::linear(vs / "fc2", config.hidden_dim, config.hidden_dim, Default::default());
        let logit = nn::linear(vs / "logit", config.hidden_dim, 1, Default::default());

        Self {
            config,
            conv1,
            conv2,
            fc1,
            fc2,
            logit,
        }
    }

    /// Shared feature vector of shape (batch_size, hidden_dim)
    pub fn features_t(&self, images: &Tensor, _train: bool) -> Tensor {
        let batch_size = images.size()[0];

        let x = self.conv1.forward(images).relu().max_pool2d_default(2);
        let x = self.conv2.forward(&x).relu().max_pool2d_default(2);

        let x = x.view([batch_size, -1]);
        let x = self.fc1.forward(&x).relu();
        self.fc2.forward(&x).relu()
    }

    /// Real/fake logit from precomputed features
    pub fn logit(&self, features: &Tensor) -> Tensor {
        self.logit.forward(features)
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `images` - Tensor of shape (batch_size, channels, size, size)
    /// * `train` - Whether in training mode
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with logits (not sigmoid)
    pub fn forward_t(&self, images: &Tensor, train: bool) -> Tensor {
        self.logit(&self.features_t(images, train))
    }

    /// Probability of being real (inference mode)
    pub fn score(&self, images: &Tensor) -> Tensor {
        self.forward_t(images, false).sigmoid()
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

impl nn::ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    #[test]
    fn test_discriminator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default());

        let input = Tensor::randn([4, 1, 28, 28], (Kind::Float, Device::Cpu));
        assert_eq!(disc.forward_t(&input, false).size(), vec![4, 1]);
        assert_eq!(disc.features_t(&input, false).size(), vec![4, 128]);
    }

    #[test]
    fn test_discriminator_score_is_probability() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default());

        let input = Tensor::randn([2, 1, 28, 28], (Kind::Float, Device::Cpu));
        let probs = disc.score(&input);

        let min_val: f64 = probs.min().double_value(&[]);
        let max_val: f64 = probs.max().double_value(&[]);
        assert!(min_val >= 0.0 && max_val <= 1.0);
    }
}
