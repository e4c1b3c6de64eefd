//! Conditional generator network
//!
//! The Generator maps a noise vector and a one-hot class label to an image.
//! Architecture uses transposed 2D convolutions to upsample a 7x7 feature map
//! to the full 28x28 image.

use tch::{nn, nn::Module, nn::ModuleT, Device, Kind, Tensor};

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the noise vector
    pub noise_dim: i64,
    /// Number of classes (length of the one-hot label)
    pub num_classes: i64,
    /// Channels of the projected feature map
    pub base_channels: i64,
    /// Side length of the square output image (must be divisible by 4)
    pub image_size: i64,
    /// Channels of the output image
    pub image_channels: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            noise_dim: 100,
            num_classes: 10,
            base_channels: 128,
            image_size: 28,
            image_channels: 1,
        }
    }
}

impl GeneratorConfig {
    /// Side length of the projected feature map
    pub fn init_size(&self) -> i64 {
        self.image_size / 4
    }
}

/// Generator network
///
/// Architecture:
/// 1. Concatenate noise and one-hot label
/// 2. Dense projection to (base_channels, size/4, size/4), BatchNorm, ReLU
/// 3. ConvTranspose2d stride 2 to base_channels/2, BatchNorm, ReLU
/// 4. ConvTranspose2d stride 2 to image channels, Tanh
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    fc: nn::Linear,
    bn0: nn::BatchNorm,
    deconv1: nn::ConvTranspose2D,
    bn1: nn::BatchNorm,
    deconv2: nn::ConvTranspose2D,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let base = config.base_channels;
        let init = config.init_size();

        let fc = nn::linear(
            vs / "fc",
            config.noise_dim + config.num_classes,
            base * init * init,
            Default::default(),
        );
        let bn0 = nn::batch_norm2d(vs / "bn0", base, Default::default());

        // kernel 3, stride 2, padding 1, output_padding 1 doubles the spatial size
        let deconv_config = nn::ConvTransposeConfig {
            stride: 2,
            padding: 1,
            output_padding: 1,
            ..Default::default()
        };

        let deconv1 = nn::conv_transpose2d(vs / "deconv1", base, base / 2, 3, deconv_config);
        let bn1 = nn::batch_norm2d(vs / "bn1", base / 2, Default::default());

        let deconv2 = nn::conv_transpose2d(
            vs / "deconv2",
            base / 2,
            config.image_channels,
            3,
            deconv_config,
        );

        Self {
            config,
            fc,
            bn0,
            deconv1,
            bn1,
            deconv2,
        }
    }

    /// Generate images from noise and labels
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, noise_dim)
    /// * `labels` - One-hot tensor of shape (batch_size, num_classes)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, channels, image_size, image_size) in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, labels: &Tensor, train: bool) -> Tensor {
        let batch_size = noise.size()[0];
        let init = self.config.init_size();

        let x = Tensor::cat(&[noise, &labels.to_kind(Kind::Float)], 1);
        let x = self
            .fc
            .forward(&x)
            .view([batch_size, self.config.base_channels, init, init]);
        let x = self.bn0.forward_t(&x, train).relu();

        let x = self.deconv1.forward(&x);
        let x = self.bn1.forward_t(&x, train).relu();

        self.deconv2.forward(&x).tanh()
    }

    /// Generate images (inference mode)
    pub fn generate(&self, noise: &Tensor, labels: &Tensor) -> Tensor {
        self.forward_t(noise, labels, false)
    }

    /// Uniform noise in [-1, 1] of shape (num_samples, noise_dim)
    pub fn sample_noise(&self, num_samples: i64, device: Device) -> Tensor {
        Tensor::rand([num_samples, self.config.noise_dim], (Kind::Float, device)) * 2.0 - 1.0
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn::VarStore;

    #[test]
    fn test_generator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default());

        let noise = gen.sample_noise(4, Device::Cpu);
        let labels = Tensor::from_slice(&[0i64, 3, 7, 9]).onehot(10);
        let output = gen.generate(&noise, &labels);

        assert_eq!(output.size(), vec![4, 1, 28, 28]);
    }

    #[test]
    fn test_generator_output_range() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default());

        let noise = gen.sample_noise(2, Device::Cpu);
        let labels = Tensor::from_slice(&[1i64, 2]).onehot(10);
        let output = gen.forward_t(&noise, &labels, true);

        assert!(output.min().double_value(&[]) >= -1.0);
        assert!(output.max().double_value(&[]) <= 1.0);
    }

    #[test]
    fn test_sample_noise_range() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default());

        let noise = gen.sample_noise(64, Device::Cpu);
        assert_eq!(noise.size(), vec![64, 100]);
        assert!(noise.min().double_value(&[]) >= -1.0);
        assert!(noise.max().double_value(&[]) <= 1.0);
    }
}
