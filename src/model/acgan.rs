//! ACGAN wrapper combining Generator, Discriminator and Classifier
//!
//! Each network owns its own `VarStore`, so every parameter subset can be
//! bound to an independent optimizer and checkpointed as its own file.

use std::path::Path;

use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Kind, Tensor};

use super::classifier::{Classifier, ClassifierConfig};
use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{Generator, GeneratorConfig};
use crate::error::{Error, Result};

pub const GENERATOR_FILE: &str = "generator.ot";
pub const DISCRIMINATOR_FILE: &str = "discriminator.ot";
pub const CLASSIFIER_FILE: &str = "classifier.ot";

/// How the images of a generated grid are labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// Uniformly random classes
    #[default]
    Random,
    /// Every image shows the same class
    Fixed(i64),
    /// Image `i` shows class `i % num_classes`
    Ordered,
}

impl LabelMode {
    pub fn new(class: Option<i64>, ordered: bool) -> Self {
        match (class, ordered) {
            (Some(class), _) => LabelMode::Fixed(class),
            (None, true) => LabelMode::Ordered,
            (None, false) => LabelMode::Random,
        }
    }
}

/// Hyperparameters of the three Adam optimizers
#[derive(Debug, Clone)]
pub struct AdamConfig {
    pub generator_lr: f64,
    pub discriminator_lr: f64,
    pub classifier_lr: f64,
    pub beta1: f64,
    pub beta2: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            generator_lr: 1e-3,
            discriminator_lr: 1e-3,
            classifier_lr: 1e-3,
            beta1: 0.5,
            beta2: 0.999,
        }
    }
}

/// One optimizer per parameter subset
pub struct AcganOptimizers {
    pub generator: nn::Optimizer,
    pub discriminator: nn::Optimizer,
    pub classifier: nn::Optimizer,
}

/// Complete ACGAN model
pub struct Acgan {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network (real/fake)
    pub discriminator: Discriminator,
    /// Auxiliary classifier head on the discriminator features
    pub classifier: Classifier,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    /// Variable store for classifier
    pub cls_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl Acgan {
    /// Create a new ACGAN model
    pub fn new(
        gen_config: GeneratorConfig,
        disc_config: DiscriminatorConfig,
        cls_config: ClassifierConfig,
        device: Device,
    ) -> Self {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);
        let cls_vs = VarStore::new(device);

        let generator = Generator::new(&(gen_vs.root() / "generator"), gen_config);
        let discriminator = Discriminator::new(&(disc_vs.root() / "discriminator"), disc_config);
        let classifier = Classifier::new(&(cls_vs.root() / "classifier"), cls_config);

        Self {
            generator,
            discriminator,
            classifier,
            gen_vs,
            disc_vs,
            cls_vs,
            device,
        }
    }

    /// Create ACGAN with the default architecture for given dimensions
    ///
    /// # Arguments
    ///
    /// * `image_size` - Side length of the square images (28 for MNIST)
    /// * `num_classes` - Number of conditioning classes
    /// * `noise_dim` - Size of the noise vector
    /// * `device` - Device to create model on
    pub fn with_defaults(image_size: i64, num_classes: i64, noise_dim: i64, device: Device) -> Self {
        let gen_config = GeneratorConfig {
            noise_dim,
            num_classes,
            image_size,
            ..Default::default()
        };
        let disc_config = DiscriminatorConfig {
            image_size,
            ..Default::default()
        };
        let cls_config = ClassifierConfig {
            input_dim: disc_config.hidden_dim,
            num_classes,
            ..Default::default()
        };

        Self::new(gen_config, disc_config, cls_config, device)
    }

    /// Class logits and real/fake logit for a batch of images
    pub fn discriminate_t(&self, images: &Tensor, train: bool) -> (Tensor, Tensor) {
        let features = self.discriminator.features_t(images, train);
        let class_logits = self.classifier.forward_t(&features, train);
        let logit = self.discriminator.logit(&features);
        (class_logits, logit)
    }

    /// Softmax class probabilities (inference mode)
    pub fn class_probabilities(&self, images: &Tensor) -> Tensor {
        let (class_logits, _) = self.discriminate_t(images, false);
        class_logits.softmax(-1, Kind::Float)
    }

    /// Predicted class indices (inference mode)
    pub fn predict_classes(&self, images: &Tensor) -> Tensor {
        let (class_logits, _) = self.discriminate_t(images, false);
        class_logits.argmax(-1, false)
    }

    /// Uniform noise in [-1, 1]
    pub fn sample_noise(&self, num_samples: i64) -> Tensor {
        self.generator.sample_noise(num_samples, self.device)
    }

    /// One-hot labels of uniformly random classes
    pub fn random_labels(&self, num_samples: i64) -> Tensor {
        let classes = Tensor::randint(
            self.num_classes(),
            [num_samples],
            (Kind::Int64, self.device),
        );
        classes.onehot(self.num_classes())
    }

    /// One-hot labels for the given class indices
    ///
    /// Fails when a class lies outside `0..num_classes`.
    pub fn labels_for(&self, classes: &[i64]) -> Result<Tensor> {
        let num_classes = self.num_classes();
        if let Some(&bad) = classes.iter().find(|&&c| !(0..num_classes).contains(&c)) {
            return Err(Error::Config(format!(
                "class {} out of range 0..{}",
                bad, num_classes
            )));
        }

        Ok(Tensor::from_slice(classes)
            .to_device(self.device)
            .onehot(num_classes))
    }

    /// Labels for `count` generated images according to `mode`
    pub fn grid_labels(&self, mode: LabelMode, count: i64) -> Result<Tensor> {
        if count < 1 {
            return Err(Error::Config(format!("cannot label {} images", count)));
        }

        match mode {
            LabelMode::Random => Ok(self.random_labels(count)),
            LabelMode::Fixed(class) => self.labels_for(&vec![class; count as usize]),
            LabelMode::Ordered => {
                let classes: Vec<i64> = (0..count).map(|i| i % self.num_classes()).collect();
                self.labels_for(&classes)
            }
        }
    }

    /// Generate one image per label with fresh noise
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_labels, channels, size, size)
    pub fn generate(&self, labels: &Tensor) -> Tensor {
        let noise = self.sample_noise(labels.size()[0]);
        self.generate_from_noise(&noise, labels)
    }

    /// Generate images from specific noise vectors
    pub fn generate_from_noise(&self, noise: &Tensor, labels: &Tensor) -> Tensor {
        tch::no_grad(|| self.generator.generate(noise, labels))
    }

    /// Interpolate between two noise vectors for a fixed class
    ///
    /// # Returns
    ///
    /// Tensor of shape (steps, channels, size, size)
    pub fn interpolate(
        &self,
        z1: &Tensor,
        z2: &Tensor,
        class: i64,
        steps: i64,
    ) -> Result<Tensor> {
        if steps < 1 {
            return Err(Error::Config(format!(
                "interpolation needs at least one step, got {}",
                steps
            )));
        }
        let labels = self.labels_for(&vec![class; steps as usize])?;

        let noise: Vec<Tensor> = (0..steps)
            .map(|i| {
                let alpha = if steps > 1 {
                    i as f64 / (steps - 1) as f64
                } else {
                    0.0
                };
                z1 * (1.0 - alpha) + z2 * alpha
            })
            .collect();
        let noise = Tensor::stack(&noise, 0);

        Ok(self.generate_from_noise(&noise, &labels))
    }

    /// Build the optimizers (Adam with GAN betas)
    pub fn optimizers(&self, config: &AdamConfig) -> Result<AcganOptimizers> {
        let adam = || nn::Adam {
            beta1: config.beta1,
            beta2: config.beta2,
            wd: 0.0,
            ..Default::default()
        };

        Ok(AcganOptimizers {
            generator: adam().build(&self.gen_vs, config.generator_lr)?,
            discriminator: adam().build(&self.disc_vs, config.discriminator_lr)?,
            classifier: adam().build(&self.cls_vs, config.classifier_lr)?,
        })
    }

    /// Save model weights into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.gen_vs.save(dir.join(GENERATOR_FILE))?;
        self.disc_vs.save(dir.join(DISCRIMINATOR_FILE))?;
        self.cls_vs.save(dir.join(CLASSIFIER_FILE))?;
        Ok(())
    }

    /// Load model weights from `dir`
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        self.gen_vs.load(dir.join(GENERATOR_FILE))?;
        self.disc_vs.load(dir.join(DISCRIMINATOR_FILE))?;
        self.cls_vs.load(dir.join(CLASSIFIER_FILE))?;
        Ok(())
    }

    pub fn noise_dim(&self) -> i64 {
        self.generator.config().noise_dim
    }

    pub fn num_classes(&self) -> i64 {
        self.generator.config().num_classes
    }

    pub fn image_size(&self) -> i64 {
        self.generator.config().image_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acgan_creation() {
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);

        assert_eq!(acgan.noise_dim(), 100);
        assert_eq!(acgan.num_classes(), 10);
        assert_eq!(acgan.image_size(), 28);
    }

    #[test]
    fn test_parameter_subsets_are_disjoint() {
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);

        let gen_vars = acgan.gen_vs.variables();
        let disc_vars = acgan.disc_vs.variables();
        let cls_vars = acgan.cls_vs.variables();

        assert!(gen_vars.keys().all(|k| k.starts_with("generator")));
        assert!(disc_vars.keys().all(|k| k.starts_with("discriminator")));
        assert!(cls_vars.keys().all(|k| k.starts_with("classifier")));
        assert!(!gen_vars.is_empty() && !disc_vars.is_empty() && !cls_vars.is_empty());
    }

    #[test]
    fn test_acgan_generate() {
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);

        let labels = acgan.labels_for(&[0, 1, 2, 3]).unwrap();
        let samples = acgan.generate(&labels);
        assert_eq!(samples.size(), vec![4, 1, 28, 28]);
    }

    #[test]
    fn test_acgan_discriminate() {
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);

        let images = Tensor::randn([3, 1, 28, 28], (Kind::Float, Device::Cpu));
        let (class_logits, logit) = acgan.discriminate_t(&images, false);
        assert_eq!(class_logits.size(), vec![3, 10]);
        assert_eq!(logit.size(), vec![3, 1]);

        // Each of the 3 rows sums to one
        let probs = acgan.class_probabilities(&images);
        assert!((probs.sum(Kind::Float).double_value(&[]) - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_random_labels_are_one_hot() {
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);

        let labels = acgan.random_labels(16);
        assert_eq!(labels.size(), vec![16, 10]);
        assert_eq!(labels.sum(Kind::Float).double_value(&[]), 16.0);
        assert_eq!(labels.max().double_value(&[]), 1.0);
    }

    #[test]
    fn test_acgan_interpolate() {
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);

        let z1 = acgan.sample_noise(1).squeeze_dim(0);
        let z2 = acgan.sample_noise(1).squeeze_dim(0);

        let interpolated = acgan.interpolate(&z1, &z2, 4, 6).unwrap();
        assert_eq!(interpolated.size(), vec![6, 1, 28, 28]);
    }

    #[test]
    fn test_interpolate_rejects_bad_arguments() {
        let acgan = Acgan::with_defaults(8, 3, 4, Device::Cpu);
        let z1 = acgan.sample_noise(1).squeeze_dim(0);
        let z2 = acgan.sample_noise(1).squeeze_dim(0);

        assert!(matches!(acgan.interpolate(&z1, &z2, 0, 0), Err(Error::Config(_))));
        assert!(matches!(acgan.interpolate(&z1, &z2, 0, -2), Err(Error::Config(_))));
        assert!(matches!(acgan.interpolate(&z1, &z2, 3, 4), Err(Error::Config(_))));
    }

    #[test]
    fn test_labels_for_rejects_out_of_range() {
        let acgan = Acgan::with_defaults(8, 10, 4, Device::Cpu);

        assert!(matches!(acgan.labels_for(&[10]), Err(Error::Config(_))));
        assert!(matches!(acgan.labels_for(&[0, -1]), Err(Error::Config(_))));
        assert_eq!(acgan.labels_for(&[9]).unwrap().size(), vec![1, 10]);
    }

    #[test]
    fn test_label_mode_from_flags() {
        assert_eq!(LabelMode::new(Some(4), false), LabelMode::Fixed(4));
        assert_eq!(LabelMode::new(None, true), LabelMode::Ordered);
        assert_eq!(LabelMode::new(None, false), LabelMode::Random);
    }

    #[test]
    fn test_ordered_grid_labels_wrap_around() {
        let acgan = Acgan::with_defaults(8, 3, 4, Device::Cpu);

        let labels = acgan.grid_labels(LabelMode::Ordered, 7).unwrap();
        let classes = Vec::<i64>::try_from(&labels.argmax(-1, false)).unwrap();
        assert_eq!(classes, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_fixed_grid_labels() {
        let acgan = Acgan::with_defaults(8, 3, 4, Device::Cpu);

        let labels = acgan.grid_labels(LabelMode::Fixed(2), 4).unwrap();
        let classes = Vec::<i64>::try_from(&labels.argmax(-1, false)).unwrap();
        assert_eq!(classes, vec![2; 4]);

        let err = acgan.grid_labels(LabelMode::Fixed(3), 4).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_default_grid_is_one_hot() {
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);

        // 5x5 grid
        let labels = acgan.grid_labels(LabelMode::default(), 25).unwrap();
        assert_eq!(labels.size(), vec![25, 10]);
        assert_eq!(labels.sum(Kind::Float).double_value(&[]), 25.0);
        assert_eq!(labels.max().double_value(&[]), 1.0);

        assert!(acgan.grid_labels(LabelMode::Random, 0).is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let acgan = Acgan::with_defaults(28, 10, 100, Device::Cpu);
        acgan.save(dir.path()).unwrap();

        let mut restored = Acgan::with_defaults(28, 10, 100, Device::Cpu);
        restored.load(dir.path()).unwrap();

        let noise = acgan.sample_noise(2);
        let labels = acgan.labels_for(&[5, 6]).unwrap();
        let a = acgan.generate_from_noise(&noise, &labels);
        let b = restored.generate_from_noise(&noise, &labels);
        assert!(a.allclose(&b, 1e-6, 1e-6, false));
    }
}
