//! Auxiliary classifier head
//!
//! Predicts the class of an image from the discriminator's shared features.
//! Its parameters live in their own variable store so they can be driven by
//! a dedicated optimizer.

use tch::{nn, nn::Module, Tensor};

/// Classifier head configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Width of the incoming feature vector
    pub input_dim: i64,
    /// Width of each hidden layer
    pub hidden_dim: i64,
    /// Number of Dense + ReLU layers before the output layer
    pub hidden_layers: usize,
    /// Number of classes
    pub num_classes: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_dim: 128,
            hidden_dim: 128,
            hidden_layers: 3,
            num_classes: 10,
        }
    }
}

/// Classifier head: `hidden_layers` x (Dense + ReLU), then Dense(num_classes)
#[derive(Debug)]
pub struct Classifier {
    config: ClassifierConfig,
    hidden: Vec<nn::Linear>,
    out: nn::Linear,
}

impl Classifier {
    pub fn new(vs: &nn::Path, config: ClassifierConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_layers);
        let mut in_dim = config.input_dim;
        for i in 0..config.hidden_layers {
            hidden.push(nn::linear(
                vs / format!("fc{}", i + 1),
                in_dim,
                config.hidden_dim,
                Default::default(),
            ));
            in_dim = config.hidden_dim;
        }
        let out = nn::linear(vs / "out", in_dim, config.num_classes, Default::default());

        Self { config, hidden, out }
    }

    /// Class logits of shape (batch_size, num_classes)
    pub fn forward_t(&self, features: &Tensor, _train: bool) -> Tensor {
        let x = self
            .hidden
            .iter()
            .fold(features.shallow_clone(), |x, layer| layer.forward(&x).relu());
        self.out.forward(&x)
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    #[test]
    fn test_classifier_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let classifier = Classifier::new(&vs.root(), ClassifierConfig::default());

        let features = Tensor::randn([5, 128], (Kind::Float, Device::Cpu));
        assert_eq!(classifier.forward_t(&features, false).size(), vec![5, 10]);
    }

    #[test]
    fn test_classifier_without_hidden_layers() {
        let vs = VarStore::new(Device::Cpu);
        let config = ClassifierConfig {
            hidden_layers: 0,
            ..Default::default()
        };
        let classifier = Classifier::new(&vs.root(), config);

        let features = Tensor::randn([2, 128], (Kind::Float, Device::Cpu));
        assert_eq!(classifier.forward_t(&features, true).size(), vec![2, 10]);
        // Only the output layer: weight + bias
        assert_eq!(vs.trainable_variables().len(), 2);
    }
}
