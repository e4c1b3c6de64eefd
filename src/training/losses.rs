//! Loss functions for ACGAN training
//!
//! Adversarial terms use Binary Cross Entropy on logits; the auxiliary
//! classification term uses softmax cross entropy against one-hot labels.

use tch::{Kind, Reduction, Tensor};

use crate::model::Acgan;

/// Generator adversarial loss: -log(D(G(z, y)))
///
/// The generator wants the discriminator to output 1 (real) for fake samples.
pub fn generator_loss(fake_logit: &Tensor) -> Tensor {
    let targets = Tensor::ones_like(fake_logit);
    fake_logit.binary_cross_entropy_with_logits::<Tensor>(&targets, None, None, Reduction::Mean)
}

/// Discriminator adversarial loss: -log(D(x)) - log(1 - D(G(z, y)))
pub fn discriminator_loss(real_logit: &Tensor, fake_logit: &Tensor) -> Tensor {
    discriminator_loss_smoothed(real_logit, fake_logit, 1.0)
}

/// Discriminator loss with one-sided label smoothing
///
/// Real targets are `smooth_real` (e.g. 0.9) instead of 1, fake targets stay 0.
pub fn discriminator_loss_smoothed(
    real_logit: &Tensor,
    fake_logit: &Tensor,
    smooth_real: f64,
) -> Tensor {
    let real_targets = Tensor::full_like(real_logit, smooth_real);
    let real_loss = real_logit.binary_cross_entropy_with_logits::<Tensor>(
        &real_targets,
        None,
        None,
        Reduction::Mean,
    );

    let fake_targets = Tensor::zeros_like(fake_logit);
    let fake_loss = fake_logit.binary_cross_entropy_with_logits::<Tensor>(
        &fake_targets,
        None,
        None,
        Reduction::Mean,
    );

    real_loss + fake_loss
}

/// Mean softmax cross entropy between class logits and one-hot labels
pub fn classification_loss(class_logits: &Tensor, labels: &Tensor) -> Tensor {
    let batch_size = class_logits.size()[0].max(1) as f64;
    let log_probs = class_logits.log_softmax(-1, Kind::Float);
    -(labels.to_kind(Kind::Float) * log_probs).sum(Kind::Float) / batch_size
}

/// Fraction of rows whose arg-max class equals the target class
pub fn class_accuracy(class_logits: &Tensor, classes: &Tensor) -> f64 {
    class_logits
        .argmax(-1, false)
        .eq_tensor(classes)
        .to_kind(Kind::Float)
        .mean(Kind::Float)
        .double_value(&[])
}

/// Fraction of logits on the expected side of the decision boundary
pub fn realness_accuracy(logit: &Tensor, real: bool) -> f64 {
    let hits = if real { logit.ge(0.0) } else { logit.lt(0.0) };
    hits.to_kind(Kind::Float).mean(Kind::Float).double_value(&[])
}

/// All loss terms of one ACGAN evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcganLosses {
    /// Adversarial + real classification loss minimized by D and C
    pub d_loss: f64,
    /// Adversarial + fake classification loss minimized by G
    pub g_loss: f64,
    /// Classification loss on real plus fake images
    pub c_loss: f64,
    /// Classifier accuracy on real images
    pub real_class_acc: f64,
    /// Classifier accuracy on generated images (against the conditioning label)
    pub fake_class_acc: f64,
    /// Discriminator accuracy on real images
    pub real_acc: f64,
    /// Discriminator accuracy on generated images
    pub fake_acc: f64,
}

/// Evaluate every loss term on one batch without tracking gradients
///
/// All networks run in inference mode: BatchNorm uses its running statistics
/// and none of them are updated. The reported losses therefore describe the
/// model as `generate` uses it, not the batch-statistics loss the preceding
/// optimizer step minimized.
pub fn evaluate_losses(
    model: &Acgan,
    real: &Tensor,
    labels: &Tensor,
    classes: &Tensor,
    noise: &Tensor,
) -> AcganLosses {
    tch::no_grad(|| {
        let fake = model.generator.forward_t(noise, labels, false);
        let (real_cls, real_logit) = model.discriminate_t(real, false);
        let (fake_cls, fake_logit) = model.discriminate_t(&fake, false);

        let c_real = classification_loss(&real_cls, labels);
        let c_fake = classification_loss(&fake_cls, labels);

        let d_loss = discriminator_loss(&real_logit, &fake_logit) + &c_real;
        let g_loss = generator_loss(&fake_logit) + &c_fake;
        let c_loss = c_real + c_fake;

        AcganLosses {
            d_loss: d_loss.double_value(&[]),
            g_loss: g_loss.double_value(&[]),
            c_loss: c_loss.double_value(&[]),
            real_class_acc: class_accuracy(&real_cls, classes),
            fake_class_acc: class_accuracy(&fake_cls, classes),
            real_acc: realness_accuracy(&real_logit, true),
            fake_acc: realness_accuracy(&fake_logit, false),
        }
    })
}
