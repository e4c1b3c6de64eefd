//! Model module containing the ACGAN architecture components
//!
//! This module provides:
//! - Conditional generator (noise + label -> image)
//! - Discriminator producing shared features and a real/fake logit
//! - Auxiliary classifier head predicting the class from those features
//! - ACGAN wrapper owning one parameter store per network

mod acgan;
mod classifier;
mod discriminator;
mod generator;

pub use acgan::{
    AcganOptimizers, AdamConfig, Acgan, LabelMode, CLASSIFIER_FILE, DISCRIMINATOR_FILE,
    GENERATOR_FILE,
};
pub use classifier::{Classifier, ClassifierConfig};
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{Generator, GeneratorConfig};
