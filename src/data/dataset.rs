//! Labeled image datasets
//!
//! Images are stored as `[N, 1, rows, cols]` with pixels scaled to `[-1, 1]`
//! so real samples share the range of the generator's tanh output.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array2, Array4, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::idx::{read_idx_images, read_idx_labels, IdxImages};
use crate::error::{Error, Result};

/// Supported datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    #[default]
    Mnist,
    FashionMnist,
}

impl DatasetKind {
    /// Resolve a dataset by name; unknown names fall back to MNIST
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "mnist" => DatasetKind::Mnist,
            "fashion_mnist" | "fashion-mnist" | "fashion" => DatasetKind::FashionMnist,
            other => {
                warn!("Unknown dataset '{}', falling back to mnist", other);
                DatasetKind::Mnist
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Mnist => "mnist",
            DatasetKind::FashionMnist => "fashion_mnist",
        }
    }

    /// Base URL of the public mirror serving the gzipped IDX files
    pub fn mirror_url(&self) -> &'static str {
        match self {
            DatasetKind::Mnist => "https://storage.googleapis.com/cvdf-datasets/mnist",
            DatasetKind::FashionMnist => {
                "http://fashion-mnist.s3-website.eu-central-1.amazonaws.com"
            }
        }
    }

    /// Human readable class names
    pub fn class_names(&self) -> [&'static str; 10] {
        match self {
            DatasetKind::Mnist => ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
            DatasetKind::FashionMnist => [
                "T-shirt/top",
                "Trouser",
                "Pullover",
                "Dress",
                "Coat",
                "Sandal",
                "Shirt",
                "Sneaker",
                "Bag",
                "Ankle boot",
            ],
        }
    }
}

impl FromStr for DatasetKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(DatasetKind::from_name(s))
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Train or test split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn prefix(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "t10k",
        }
    }

    /// File name of the image IDX file for this split
    pub fn images_file(&self) -> String {
        format!("{}-images-idx3-ubyte", self.prefix())
    }

    /// File name of the label IDX file for this split
    pub fn labels_file(&self) -> String {
        format!("{}-labels-idx1-ubyte", self.prefix())
    }
}

/// Normalized images with one-hot labels
#[derive(Debug, Clone)]
pub struct ImageDataset {
    /// Images of shape (N, 1, rows, cols) in [-1, 1]
    images: Array4<f32>,
    /// Class index of every image
    classes: Vec<u8>,
    /// One-hot labels of shape (N, num_classes)
    labels: Array2<f32>,
    num_classes: usize,
}

impl ImageDataset {
    /// Load a split from a directory of IDX files
    pub fn load(dir: impl AsRef<Path>, split: Split, num_classes: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let images = read_idx_images(dir.join(split.images_file()))?;
        let labels = read_idx_labels(dir.join(split.labels_file()))?;

        let dataset = Self::from_parts(images, labels, num_classes)?;
        info!(
            "Loaded {:?} split from {}: {} images of {}x{}",
            split,
            dir.display(),
            dataset.len(),
            dataset.image_rows(),
            dataset.image_cols()
        );
        Ok(dataset)
    }

    /// Build a dataset from raw IDX contents
    pub fn from_parts(images: IdxImages, classes: Vec<u8>, num_classes: usize) -> Result<Self> {
        if images.len() != classes.len() {
            return Err(Error::Dataset(format!(
                "{} images but {} labels",
                images.len(),
                classes.len()
            )));
        }
        if let Some(&bad) = classes.iter().find(|&&c| c as usize >= num_classes) {
            return Err(Error::Dataset(format!(
                "label {} out of range for {} classes",
                bad, num_classes
            )));
        }

        let images = images
            .pixels
            .mapv(|p| p as f32 / 127.5 - 1.0)
            .insert_axis(Axis(1));
        let labels = one_hot(&classes, num_classes);

        Ok(Self {
            images,
            classes,
            labels,
            num_classes,
        })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn image_rows(&self) -> usize {
        self.images.shape()[2]
    }

    pub fn image_cols(&self) -> usize {
        self.images.shape()[3]
    }

    pub fn images(&self) -> &Array4<f32> {
        &self.images
    }

    pub fn labels(&self) -> &Array2<f32> {
        &self.labels
    }

    pub fn classes(&self) -> &[u8] {
        &self.classes
    }

    /// Number of images per class
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for &c in &self.classes {
            counts[c as usize] += 1;
        }
        counts
    }
}

/// One-hot encode class indices
pub fn one_hot(classes: &[u8], num_classes: usize) -> Array2<f32> {
    let mut encoded = Array2::<f32>::zeros((classes.len(), num_classes));
    for (row, &class) in classes.iter().enumerate() {
        encoded[[row, class as usize]] = 1.0;
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::idx::{encode_idx_images, encode_idx_labels};
    use ndarray::Array3;

    fn raw_images(count: usize) -> IdxImages {
        let pixels = Array3::from_shape_fn((count, 4, 4), |(n, r, c)| {
            if (n + r + c) % 2 == 0 { 255 } else { 0 }
        });
        IdxImages {
            rows: 4,
            cols: 4,
            pixels,
        }
    }

    #[test]
    fn test_one_hot() {
        let encoded = one_hot(&[2, 0], 3);
        assert_eq!(encoded.shape(), &[2, 3]);
        assert_eq!(encoded.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
        assert_eq!(encoded.row(1).to_vec(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_from_parts_normalizes() {
        let dataset = ImageDataset::from_parts(raw_images(2), vec![1, 9], 10).unwrap();

        assert_eq!(dataset.images().shape(), &[2, 1, 4, 4]);
        assert_eq!(dataset.images()[[0, 0, 0, 0]], 1.0);
        assert_eq!(dataset.images()[[0, 0, 0, 1]], -1.0);
        assert_eq!(dataset.labels()[[1, 9]], 1.0);
        assert_eq!(dataset.class_counts()[1], 1);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let result = ImageDataset::from_parts(raw_images(3), vec![0, 1], 10);
        assert!(matches!(result, Err(Error::Dataset(_))));
    }

    #[test]
    fn test_label_out_of_range_rejected() {
        let result = ImageDataset::from_parts(raw_images(1), vec![10], 10);
        assert!(matches!(result, Err(Error::Dataset(_))));
    }

    #[test]
    fn test_dataset_kind_fallback() {
        assert_eq!(DatasetKind::from_name("fashion_mnist"), DatasetKind::FashionMnist);
        assert_eq!(DatasetKind::from_name("MNIST"), DatasetKind::Mnist);
        assert_eq!(DatasetKind::from_name("cifar10"), DatasetKind::Mnist);
    }

    #[test]
    fn test_load_split_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_images(5);
        std::fs::write(
            dir.path().join(Split::Test.images_file()),
            encode_idx_images(&raw.pixels),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(Split::Test.labels_file()),
            encode_idx_labels(&[0, 1, 2, 3, 4]),
        )
        .unwrap();

        let dataset = ImageDataset::load(dir.path(), Split::Test, 10).unwrap();
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.image_rows(), 4);
    }
}
