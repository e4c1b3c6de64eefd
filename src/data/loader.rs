//! DataLoader for batching and iterating over training data
//!
//! Supports two access patterns:
//! - Random batches sampled with replacement (used by the training loop)
//! - Sequential epoch iteration with optional shuffling (used by evaluation)

use ndarray::{Array2, Array4, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use tch::{Device, Kind, Tensor};

use super::dataset::ImageDataset;
use crate::error::{Error, Result};

/// A minibatch of images with their labels
#[derive(Debug, Clone)]
pub struct Batch {
    /// Images of shape (batch, 1, rows, cols)
    pub images: Array4<f32>,
    /// One-hot labels of shape (batch, num_classes)
    pub labels: Array2<f32>,
    /// Class indices
    pub classes: Vec<u8>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Convert to tensors on `device`: (images, one-hot labels, class indices)
    pub fn to_tensors(&self, device: Device) -> (Tensor, Tensor, Tensor) {
        let images_shape: Vec<i64> = self.images.shape().iter().map(|&d| d as i64).collect();
        let labels_shape: Vec<i64> = self.labels.shape().iter().map(|&d| d as i64).collect();

        let images: Vec<f32> = self.images.iter().copied().collect();
        let labels: Vec<f32> = self.labels.iter().copied().collect();
        let classes: Vec<i64> = self.classes.iter().map(|&c| c as i64).collect();

        (
            Tensor::from_slice(&images).view(images_shape.as_slice()).to_device(device),
            Tensor::from_slice(&labels).view(labels_shape.as_slice()).to_device(device),
            Tensor::from_slice(&classes).to_kind(Kind::Int64).to_device(device),
        )
    }
}

/// DataLoader over an [`ImageDataset`]
pub struct DataLoader {
    dataset: ImageDataset,
    /// Batch size
    batch_size: usize,
    /// Whether to shuffle data each epoch
    shuffle: bool,
    /// Whether to drop the last incomplete batch
    drop_last: bool,
    /// Current indices for iteration
    indices: Vec<usize>,
    /// Current position in iteration
    current_idx: usize,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `dataset` - Images and labels to serve
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    pub fn new(dataset: ImageDataset, batch_size: usize, shuffle: bool, drop_last: bool) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();

        let mut loader = Self {
            dataset,
            batch_size,
            shuffle,
            drop_last,
            indices,
            current_idx: 0,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.dataset.len();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            num_samples.div_ceil(self.batch_size)
        }
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    fn shuffle_indices(&mut self) {
        let mut rng = rand::thread_rng();
        self.indices.shuffle(&mut rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Sample `batch_size` images uniformly with replacement
    pub fn random_batch(&self) -> Result<Batch> {
        let num_samples = self.dataset.len();
        if num_samples == 0 {
            return Err(Error::Dataset("cannot sample from an empty dataset".to_string()));
        }

        let mut rng = rand::thread_rng();
        let picks: Vec<usize> = (0..self.batch_size)
            .map(|_| rng.gen_range(0..num_samples))
            .collect();

        Ok(self.gather(&picks))
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Batch> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);

        // Skip incomplete batch if drop_last
        if self.drop_last && end - start < self.batch_size {
            return None;
        }

        let batch = self.gather(&self.indices[start..end]);
        self.current_idx = end;
        Some(batch)
    }

    /// Iterate over all batches of one epoch
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }

    fn gather(&self, picks: &[usize]) -> Batch {
        Batch {
            images: self.dataset.images().select(Axis(0), picks),
            labels: self.dataset.labels().select(Axis(0), picks),
            classes: picks.iter().map(|&i| self.dataset.classes()[i]).collect(),
        }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::idx::IdxImages;
    use ndarray::Array3;

    fn dataset(count: usize) -> ImageDataset {
        let pixels = Array3::from_shape_fn((count, 2, 2), |(n, _, _)| n as u8);
        let classes = (0..count).map(|n| (n % 10) as u8).collect();
        ImageDataset::from_parts(IdxImages { rows: 2, cols: 2, pixels }, classes, 10).unwrap()
    }

    #[test]
    fn test_dataloader_basic() {
        let mut loader = DataLoader::new(dataset(10), 3, false, false);

        assert_eq!(loader.num_batches(), 4); // ceil(10/3) = 4
        assert_eq!(loader.num_samples(), 10);

        let mut batch_count = 0;
        while let Some(batch) = loader.next_batch() {
            batch_count += 1;
            if batch_count < 4 {
                assert_eq!(batch.len(), 3);
            } else {
                assert_eq!(batch.len(), 1); // Last batch has 1 sample
            }
        }
        assert_eq!(batch_count, 4);
    }

    #[test]
    fn test_dataloader_drop_last() {
        let mut loader = DataLoader::new(dataset(10), 3, false, true);

        assert_eq!(loader.num_batches(), 3); // floor(10/3) = 3

        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 3));
    }

    #[test]
    fn test_batch_keeps_images_and_labels_aligned() {
        let mut loader = DataLoader::new(dataset(12), 12, true, false);
        let batch = loader.next_batch().unwrap();

        for (row, &class) in batch.classes.iter().enumerate() {
            assert_eq!(batch.labels[[row, class as usize]], 1.0);
        }
        assert_eq!(batch.images.shape(), &[12, 1, 2, 2]);
    }

    #[test]
    fn test_random_batch_size() {
        let loader = DataLoader::new(dataset(5), 8, false, false);
        let batch = loader.random_batch().unwrap();

        // Sampling is with replacement, so the batch may exceed the dataset
        assert_eq!(batch.len(), 8);
        assert!(batch.classes.iter().all(|&c| c < 5));
    }

    #[test]
    fn test_random_batch_empty_dataset() {
        let loader = DataLoader::new(dataset(0), 4, false, false);
        assert!(matches!(loader.random_batch(), Err(Error::Dataset(_))));
    }

    #[test]
    fn test_batch_to_tensors() {
        let loader = DataLoader::new(dataset(4), 4, false, false);
        let batch = loader.random_batch().unwrap();
        let (images, labels, classes) = batch.to_tensors(Device::Cpu);

        assert_eq!(images.size(), vec![4, 1, 2, 2]);
        assert_eq!(labels.size(), vec![4, 10]);
        assert_eq!(classes.size(), vec![4]);
    }
}
