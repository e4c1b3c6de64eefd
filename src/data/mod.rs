//! Data module for loading labeled image datasets
//!
//! This module provides:
//! - IDX file reading (MNIST / Fashion-MNIST format)
//! - Normalization to [-1, 1] and one-hot label encoding
//! - DataLoader for random and sequential batching
//! - Downloader for the public dataset mirrors

mod dataset;
mod fetcher;
pub mod idx;
mod loader;

pub use dataset::{one_hot, DatasetKind, ImageDataset, Split};
pub use fetcher::DatasetFetcher;
pub use idx::{read_idx_images, read_idx_labels, IdxImages};
pub use loader::{Batch, DataLoader};
