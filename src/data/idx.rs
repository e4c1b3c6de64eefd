//! Reader for the IDX binary format used by MNIST and Fashion-MNIST
//!
//! Layout: big-endian `u32` magic number, one big-endian `u32` per dimension,
//! then the payload as unsigned bytes. Images use magic `0x0000_0803`
//! (3 dimensions: count, rows, cols), labels use `0x0000_0801`.
//!
//! Files can be read either decompressed or as the `.gz` archives served by
//! the dataset mirrors.

use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use ndarray::Array3;

use crate::error::{Error, Result};

/// Magic number of an IDX file holding `u8` images
pub const IMAGES_MAGIC: u32 = 0x0000_0803;
/// Magic number of an IDX file holding `u8` labels
pub const LABELS_MAGIC: u32 = 0x0000_0801;

/// Raw image tensor read from an IDX file
#[derive(Debug, Clone)]
pub struct IdxImages {
    pub rows: usize,
    pub cols: usize,
    /// Pixels of shape (count, rows, cols)
    pub pixels: Array3<u8>,
}

impl IdxImages {
    /// Number of images
    pub fn len(&self) -> usize {
        self.pixels.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read an IDX image file (`*-images-idx3-ubyte`)
pub fn read_idx_images(path: impl AsRef<Path>) -> Result<IdxImages> {
    let path = path.as_ref();
    let bytes = read_maybe_gzipped(path)?;
    parse_idx_images(&bytes, path)
}

/// Read an IDX label file (`*-labels-idx1-ubyte`)
pub fn read_idx_labels(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = read_maybe_gzipped(path)?;
    parse_idx_labels(&bytes, path)
}

/// Parse the bytes of an IDX image file
pub fn parse_idx_images(bytes: &[u8], path: &Path) -> Result<IdxImages> {
    let mut offset = 0;
    let magic = read_be_u32(bytes, &mut offset, path)?;
    if magic != IMAGES_MAGIC {
        return Err(Error::invalid_idx(
            path,
            format!("expected image magic {:#010x}, found {:#010x}", IMAGES_MAGIC, magic),
        ));
    }

    let count = read_be_u32(bytes, &mut offset, path)? as usize;
    let rows = read_be_u32(bytes, &mut offset, path)? as usize;
    let cols = read_be_u32(bytes, &mut offset, path)? as usize;

    if rows == 0 || cols == 0 {
        return Err(Error::invalid_idx(path, format!("image shape {}x{}", rows, cols)));
    }

    let len = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| Error::invalid_idx(path, "payload size overflows"))?;
    let payload = take_payload(bytes, offset, len, path)?;
    let pixels = Array3::from_shape_vec((count, rows, cols), payload.to_vec())
        .map_err(|e| Error::invalid_idx(path, e.to_string()))?;

    Ok(IdxImages { rows, cols, pixels })
}

/// Parse the bytes of an IDX label file
pub fn parse_idx_labels(bytes: &[u8], path: &Path) -> Result<Vec<u8>> {
    let mut offset = 0;
    let magic = read_be_u32(bytes, &mut offset, path)?;
    if magic != LABELS_MAGIC {
        return Err(Error::invalid_idx(
            path,
            format!("expected label magic {:#010x}, found {:#010x}", LABELS_MAGIC, magic),
        ));
    }

    let count = read_be_u32(bytes, &mut offset, path)? as usize;
    Ok(take_payload(bytes, offset, count, path)?.to_vec())
}

/// Read a file, falling back to `<path>.gz` when the plain file is missing
fn read_maybe_gzipped(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        return Ok(std::fs::read(path)?);
    }

    let gz_path = gz_sibling(path);
    if !gz_path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} (or {}) not found", path.display(), gz_path.display()),
        )));
    }

    let mut decoder = GzDecoder::new(File::open(&gz_path)?);
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;
    Ok(bytes)
}

pub(crate) fn gz_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

fn read_be_u32(bytes: &[u8], offset: &mut usize, path: &Path) -> Result<u32> {
    let end = *offset + 4;
    let word = bytes
        .get(*offset..end)
        .ok_or_else(|| Error::invalid_idx(path, "truncated header"))?;
    *offset = end;
    Ok(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
}

fn take_payload<'a>(bytes: &'a [u8], offset: usize, len: usize, path: &Path) -> Result<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| Error::invalid_idx(path, "payload size overflows"))?;
    bytes.get(offset..end).ok_or_else(|| {
        Error::invalid_idx(
            path,
            format!(
                "truncated payload: expected {} bytes, found {}",
                len,
                bytes.len().saturating_sub(offset)
            ),
        )
    })
}

/// Encode images in IDX format (used to build fixtures)
pub fn encode_idx_images(pixels: &Array3<u8>) -> Vec<u8> {
    let (count, rows, cols) = pixels.dim();
    let mut bytes = Vec::with_capacity(16 + pixels.len());
    for word in [IMAGES_MAGIC, count as u32, rows as u32, cols as u32] {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes.extend(pixels.iter().copied());
    bytes
}

/// Encode labels in IDX format (used to build fixtures)
pub fn encode_idx_labels(labels: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + labels.len());
    bytes.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    bytes.extend_from_slice(labels);
    bytes
}
