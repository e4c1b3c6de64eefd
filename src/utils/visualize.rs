//! Rendering generated images as a PNG grid

use std::path::Path;

use image::{GrayImage, Luma};
use tch::{Device, Kind, Tensor};

use crate::error::{Error, Result};

/// Layout of a sample grid
#[derive(Debug, Clone, Copy)]
pub struct ImageGrid {
    pub rows: i64,
    pub cols: i64,
    /// Black border between tiles, in pixels
    pub padding: u32,
}

impl ImageGrid {
    pub fn new(rows: i64, cols: i64) -> Self {
        Self {
            rows,
            cols,
            padding: 2,
        }
    }

    /// Number of images the grid shows
    pub fn len(&self) -> i64 {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Map values in [-1, 1] to grayscale bytes
pub fn tensor_to_pixels(tensor: &Tensor) -> Result<Vec<u8>> {
    let flat = tensor
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .flatten(0, -1);
    let values = Vec::<f32>::try_from(&flat)?;

    Ok(values
        .into_iter()
        .map(|v| ((v + 1.0) * 127.5).round().clamp(0.0, 255.0) as u8)
        .collect())
}

/// Tile the first `rows * cols` images of `samples` (N, 1, H, W) row-major
pub fn render_grid(samples: &Tensor, grid: &ImageGrid) -> Result<GrayImage> {
    let size = samples.size();
    if size.len() != 4 {
        return Err(Error::Render(format!(
            "expected samples of shape (N, C, H, W), got {:?}",
            size
        )));
    }
    let (count, height, width) = (size[0], size[2], size[3]);
    if count < grid.len() {
        return Err(Error::Render(format!(
            "grid needs {} images, got {}",
            grid.len(),
            count
        )));
    }

    // First channel of the first rows * cols images
    let tiles = samples.narrow(0, 0, grid.len()).select(1, 0);
    let pixels = tensor_to_pixels(&tiles)?;

    let (h, w, pad) = (height as u32, width as u32, grid.padding);
    let grid_width = grid.cols as u32 * (w + pad) + pad;
    let grid_height = grid.rows as u32 * (h + pad) + pad;
    let mut canvas = GrayImage::from_pixel(grid_width, grid_height, Luma([0]));

    for (tile, chunk) in pixels.chunks((h * w) as usize).enumerate() {
        let tile = tile as u32;
        let x0 = pad + (tile % grid.cols as u32) * (w + pad);
        let y0 = pad + (tile / grid.cols as u32) * (h + pad);
        for (i, &value) in chunk.iter().enumerate() {
            let i = i as u32;
            canvas.put_pixel(x0 + i % w, y0 + i / w, Luma([value]));
        }
    }

    Ok(canvas)
}

/// Render `samples` into a grid and write it as PNG
pub fn save_grid(samples: &Tensor, grid: &ImageGrid, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    render_grid(samples, grid)?.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_to_pixels() {
        let t = Tensor::from_slice(&[-1.0f32, 0.0, 1.0, 3.0, -2.0]);
        assert_eq!(tensor_to_pixels(&t).unwrap(), vec![0, 128, 255, 255, 0]);
    }

    #[test]
    fn test_render_grid_layout() {
        // Four 2x2 tiles: white, black, black, white
        let white = Tensor::ones([1, 1, 2, 2], (Kind::Float, Device::Cpu));
        let black = -Tensor::ones([1, 1, 2, 2], (Kind::Float, Device::Cpu));
        let samples = Tensor::cat(&[&white, &black, &black, &white], 0);

        let grid = ImageGrid {
            rows: 2,
            cols: 2,
            padding: 1,
        };
        let image = render_grid(&samples, &grid).unwrap();

        assert_eq!(image.dimensions(), (7, 7));
        assert_eq!(image.get_pixel(0, 0)[0], 0); // padding
        assert_eq!(image.get_pixel(1, 1)[0], 255); // top-left tile
        assert_eq!(image.get_pixel(4, 1)[0], 0); // top-right tile
        assert_eq!(image.get_pixel(5, 5)[0], 255); // bottom-right tile
    }

    #[test]
    fn test_render_grid_too_few_samples() {
        let samples = Tensor::zeros([3, 1, 4, 4], (Kind::Float, Device::Cpu));
        let err = render_grid(&samples, &ImageGrid::new(2, 2)).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_render_grid_rejects_flat_samples() {
        let samples = Tensor::zeros([4, 16], (Kind::Float, Device::Cpu));
        let err = render_grid(&samples, &ImageGrid::new(2, 2)).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_save_grid_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("0.png");

        let samples = Tensor::zeros([4, 1, 28, 28], (Kind::Float, Device::Cpu));
        save_grid(&samples, &ImageGrid::new(2, 2), &path).unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!(written.width(), 2 * 30 + 2);
    }
}
