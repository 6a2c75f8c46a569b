//! Image → ASCII art conversion.
//!
//! The image is resized to the target column count (height follows the
//! aspect ratio), converted to luma, and each pixel is mapped to a bucket of
//! the character ramp. The resized RGBA pixels become the color grid.

use std::path::Path;

use anyhow::Result;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error_codes::CodedError;
use crate::grid::{CharacterGrid, ColorGrid, Rgba};

pub const DEFAULT_COLUMNS: usize = 100;
/// Dark to light.
pub const DEFAULT_CHARSET: &str = ".:>&%#NMWRB";

#[derive(Debug, Clone)]
pub struct RasterOutput {
    pub chars: CharacterGrid,
    pub colors: ColorGrid,
}

pub trait Rasterizer {
    fn rasterize(&self, image: &DynamicImage) -> Result<RasterOutput>;
}

#[derive(Debug, Clone)]
pub struct ImageRasterizer {
    columns: usize,
    ramp: Vec<char>,
}

impl ImageRasterizer {
    pub fn new(columns: usize, charset: &str, invert: bool) -> Result<Self> {
        if columns == 0 {
            return Err(CodedError::config("columns must be > 0").into());
        }
        let mut ramp = charset.chars().collect::<Vec<_>>();
        if ramp.is_empty() {
            return Err(CodedError::config("charset must contain at least one character").into());
        }
        if invert {
            ramp.reverse();
        }
        Ok(Self { columns, ramp })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Nearest-bucket lookup: the 0..=255 luma range is split evenly across
    /// the ramp.
    pub fn char_for_luma(&self, luma: u8) -> char {
        let index = usize::from(luma) * self.ramp.len() / 256;
        self.ramp[index.min(self.ramp.len() - 1)]
    }

    fn target_rows(&self, width: u32, height: u32) -> usize {
        if width == 0 {
            return 0;
        }
        let aspect = height as f64 / width as f64;
        ((aspect * self.columns as f64) as usize).max(1)
    }
}

impl Default for ImageRasterizer {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            ramp: DEFAULT_CHARSET.chars().collect(),
        }
    }
}

impl Rasterizer for ImageRasterizer {
    fn rasterize(&self, image: &DynamicImage) -> Result<RasterOutput> {
        let (width, height) = image.dimensions();
        let rows = self.target_rows(width, height);
        if rows == 0 || height == 0 {
            return Err(CodedError::invalid_grid(format!(
                "source image has zero area ({width}x{height})"
            ))
            .into());
        }

        let resized = image.resize_exact(self.columns as u32, rows as u32, FilterType::Triangle);
        let luma = resized.to_luma8();
        let rgba = resized.to_rgba8();

        let lines = luma
            .rows()
            .map(|row| row.map(|pixel| self.char_for_luma(pixel.0[0])).collect::<String>())
            .collect::<Vec<_>>();
        let chars = CharacterGrid::from_rows_with_width(lines, self.columns)?;
        let cells = rgba
            .pixels()
            .map(|pixel| {
                let [r, g, b, a] = pixel.0;
                Rgba::new(r, g, b, a)
            })
            .collect::<Vec<_>>();
        let colors = ColorGrid::new(self.columns, rows, cells)?;

        Ok(RasterOutput { chars, colors })
    }
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|error| CodedError::image_load(path, error).into())
}
