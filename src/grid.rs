//! Character and color grids consumed by the animation core.

use std::borrow::Cow;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error_codes::CodedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}

/// Row-major grid of display characters.
///
/// Rows may be shorter than `width`; missing cells read as padding and are
/// never materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterGrid {
    width: usize,
    rows: Vec<Vec<char>>,
}

impl CharacterGrid {
    /// Width is the longest row.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| expand_tabs(row.as_ref()).chars().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { width, rows }
    }

    /// Rows longer than `width` are rejected rather than clipped.
    pub fn from_rows_with_width<I>(rows: I, width: usize) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let grid = Self::from_rows(rows);
        if grid.width > width {
            return Err(CodedError::invalid_grid(format!(
                "character grid row of length {} exceeds declared width {width}",
                grid.width
            ))
            .into());
        }
        Ok(Self {
            width,
            rows: grid.rows,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.rows.is_empty()
    }

    /// `None` for cells past the end of a short row.
    pub fn get(&self, x: usize, y: usize) -> Option<char> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    pub fn char_at(&self, x: usize, y: usize) -> char {
        self.get(x, y).unwrap_or(' ')
    }

    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.rows.len());
        for row in &self.rows {
            out.extend(row.iter());
            out.extend(std::iter::repeat(' ').take(self.width - row.len()));
            out.push('\n');
        }
        out
    }
}

fn expand_tabs(line: &str) -> Cow<'_, str> {
    if line.contains('\t') {
        Cow::Owned(line.replace('\t', "    "))
    } else {
        Cow::Borrowed(line)
    }
}

/// One color per character cell, same shape as the [`CharacterGrid`] it
/// accompanies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGrid {
    width: usize,
    height: usize,
    cells: Vec<Rgba>,
}

impl ColorGrid {
    pub fn new(width: usize, height: usize, cells: Vec<Rgba>) -> Result<Self> {
        let expected = width.checked_mul(height).ok_or_else(|| {
            CodedError::invalid_grid(format!("color grid {width}x{height} overflows"))
        })?;
        if cells.len() != expected {
            return Err(CodedError::invalid_grid(format!(
                "color grid {width}x{height} expects {expected} cells, got {}",
                cells.len()
            ))
            .into());
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn filled(width: usize, height: usize, color: Rgba) -> Self {
        Self {
            width,
            height,
            cells: vec![color; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y * self.width + x).copied()
    }
}

/// Reject grids the animation cannot run on: zero area, or a color grid whose
/// shape differs from the character grid.
pub fn validate_grids(chars: &CharacterGrid, colors: Option<&ColorGrid>) -> Result<()> {
    if chars.is_empty() {
        return Err(CodedError::invalid_grid(format!(
            "character grid must have non-zero area, got {}x{}",
            chars.width(),
            chars.height()
        ))
        .into());
    }
    if let Some(colors) = colors {
        if colors.width() != chars.width() || colors.height() != chars.height() {
            return Err(CodedError::invalid_grid(format!(
                "color grid {}x{} does not match character grid {}x{}",
                colors.width(),
                colors.height(),
                chars.width(),
                chars.height()
            ))
            .into());
        }
    }
    Ok(())
}
