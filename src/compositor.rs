//! Frame composition: overlays active column flows on the static ASCII art.
//!
//! For a column with a flow whose head is at row `h` and trail length `n`:
//!
//! - rows below the head (`y > h`) and rows the trail already left
//!   (`y < h - n`) keep the original character and color,
//! - the head row renders a blank cell in the head color,
//! - rows `h - n ..= h - 1` render a freshly sampled printable glyph.
//!
//! Trail cells are recorded in a pass bitmap. Once a cell has been under a
//! trail it renders in the settled color in every later frame.

use rand::Rng;
use serde::Deserialize;

use crate::flow::ColumnState;
use crate::grid::{CharacterGrid, ColorGrid, Rgb, Rgba};

/// Printable ASCII range sampled for trail glyphs (space excluded).
pub const TRAIL_GLYPH_FIRST: u8 = 33;
pub const TRAIL_GLYPH_LAST: u8 = 126;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Palette {
    pub head: Rgb,
    pub trail: Rgb,
    pub settled: Rgb,
    /// Used for original glyphs when no color grid is supplied.
    pub default_foreground: Rgb,
    /// Substituted for fully transparent color grid cells.
    pub transparent: Rgb,
    pub background: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            head: Rgb::new(200, 255, 200),
            trail: Rgb::new(0, 255, 0),
            settled: Rgb::new(0, 255, 0),
            default_foreground: Rgb::new(0, 255, 0),
            transparent: Rgb::new(50, 50, 50),
            background: Rgb::new(0, 0, 0),
        }
    }
}

impl Palette {
    /// Fully transparent cells take `transparent`; alpha is otherwise ignored.
    pub fn resolve(&self, color: Rgba) -> Rgb {
        if color.is_transparent() {
            self.transparent
        } else {
            color.rgb()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    Original,
    Head,
    Trail,
    Settled,
    /// Past the end of a short source row.
    Padding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    /// `None` means "no override": the painter falls back to its default
    /// foreground.
    pub color: Option<Rgb>,
    pub role: CellRole,
}

impl Cell {
    const PADDING: Self = Self {
        glyph: ' ',
        color: None,
        role: CellRole::Padding,
    };
}

/// One rendered tick of the animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Frame {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y * self.width + x)
    }

    pub fn row(&self, y: usize) -> &[Cell] {
        let start = (y * self.width).min(self.cells.len());
        let end = (start + self.width).min(self.cells.len());
        &self.cells[start..end]
    }

    pub fn row_text(&self, y: usize) -> String {
        self.row(y).iter().map(|cell| cell.glyph).collect()
    }

    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            out.push_str(&self.row_text(y));
            out.push('\n');
        }
        out
    }
}

/// Renders frames for one grid and remembers which cells a trail has crossed.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    width: usize,
    height: usize,
    palette: Palette,
    flow_passed: Vec<bool>,
}

impl FrameCompositor {
    pub fn new(width: usize, height: usize, palette: Palette) -> Self {
        Self {
            width,
            height,
            palette,
            flow_passed: vec![false; width * height],
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn is_passed(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.flow_passed[y * self.width + x]
    }

    pub fn render<R: Rng + ?Sized>(
        &mut self,
        chars: &CharacterGrid,
        colors: Option<&ColorGrid>,
        columns: &[ColumnState],
        rng: &mut R,
    ) -> Frame {
        let mut cells = Vec::with_capacity(self.width * self.height);

        for y in 0..self.height {
            for x in 0..self.width {
                let Some(original) = chars.get(x, y) else {
                    cells.push(Cell::PADDING);
                    continue;
                };
                let original_color = colors
                    .and_then(|grid| grid.get(x, y))
                    .map(|color| self.palette.resolve(color));
                let state = columns.get(x).copied().unwrap_or_default();
                let index = y * self.width + x;

                let mut cell = match state.fall_position {
                    Some(head) if y == head => Cell {
                        glyph: ' ',
                        color: Some(self.palette.head),
                        role: CellRole::Head,
                    },
                    Some(head) if y < head && y.saturating_add(state.flow_length) >= head => {
                        let glyph = char::from(rng.random_range(TRAIL_GLYPH_FIRST..=TRAIL_GLYPH_LAST));
                        let color = if self.flow_passed[index] {
                            self.palette.settled
                        } else {
                            self.palette.trail
                        };
                        self.flow_passed[index] = true;
                        Cell {
                            glyph,
                            color: Some(color),
                            role: CellRole::Trail,
                        }
                    }
                    _ => Cell {
                        glyph: original,
                        color: original_color,
                        role: CellRole::Original,
                    },
                };

                if self.flow_passed[index] && cell.role != CellRole::Trail {
                    cell.color = Some(self.palette.settled);
                    if cell.role == CellRole::Original {
                        cell.role = CellRole::Settled;
                    }
                }

                cells.push(cell);
            }
        }

        Frame {
            width: self.width,
            height: self.height,
            cells,
        }
    }
}
