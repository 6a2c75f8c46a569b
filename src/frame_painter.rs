//! Rasterizes composed frames into RGBA pixel buffers for the encoder.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tiny_skia::{Color, Paint, Pixmap, PremultipliedColorU8, Rect, Transform};

use crate::compositor::{CellRole, Frame, Palette};
use crate::grid::Rgb;

pub const DEFAULT_CELL_WIDTH: u32 = 10;
pub const DEFAULT_CELL_HEIGHT: u32 = 10;

/// Produces per-pixel glyph coverage (0..=255) for a cell of the given size.
pub trait GlyphSource {
    fn coverage_mask(&mut self, character: char, cell_width: u32, cell_height: u32) -> Vec<u8>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CellSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CellSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_CELL_WIDTH,
            height: DEFAULT_CELL_HEIGHT,
        }
    }
}

pub struct FramePainter {
    columns: usize,
    rows: usize,
    cell: CellSize,
    pixel_width: u32,
    pixel_height: u32,
    palette: Palette,
    glyphs: Box<dyn GlyphSource>,
    mask_cache: HashMap<char, Vec<u8>>,
}

impl FramePainter {
    /// Canvas is `columns * cell.width` by `rows * cell.height`, rounded up to
    /// even dimensions for 4:2:0 encoders.
    pub fn new(
        columns: usize,
        rows: usize,
        cell: CellSize,
        palette: Palette,
        glyphs: Box<dyn GlyphSource>,
    ) -> Result<Self> {
        if cell.width == 0 || cell.height == 0 {
            return Err(anyhow!(
                "cell size must be positive, got {}x{}",
                cell.width,
                cell.height
            ));
        }
        let pixel_width = u32::try_from(columns)
            .ok()
            .and_then(|columns| columns.checked_mul(cell.width))
            .and_then(round_up_even)
            .ok_or_else(|| anyhow!("frame width overflows: {columns} columns"))?;
        let pixel_height = u32::try_from(rows)
            .ok()
            .and_then(|rows| rows.checked_mul(cell.height))
            .and_then(round_up_even)
            .ok_or_else(|| anyhow!("frame height overflows: {rows} rows"))?;

        Ok(Self {
            columns,
            rows,
            cell,
            pixel_width,
            pixel_height,
            palette,
            glyphs,
            mask_cache: HashMap::new(),
        })
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    pub fn paint(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        if frame.width() != self.columns || frame.height() != self.rows {
            return Err(anyhow!(
                "frame {}x{} does not match painter grid {}x{}",
                frame.width(),
                frame.height(),
                self.columns,
                self.rows
            ));
        }

        let mut pixmap = Pixmap::new(self.pixel_width, self.pixel_height).ok_or_else(|| {
            anyhow!(
                "failed to allocate frame pixmap {}x{}",
                self.pixel_width,
                self.pixel_height
            )
        })?;
        let background = self.palette.background;
        pixmap.fill(Color::from_rgba8(background.r, background.g, background.b, 255));

        for y in 0..self.rows {
            for (x, cell) in frame.row(y).iter().enumerate() {
                let origin_x = x as u32 * self.cell.width;
                let origin_y = y as u32 * self.cell.height;
                let color = cell.color.unwrap_or(self.palette.default_foreground);

                if cell.glyph == ' ' {
                    if cell.role == CellRole::Head {
                        self.fill_cell(&mut pixmap, origin_x, origin_y, color);
                    }
                    continue;
                }
                self.paint_glyph(&mut pixmap, origin_x, origin_y, cell.glyph, color);
            }
        }

        Ok(pixmap.take())
    }

    fn fill_cell(&self, pixmap: &mut Pixmap, origin_x: u32, origin_y: u32, color: Rgb) {
        let Some(rect) = Rect::from_xywh(
            origin_x as f32,
            origin_y as f32,
            self.cell.width as f32,
            self.cell.height as f32,
        ) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, 255);
        paint.anti_alias = false;
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn paint_glyph(
        &mut self,
        pixmap: &mut Pixmap,
        origin_x: u32,
        origin_y: u32,
        character: char,
        color: Rgb,
    ) {
        let (cell_width, cell_height) = (self.cell.width, self.cell.height);
        let glyphs = &mut self.glyphs;
        let mask = self
            .mask_cache
            .entry(character)
            .or_insert_with(|| glyphs.coverage_mask(character, cell_width, cell_height));

        for y in 0..cell_height {
            for x in 0..cell_width {
                let coverage = mask.get((y * cell_width + x) as usize).copied().unwrap_or(0);
                if coverage == 0 {
                    continue;
                }
                blend_pixel(pixmap, origin_x + x, origin_y + y, color, coverage);
            }
        }
    }
}

fn round_up_even(value: u32) -> Option<u32> {
    value.checked_add(value & 1)
}

/// Source-over blend of an opaque color at `coverage` onto an opaque canvas.
fn blend_pixel(pixmap: &mut Pixmap, x: u32, y: u32, color: Rgb, coverage: u8) {
    if x >= pixmap.width() || y >= pixmap.height() {
        return;
    }
    let index = (y * pixmap.width() + x) as usize;
    let Some(pixel) = pixmap.pixels_mut().get_mut(index) else {
        return;
    };

    let alpha = u16::from(coverage);
    let inv_alpha = 255 - alpha;
    let mix = |src: u8, dst: u8| -> u8 {
        ((u16::from(src) * alpha + u16::from(dst) * inv_alpha + 127) / 255) as u8
    };
    let red = mix(color.r, pixel.red());
    let green = mix(color.g, pixel.green());
    let blue = mix(color.b, pixel.blue());

    if let Some(out) = PremultipliedColorU8::from_rgba(red, green, blue, 255) {
        *pixel = out;
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::{CellSize, FramePainter, GlyphSource};
    use crate::compositor::{FrameCompositor, Palette};
    use crate::flow::ColumnFlows;
    use crate::glyph_atlas::BitmapAtlas;
    use crate::grid::CharacterGrid;

    fn pixel(rgba: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
    }

    struct SolidGlyphs;

    impl GlyphSource for SolidGlyphs {
        fn coverage_mask(&mut self, _: char, cell_width: u32, cell_height: u32) -> Vec<u8> {
            vec![255; (cell_width * cell_height) as usize]
        }
    }

    #[test]
    fn canvas_is_ten_pixels_per_cell() {
        let painter = FramePainter::new(
            100,
            42,
            CellSize::default(),
            Palette::default(),
            Box::new(BitmapAtlas::new()),
        )
        .expect("painter");
        assert_eq!(painter.pixel_width(), 1000);
        assert_eq!(painter.pixel_height(), 420);
    }

    #[test]
    fn odd_canvas_rounds_up_to_even() {
        let painter = FramePainter::new(
            3,
            1,
            CellSize {
                width: 5,
                height: 7,
            },
            Palette::default(),
            Box::new(BitmapAtlas::new()),
        )
        .expect("painter");
        assert_eq!(painter.pixel_width(), 16);
        assert_eq!(painter.pixel_height(), 8);
    }

    #[test]
    fn canvas_at_u32_limit_reports_overflow() {
        let error = FramePainter::new(
            u32::MAX as usize,
            1,
            CellSize {
                width: 1,
                height: 1,
            },
            Palette::default(),
            Box::new(BitmapAtlas::new()),
        )
        .err()
        .expect("odd u32::MAX width cannot be padded");
        assert!(error.to_string().contains("frame width overflows"));

        let tall = FramePainter::new(
            1,
            1,
            CellSize {
                width: 2,
                height: u32::MAX,
            },
            Palette::default(),
            Box::new(BitmapAtlas::new()),
        );
        assert!(tall.is_err());
    }

    #[test]
    fn head_cell_is_filled_with_head_color() {
        let chars = CharacterGrid::from_rows(["a", "b"]);
        let mut flows = ColumnFlows::new(1, 2);
        flows.spawn(0, 1);
        let palette = Palette::default();
        let mut compositor = FrameCompositor::new(1, 2, palette);
        let frame = compositor.render(&chars, None, flows.columns(), &mut StdRng::seed_from_u64(0));

        let mut painter =
            FramePainter::new(1, 2, CellSize::default(), palette, Box::new(BitmapAtlas::new()))
                .expect("painter");
        let rgba = painter.paint(&frame).expect("paint");
        assert_eq!(rgba.len(), 10 * 20 * 4);
        assert_eq!(pixel(&rgba, 10, 5, 5), [200, 255, 200, 255]);
    }

    #[test]
    fn original_glyphs_use_default_foreground_without_colors() {
        let chars = CharacterGrid::from_rows(["#"]);
        let flows = ColumnFlows::new(1, 1);
        let palette = Palette::default();
        let mut compositor = FrameCompositor::new(1, 1, palette);
        let frame = compositor.render(&chars, None, flows.columns(), &mut StdRng::seed_from_u64(0));

        let mut painter =
            FramePainter::new(1, 1, CellSize::default(), palette, Box::new(SolidGlyphs))
                .expect("painter");
        let rgba = painter.paint(&frame).expect("paint");
        assert!(rgba.chunks_exact(4).all(|px| px == [0, 255, 0, 255]));
    }

    #[test]
    fn blank_cells_leave_background() {
        let chars = CharacterGrid::from_rows([" "]);
        let flows = ColumnFlows::new(1, 1);
        let palette = Palette::default();
        let mut compositor = FrameCompositor::new(1, 1, palette);
        let frame = compositor.render(&chars, None, flows.columns(), &mut StdRng::seed_from_u64(0));

        let mut painter =
            FramePainter::new(1, 1, CellSize::default(), palette, Box::new(SolidGlyphs))
                .expect("painter");
        let rgba = painter.paint(&frame).expect("paint");
        assert!(rgba.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let chars = CharacterGrid::from_rows(["ab"]);
        let flows = ColumnFlows::new(2, 1);
        let mut compositor = FrameCompositor::new(2, 1, Palette::default());
        let frame = compositor.render(&chars, None, flows.columns(), &mut StdRng::seed_from_u64(0));

        let mut painter = FramePainter::new(
            3,
            1,
            CellSize::default(),
            Palette::default(),
            Box::new(BitmapAtlas::new()),
        )
        .expect("painter");
        assert!(painter.paint(&frame).is_err());
    }
}
