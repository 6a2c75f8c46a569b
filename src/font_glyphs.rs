use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use tracing::warn;

use crate::frame_painter::GlyphSource;
use crate::glyph_atlas::BitmapAtlas;

/// Glyphs rasterized from a TrueType/OpenType font, scaled so one line fits
/// a cell. Characters the font lacks fall back to the built-in atlas.
pub struct FontGlyphs {
    font: Font,
    font_name: String,
    fallback: BitmapAtlas,
}

impl FontGlyphs {
    pub fn from_path(font_path: &Path) -> Result<Self> {
        let font_bytes = fs::read(font_path)
            .with_context(|| format!("failed to read font file {}", font_path.display()))?;
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|error| anyhow!("failed to parse font {}: {error}", font_path.display()))?;
        Ok(Self {
            font,
            font_name: font_path.display().to_string(),
            fallback: BitmapAtlas::new(),
        })
    }

    /// Pixel size at which ascent + descent equals `cell_height`.
    fn font_size_for(&self, cell_height: u32) -> (f32, f32) {
        let nominal = cell_height as f32;
        match self.font.horizontal_line_metrics(nominal) {
            Some(metrics) if metrics.ascent - metrics.descent > 0.0 => {
                let scale = nominal / (metrics.ascent - metrics.descent);
                (nominal * scale, metrics.ascent * scale)
            }
            _ => (nominal, nominal * 0.8),
        }
    }
}

impl GlyphSource for FontGlyphs {
    fn coverage_mask(&mut self, character: char, cell_width: u32, cell_height: u32) -> Vec<u8> {
        if self.font.lookup_glyph_index(character) == 0 {
            warn!(
                "font {} has no glyph for U+{:04X}; using built-in glyph",
                self.font_name, character as u32
            );
            return self
                .fallback
                .coverage_mask(character, cell_width, cell_height);
        }

        let (font_size, baseline) = self.font_size_for(cell_height);
        let (metrics, bitmap) = self.font.rasterize(character, font_size);
        let mut mask = vec![0_u8; (cell_width * cell_height) as usize];

        let x_start = (cell_width as i32 - metrics.width as i32) / 2;
        let y_start = baseline.round() as i32 - metrics.height as i32 - metrics.ymin;
        for row in 0..metrics.height {
            let py = y_start + row as i32;
            if py < 0 || py >= cell_height as i32 {
                continue;
            }
            for col in 0..metrics.width {
                let px = x_start + col as i32;
                if px < 0 || px >= cell_width as i32 {
                    continue;
                }
                let coverage = bitmap[row * metrics.width + col];
                mask[(py as u32 * cell_width + px as u32) as usize] = coverage;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use super::FontGlyphs;

    #[test]
    fn missing_font_file_reports_path() {
        let error = FontGlyphs::from_path(Path::new("no/such/font.ttf"))
            .err()
            .expect("missing font should fail");
        assert!(format!("{error:#}").contains("no/such/font.ttf"));
    }

    #[test]
    fn garbage_font_bytes_fail_to_parse() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").expect("write");
        let error = FontGlyphs::from_path(&path)
            .err()
            .expect("garbage should fail");
        assert!(error.to_string().contains("failed to parse font"));
    }
}
