//! Built-in 8x8 bitmap glyphs for printable ASCII.
//!
//! Glyph data is the public-domain `font8x8_basic` set, stored MSB-first:
//! each glyph is eight row masks and bit 7 of a row is the leftmost pixel.

use crate::frame_painter::GlyphSource;

pub const ASCII_START: u8 = 32;
pub const ASCII_END: u8 = 126;
pub const GLYPH_WIDTH: u32 = 8;
pub const GLYPH_HEIGHT: u32 = 8;
const GLYPH_COUNT: usize = (ASCII_END - ASCII_START + 1) as usize;

type GlyphRows = [u8; 8];

#[rustfmt::skip]
const FONT8X8_PRINTABLE: [GlyphRows; GLYPH_COUNT] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x18, 0x3C, 0x3C, 0x18, 0x18, 0x00, 0x18, 0x00], // '!'
    [0x6C, 0x6C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // '"'
    [0x6C, 0x6C, 0xFE, 0x6C, 0xFE, 0x6C, 0x6C, 0x00], // '#'
    [0x30, 0x7C, 0xC0, 0x78, 0x0C, 0xF8, 0x30, 0x00], // '$'
    [0x00, 0xC6, 0xCC, 0x18, 0x30, 0x66, 0xC6, 0x00], // '%'
    [0x38, 0x6C, 0x38, 0x76, 0xDC, 0xCC, 0x76, 0x00], // '&'
    [0x60, 0x60, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00], // '\''
    [0x18, 0x30, 0x60, 0x60, 0x60, 0x30, 0x18, 0x00], // '('
    [0x60, 0x30, 0x18, 0x18, 0x18, 0x30, 0x60, 0x00], // ')'
    [0x00, 0x66, 0x3C, 0xFF, 0x3C, 0x66, 0x00, 0x00], // '*'
    [0x00, 0x30, 0x30, 0xFC, 0x30, 0x30, 0x00, 0x00], // '+'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x30, 0x60], // ','
    [0x00, 0x00, 0x00, 0xFC, 0x00, 0x00, 0x00, 0x00], // '-'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x30, 0x00], // '.'
    [0x06, 0x0C, 0x18, 0x30, 0x60, 0xC0, 0x80, 0x00], // '/'
    [0x7C, 0xC6, 0xCE, 0xDE, 0xF6, 0xE6, 0x7C, 0x00], // '0'
    [0x30, 0x70, 0x30, 0x30, 0x30, 0x30, 0xFC, 0x00], // '1'
    [0x78, 0xCC, 0x0C, 0x38, 0x60, 0xCC, 0xFC, 0x00], // '2'
    [0x78, 0xCC, 0x0C, 0x38, 0x0C, 0xCC, 0x78, 0x00], // '3'
    [0x1C, 0x3C, 0x6C, 0xCC, 0xFE, 0x0C, 0x1E, 0x00], // '4'
    [0xFC, 0xC0, 0xF8, 0x0C, 0x0C, 0xCC, 0x78, 0x00], // '5'
    [0x38, 0x60, 0xC0, 0xF8, 0xCC, 0xCC, 0x78, 0x00], // '6'
    [0xFC, 0xCC, 0x0C, 0x18, 0x30, 0x30, 0x30, 0x00], // '7'
    [0x78, 0xCC, 0xCC, 0x78, 0xCC, 0xCC, 0x78, 0x00], // '8'
    [0x78, 0xCC, 0xCC, 0x7C, 0x0C, 0x18, 0x70, 0x00], // '9'
    [0x00, 0x30, 0x30, 0x00, 0x00, 0x30, 0x30, 0x00], // ':'
    [0x00, 0x30, 0x30, 0x00, 0x00, 0x30, 0x30, 0x60], // ';'
    [0x18, 0x30, 0x60, 0xC0, 0x60, 0x30, 0x18, 0x00], // '<'
    [0x00, 0x00, 0xFC, 0x00, 0x00, 0xFC, 0x00, 0x00], // '='
    [0x60, 0x30, 0x18, 0x0C, 0x18, 0x30, 0x60, 0x00], // '>'
    [0x78, 0xCC, 0x0C, 0x18, 0x30, 0x00, 0x30, 0x00], // '?'
    [0x7C, 0xC6, 0xDE, 0xDE, 0xDE, 0xC0, 0x78, 0x00], // '@'
    [0x30, 0x78, 0xCC, 0xCC, 0xFC, 0xCC, 0xCC, 0x00], // 'A'
    [0xFC, 0x66, 0x66, 0x7C, 0x66, 0x66, 0xFC, 0x00], // 'B'
    [0x3C, 0x66, 0xC0, 0xC0, 0xC0, 0x66, 0x3C, 0x00], // 'C'
    [0xF8, 0x6C, 0x66, 0x66, 0x66, 0x6C, 0xF8, 0x00], // 'D'
    [0xFE, 0x62, 0x68, 0x78, 0x68, 0x62, 0xFE, 0x00], // 'E'
    [0xFE, 0x62, 0x68, 0x78, 0x68, 0x60, 0xF0, 0x00], // 'F'
    [0x3C, 0x66, 0xC0, 0xC0, 0xCE, 0x66, 0x3E, 0x00], // 'G'
    [0xCC, 0xCC, 0xCC, 0xFC, 0xCC, 0xCC, 0xCC, 0x00], // 'H'
    [0x78, 0x30, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00], // 'I'
    [0x1E, 0x0C, 0x0C, 0x0C, 0xCC, 0xCC, 0x78, 0x00], // 'J'
    [0xE6, 0x66, 0x6C, 0x78, 0x6C, 0x66, 0xE6, 0x00], // 'K'
    [0xF0, 0x60, 0x60, 0x60, 0x62, 0x66, 0xFE, 0x00], // 'L'
    [0xC6, 0xEE, 0xFE, 0xFE, 0xD6, 0xC6, 0xC6, 0x00], // 'M'
    [0xC6, 0xE6, 0xF6, 0xDE, 0xCE, 0xC6, 0xC6, 0x00], // 'N'
    [0x38, 0x6C, 0xC6, 0xC6, 0xC6, 0x6C, 0x38, 0x00], // 'O'
    [0xFC, 0x66, 0x66, 0x7C, 0x60, 0x60, 0xF0, 0x00], // 'P'
    [0x78, 0xCC, 0xCC, 0xCC, 0xDC, 0x78, 0x1C, 0x00], // 'Q'
    [0xFC, 0x66, 0x66, 0x7C, 0x6C, 0x66, 0xE6, 0x00], // 'R'
    [0x78, 0xCC, 0xE0, 0x70, 0x1C, 0xCC, 0x78, 0x00], // 'S'
    [0xFC, 0xB4, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00], // 'T'
    [0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0xFC, 0x00], // 'U'
    [0xCC, 0xCC, 0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x00], // 'V'
    [0xC6, 0xC6, 0xC6, 0xD6, 0xFE, 0xEE, 0xC6, 0x00], // 'W'
    [0xC6, 0xC6, 0x6C, 0x38, 0x38, 0x6C, 0xC6, 0x00], // 'X'
    [0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x30, 0x78, 0x00], // 'Y'
    [0xFE, 0xC6, 0x8C, 0x18, 0x32, 0x66, 0xFE, 0x00], // 'Z'
    [0x78, 0x60, 0x60, 0x60, 0x60, 0x60, 0x78, 0x00], // '['
    [0xC0, 0x60, 0x30, 0x18, 0x0C, 0x06, 0x02, 0x00], // '\\'
    [0x78, 0x18, 0x18, 0x18, 0x18, 0x18, 0x78, 0x00], // ']'
    [0x10, 0x38, 0x6C, 0xC6, 0x00, 0x00, 0x00, 0x00], // '^'
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF], // '_'
    [0x30, 0x30, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00], // '`'
    [0x00, 0x00, 0x78, 0x0C, 0x7C, 0xCC, 0x76, 0x00], // 'a'
    [0xE0, 0x60, 0x60, 0x7C, 0x66, 0x66, 0xDC, 0x00], // 'b'
    [0x00, 0x00, 0x78, 0xCC, 0xC0, 0xCC, 0x78, 0x00], // 'c'
    [0x1C, 0x0C, 0x0C, 0x7C, 0xCC, 0xCC, 0x76, 0x00], // 'd'
    [0x00, 0x00, 0x78, 0xCC, 0xFC, 0xC0, 0x78, 0x00], // 'e'
    [0x38, 0x6C, 0x60, 0xF0, 0x60, 0x60, 0xF0, 0x00], // 'f'
    [0x00, 0x00, 0x76, 0xCC, 0xCC, 0x7C, 0x0C, 0xF8], // 'g'
    [0xE0, 0x60, 0x6C, 0x76, 0x66, 0x66, 0xE6, 0x00], // 'h'
    [0x30, 0x00, 0x70, 0x30, 0x30, 0x30, 0x78, 0x00], // 'i'
    [0x0C, 0x00, 0x0C, 0x0C, 0x0C, 0xCC, 0xCC, 0x78], // 'j'
    [0xE0, 0x60, 0x66, 0x6C, 0x78, 0x6C, 0xE6, 0x00], // 'k'
    [0x70, 0x30, 0x30, 0x30, 0x30, 0x30, 0x78, 0x00], // 'l'
    [0x00, 0x00, 0xCC, 0xFE, 0xFE, 0xD6, 0xC6, 0x00], // 'm'
    [0x00, 0x00, 0xF8, 0xCC, 0xCC, 0xCC, 0xCC, 0x00], // 'n'
    [0x00, 0x00, 0x78, 0xCC, 0xCC, 0xCC, 0x78, 0x00], // 'o'
    [0x00, 0x00, 0xDC, 0x66, 0x66, 0x7C, 0x60, 0xF0], // 'p'
    [0x00, 0x00, 0x76, 0xCC, 0xCC, 0x7C, 0x0C, 0x1E], // 'q'
    [0x00, 0x00, 0xDC, 0x76, 0x66, 0x60, 0xF0, 0x00], // 'r'
    [0x00, 0x00, 0x7C, 0xC0, 0x78, 0x0C, 0xF8, 0x00], // 's'
    [0x10, 0x30, 0x7C, 0x30, 0x30, 0x34, 0x18, 0x00], // 't'
    [0x00, 0x00, 0xCC, 0xCC, 0xCC, 0xCC, 0x76, 0x00], // 'u'
    [0x00, 0x00, 0xCC, 0xCC, 0xCC, 0x78, 0x30, 0x00], // 'v'
    [0x00, 0x00, 0xC6, 0xD6, 0xFE, 0xFE, 0x6C, 0x00], // 'w'
    [0x00, 0x00, 0xC6, 0x6C, 0x38, 0x6C, 0xC6, 0x00], // 'x'
    [0x00, 0x00, 0xCC, 0xCC, 0xCC, 0x7C, 0x0C, 0xF8], // 'y'
    [0x00, 0x00, 0xFC, 0x98, 0x30, 0x64, 0xFC, 0x00], // 'z'
    [0x1C, 0x30, 0x30, 0xE0, 0x30, 0x30, 0x1C, 0x00], // '{'
    [0x18, 0x18, 0x18, 0x00, 0x18, 0x18, 0x18, 0x00], // '|'
    [0xE0, 0x30, 0x30, 0x1C, 0x30, 0x30, 0xE0, 0x00], // '}'
    [0x76, 0xDC, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // '~'
];

/// Fallback for characters outside the printable range: a hollow box.
const MISSING_GLYPH: GlyphRows = [0x7E, 0x42, 0x42, 0x42, 0x42, 0x42, 0x7E, 0x00];

#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapAtlas;

impl BitmapAtlas {
    pub fn new() -> Self {
        Self
    }

    fn rows(&self, character: char) -> &'static GlyphRows {
        match u8::try_from(character) {
            Ok(byte) if (ASCII_START..=ASCII_END).contains(&byte) => {
                &FONT8X8_PRINTABLE[(byte - ASCII_START) as usize]
            }
            _ => &MISSING_GLYPH,
        }
    }

    pub fn sample(&self, character: char, x: u32, y: u32) -> bool {
        if x >= GLYPH_WIDTH || y >= GLYPH_HEIGHT {
            return false;
        }
        let row_mask = self.rows(character)[y as usize];
        ((row_mask >> (GLYPH_WIDTH - 1 - x)) & 1) == 1
    }

    /// Count of lit pixels; used to order characters by visual weight.
    pub fn coverage(&self, character: char) -> u32 {
        self.rows(character).iter().map(|row| row.count_ones()).sum()
    }
}

impl GlyphSource for BitmapAtlas {
    /// Nearest-neighbour scale of the 8x8 glyph into the cell.
    fn coverage_mask(&mut self, character: char, cell_width: u32, cell_height: u32) -> Vec<u8> {
        let mut mask = vec![0_u8; (cell_width * cell_height) as usize];
        if cell_width == 0 || cell_height == 0 {
            return mask;
        }
        for y in 0..cell_height {
            let glyph_y = ((y * GLYPH_HEIGHT) / cell_height).min(GLYPH_HEIGHT - 1);
            for x in 0..cell_width {
                let glyph_x = ((x * GLYPH_WIDTH) / cell_width).min(GLYPH_WIDTH - 1);
                if self.sample(character, glyph_x, glyph_y) {
                    mask[(y * cell_width + x) as usize] = 255;
                }
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{BitmapAtlas, GLYPH_HEIGHT, GLYPH_WIDTH};
    use crate::frame_painter::GlyphSource;

    #[test]
    fn space_has_no_pixels_and_hash_has_many() {
        let atlas = BitmapAtlas::new();
        assert_eq!(atlas.coverage(' '), 0);
        assert!(atlas.coverage('#') > atlas.coverage('.'));
    }

    #[test]
    fn every_trail_glyph_is_visible() {
        let atlas = BitmapAtlas::new();
        for byte in 33_u8..=126 {
            assert!(atlas.coverage(char::from(byte)) > 0, "glyph {byte} is blank");
        }
    }

    #[test]
    fn trail_glyphs_are_pairwise_distinct() {
        let atlas = BitmapAtlas::new();
        let bitmap = |byte: u8| {
            (0..GLYPH_HEIGHT)
                .flat_map(|y| (0..GLYPH_WIDTH).map(move |x| (x, y)))
                .map(|(x, y)| atlas.sample(char::from(byte), x, y))
                .collect::<Vec<_>>()
        };
        let mut seen = HashMap::new();
        for byte in 33_u8..=126 {
            if let Some(previous) = seen.insert(bitmap(byte), byte) {
                panic!(
                    "'{}' and '{}' share a bitmap",
                    char::from(previous),
                    char::from(byte)
                );
            }
        }
    }

    #[test]
    fn letters_have_their_strokes() {
        let atlas = BitmapAtlas::new();
        let row = |c: char, y: u32| (0..GLYPH_WIDTH).filter(|&x| atlas.sample(c, x, y)).count();
        // crossbars
        assert_eq!(row('H', 3), 6);
        assert_eq!(row('A', 4), 6);
        // apex of 'A' is narrower than its legs
        assert_eq!(row('A', 0), 2);
        // 'h' has an ascender on the left, 'k' a diagonal
        assert!(atlas.sample('h', 0, 0));
        assert_ne!(row('h', 3), row('k', 3));
    }

    #[test]
    fn unsupported_characters_use_fallback_box() {
        let atlas = BitmapAtlas::new();
        assert!(atlas.coverage('\u{2603}') > 0);
        assert!(!atlas.sample('A', GLYPH_WIDTH, 0));
        assert!(!atlas.sample('A', 0, GLYPH_HEIGHT));
    }

    #[test]
    fn mask_scales_to_cell_size() {
        let mut atlas = BitmapAtlas::new();
        let mask = atlas.coverage_mask('A', 10, 10);
        assert_eq!(mask.len(), 100);
        assert!(mask.iter().any(|value| *value == 255));
        assert!(atlas.coverage_mask(' ', 10, 10).iter().all(|value| *value == 0));
    }
}
