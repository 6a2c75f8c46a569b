pub mod compositor;
pub mod config;
pub mod driver;
pub mod encoding;
pub mod error_codes;
pub mod flow;
pub mod font_glyphs;
pub mod frame_painter;
pub mod glyph_atlas;
pub mod grid;
pub mod logging;
pub mod pipeline;
pub mod rasterize;
