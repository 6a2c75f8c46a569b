//! End-to-end runs: image → ASCII grids → animated frames → encoded video.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::compositor::{Frame, Palette};
use crate::config::RunConfig;
use crate::driver::AnimationDriver;
use crate::encoding::{EncoderSettings, FfmpegMode, FfmpegPipe, FrameSink};
use crate::font_glyphs::FontGlyphs;
use crate::frame_painter::{FramePainter, GlyphSource};
use crate::glyph_atlas::BitmapAtlas;
use crate::grid::{CharacterGrid, ColorGrid};
use crate::rasterize::{load_image, Rasterizer};

pub const DEFAULT_MONO_OUTPUT: &str = "ascii-art-matrix-effect.mp4";
pub const DEFAULT_COLOR_OUTPUT: &str = "ascii-art-matrix-effect-color.mp4";

#[derive(Debug, Clone)]
pub struct MatrixRequest {
    pub image_path: PathBuf,
    pub output_path: Option<PathBuf>,
    /// Carry the image's colors into the animation instead of plain green.
    pub color: bool,
    pub font_path: Option<PathBuf>,
    pub encoder_mode: FfmpegMode,
    pub config: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub frames: usize,
    pub columns: usize,
    pub rows: usize,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub fps: u32,
    pub seed: u64,
}

pub fn default_output_path(color: bool) -> PathBuf {
    PathBuf::from(if color {
        DEFAULT_COLOR_OUTPUT
    } else {
        DEFAULT_MONO_OUTPUT
    })
}

/// Loads and rasterizes `image_path`. The color grid is dropped in mono mode.
pub fn rasterize_image(
    image_path: &Path,
    config: &RunConfig,
    color: bool,
) -> Result<(CharacterGrid, Option<ColorGrid>)> {
    let rasterizer = config.rasterizer()?;
    let image = load_image(image_path)?;
    let output = rasterizer.rasterize(&image)?;
    debug!(
        columns = output.chars.width(),
        rows = output.chars.height(),
        "rasterized {}",
        image_path.display()
    );
    Ok((output.chars, color.then_some(output.colors)))
}

pub fn glyph_source(font_path: Option<&Path>) -> Result<Box<dyn GlyphSource>> {
    match font_path {
        Some(path) => Ok(Box::new(FontGlyphs::from_path(path)?)),
        None => Ok(Box::new(BitmapAtlas::new())),
    }
}

/// Paints every frame into `sink`, in order. Returns the number written.
pub fn stream_frames<I>(
    frames: I,
    painter: &mut FramePainter,
    sink: &mut dyn FrameSink,
    fps: u32,
) -> Result<usize>
where
    I: IntoIterator<Item = Frame>,
{
    let progress_every = fps.max(1) as usize;
    let mut written = 0;
    for frame in frames {
        let rgba = painter.paint(&frame)?;
        sink.write_frame(rgba)?;
        written += 1;
        if written % progress_every == 0 {
            info!("rendered frame {written}");
        }
    }
    Ok(written)
}

pub fn generate_animation(request: &MatrixRequest) -> Result<RunSummary> {
    let config = &request.config;
    config.validate()?;

    let (chars, colors) = rasterize_image(&request.image_path, config, request.color)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, "animation seed");

    let driver = AnimationDriver::new(
        &chars,
        colors.as_ref(),
        config.driver_config(),
        StdRng::seed_from_u64(seed),
    )?;
    let mut painter = FramePainter::new(
        chars.width(),
        chars.height(),
        config.cell,
        config.palette,
        glyph_source(request.font_path.as_deref())?,
    )?;

    let output_path = request
        .output_path
        .clone()
        .unwrap_or_else(|| default_output_path(request.color));
    let settings = EncoderSettings {
        width: painter.pixel_width(),
        height: painter.pixel_height(),
        fps: config.fps,
        output_path: output_path.clone(),
    };
    let mut pipe = FfmpegPipe::spawn_with_mode(&settings, request.encoder_mode)?;
    let frames = stream_frames(driver, &mut painter, &mut pipe, config.fps)?;
    Box::new(pipe).finish()?;

    Ok(RunSummary {
        output_path,
        frames,
        columns: chars.width(),
        rows: chars.height(),
        pixel_width: settings.width,
        pixel_height: settings.height,
        fps: config.fps,
        seed,
    })
}

/// The grid as plain text, or with 24-bit ANSI foreground colors per cell.
pub fn ascii_text(chars: &CharacterGrid, colors: Option<&ColorGrid>, palette: &Palette) -> String {
    let Some(colors) = colors else {
        return chars.to_text();
    };
    let mut out = String::new();
    for y in 0..chars.height() {
        for x in 0..chars.width() {
            let glyph = chars.char_at(x, y);
            match colors.get(x, y) {
                Some(color) => {
                    let rgb = palette.resolve(color);
                    let _ = write!(out, "\x1b[38;2;{};{};{}m{glyph}", rgb.r, rgb.g, rgb.b);
                }
                None => out.push(glyph),
            }
        }
        out.push_str("\x1b[0m\n");
    }
    out
}
