use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use ascii_matrix::config::{load_run_config, RunConfig, SpawnPolicyKind};
use ascii_matrix::encoding::FfmpegMode;
use ascii_matrix::error_codes::envelope_for;
use ascii_matrix::logging::{init_logging, LoggingConfig};
use ascii_matrix::pipeline::{ascii_text, generate_animation, rasterize_image, MatrixRequest};

#[derive(Debug, Parser)]
#[command(name = "ascii-matrix")]
#[command(about = "Falling-code animations over ASCII art of an image")]
#[command(version = env!("ASCII_MATRIX_VERSION"))]
struct Cli {
    /// Increase log detail (-v debug, -vv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors.
    #[arg(short = 'q', long, global = true)]
    quiet: bool,
    /// Print failures as a JSON envelope on stdout.
    #[arg(long, global = true)]
    json_errors: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render the falling-code animation to a video file.
    Matrix {
        image: PathBuf,
        /// Render exactly this many frames with probabilistic spawning instead
        /// of running until every column is covered.
        frame_count: Option<usize>,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        #[arg(long)]
        columns: Option<usize>,
        /// Plain green glyphs instead of the image's colors.
        #[arg(long)]
        mono: bool,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// TrueType/OpenType font for glyphs (defaults to a built-in 8x8 font).
        #[arg(long)]
        font: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = FfmpegArg::Auto)]
        ffmpeg: FfmpegArg,
    },
    /// Print the ASCII art for an image.
    Ascii {
        image: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        #[arg(long)]
        columns: Option<usize>,
        /// Colorize with 24-bit ANSI escapes (ignored with --output).
        #[arg(long)]
        color: bool,
        #[arg(long)]
        invert: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FfmpegArg {
    Auto,
    System,
    Sidecar,
}

impl From<FfmpegArg> for FfmpegMode {
    fn from(value: FfmpegArg) -> Self {
        match value {
            FfmpegArg::Auto => FfmpegMode::Auto,
            FfmpegArg::System => FfmpegMode::System,
            FfmpegArg::Sidecar => FfmpegMode::Sidecar,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_flags(cli.verbose, cli.quiet));

    let result = match cli.command {
        Commands::Matrix {
            image,
            frame_count,
            output,
            columns,
            mono,
            seed,
            config,
            font,
            ffmpeg,
        } => load_config(config.as_deref()).and_then(|mut run_config| {
            if let Some(columns) = columns {
                run_config.columns = columns;
            }
            if let Some(seed) = seed {
                run_config.seed = Some(seed);
            }
            if let Some(frames) = frame_count {
                run_config.spawn.policy = SpawnPolicyKind::Probabilistic;
                run_config.spawn.frames = frames;
            }
            run_matrix(MatrixRequest {
                image_path: image,
                output_path: output,
                color: !mono,
                font_path: font,
                encoder_mode: ffmpeg.into(),
                config: run_config,
            })
        }),
        Commands::Ascii {
            image,
            output,
            columns,
            color,
            invert,
            config,
        } => load_config(config.as_deref()).and_then(|mut run_config| {
            if let Some(columns) = columns {
                run_config.columns = columns;
            }
            run_config.invert |= invert;
            run_ascii(&image, output.as_deref(), color, &run_config)
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_error(&error, cli.json_errors);
            ExitCode::from(1)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => load_run_config(path),
        None => Ok(RunConfig::default()),
    }
}

fn run_matrix(request: MatrixRequest) -> Result<()> {
    let summary = generate_animation(&request)?;
    println!(
        "Wrote {} ({} frames, {}x{}, {} fps)",
        summary.output_path.display(),
        summary.frames,
        summary.pixel_width,
        summary.pixel_height,
        summary.fps
    );
    Ok(())
}

fn run_ascii(image: &Path, output: Option<&Path>, color: bool, config: &RunConfig) -> Result<()> {
    config.validate()?;
    match output {
        Some(output) => {
            let (chars, _) = rasterize_image(image, config, false)?;
            fs::write(output, chars.to_text())
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Wrote {} ({}x{})",
                output.display(),
                chars.width(),
                chars.height()
            );
        }
        None => {
            let (chars, colors) = rasterize_image(image, config, color)?;
            print!("{}", ascii_text(&chars, colors.as_ref(), &config.palette));
        }
    }
    Ok(())
}

fn report_error(error: &anyhow::Error, json: bool) {
    if json {
        match serde_json::to_string_pretty(&envelope_for(error)) {
            Ok(text) => println!("{text}"),
            Err(_) => eprintln!("error: {error:#}"),
        }
    } else {
        eprintln!("error: {error:#}");
    }
}
