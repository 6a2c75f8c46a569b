use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::compositor::Palette;
use crate::driver::{
    DriverConfig, SpawnPolicy, DEFAULT_HOLD_FRAMES, DEFAULT_PROBABILISTIC_FRAMES,
    DEFAULT_SKIP_FRAMES, DEFAULT_SPAWN_CHANCE,
};
use crate::encoding::DEFAULT_FPS;
use crate::error_codes::CodedError;
use crate::flow::{FlowLengthRange, DEFAULT_SPEED};
use crate::frame_painter::CellSize;
use crate::rasterize::{ImageRasterizer, DEFAULT_CHARSET, DEFAULT_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpawnPolicyKind {
    #[default]
    Coverage,
    Probabilistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SpawnConfig {
    pub policy: SpawnPolicyKind,
    /// Only read by the probabilistic policy.
    pub frames: usize,
    pub chance: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            policy: SpawnPolicyKind::Coverage,
            frames: DEFAULT_PROBABILISTIC_FRAMES,
            chance: DEFAULT_SPAWN_CHANCE,
        }
    }
}

impl SpawnConfig {
    pub fn policy(&self) -> SpawnPolicy {
        match self.policy {
            SpawnPolicyKind::Coverage => SpawnPolicy::Coverage,
            SpawnPolicyKind::Probabilistic => SpawnPolicy::Probabilistic {
                frames: self.frames,
                chance: self.chance,
            },
        }
    }
}

/// Settings for one `matrix` or `ascii` run, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    pub columns: usize,
    pub fps: u32,
    pub cell: CellSize,
    pub skip_frames: usize,
    pub hold_frames: usize,
    pub speed: usize,
    pub flow_length: FlowLengthRange,
    pub spawn: SpawnConfig,
    pub palette: Palette,
    pub charset: String,
    pub invert: bool,
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            fps: DEFAULT_FPS,
            cell: CellSize::default(),
            skip_frames: DEFAULT_SKIP_FRAMES,
            hold_frames: DEFAULT_HOLD_FRAMES,
            speed: DEFAULT_SPEED,
            flow_length: FlowLengthRange::default(),
            spawn: SpawnConfig::default(),
            palette: Palette::default(),
            charset: DEFAULT_CHARSET.to_owned(),
            invert: false,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 {
            return Err(CodedError::config("columns must be > 0").into());
        }
        if self.fps == 0 {
            return Err(CodedError::config("fps must be > 0").into());
        }
        if self.cell.width == 0 || self.cell.height == 0 {
            return Err(CodedError::config(format!(
                "cell size must be positive, got {}x{}",
                self.cell.width, self.cell.height
            ))
            .into());
        }
        if self.charset.is_empty() {
            return Err(CodedError::config("charset must contain at least one character").into());
        }
        self.driver_config().validate()
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            speed: self.speed,
            skip_frames: self.skip_frames,
            hold_frames: self.hold_frames,
            flow_length: self.flow_length,
            spawn: self.spawn.policy(),
            palette: self.palette,
        }
    }

    pub fn rasterizer(&self) -> Result<ImageRasterizer> {
        ImageRasterizer::new(self.columns, &self.charset, self.invert)
    }
}

/// Reads and validates a YAML run configuration. Missing fields take their
/// defaults; unknown fields are rejected.
pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_run_config(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        CodedError::config(format!(
            "failed to parse yaml in {} at {}: {}",
            path.display(),
            location,
            error
        ))
    })?;
    config.validate()?;
    Ok(config)
}

fn parse_run_config(contents: &str) -> std::result::Result<RunConfig, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(RunConfig::default());
    }
    serde_yaml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{load_run_config, parse_run_config, RunConfig};
    use crate::driver::SpawnPolicy;
    use crate::error_codes::{find_coded_error, INVALID_CONFIG};
    use crate::grid::Rgb;

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse_run_config("").expect("parse");
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.columns, 100);
        assert_eq!(config.fps, 30);
        assert_eq!(config.driver_config().spawn, SpawnPolicy::Coverage);
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config = parse_run_config(
            r#"
columns: 64
cell: { height: 12 }
palette:
  head: { r: 255, g: 255, b: 255 }
spawn:
  policy: probabilistic
  frames: 120
seed: 7
"#,
        )
        .expect("parse");
        assert_eq!(config.columns, 64);
        assert_eq!(config.cell.width, 10);
        assert_eq!(config.cell.height, 12);
        assert_eq!(config.palette.head, Rgb::new(255, 255, 255));
        assert_eq!(config.palette.trail, Rgb::new(0, 255, 0));
        assert_eq!(config.seed, Some(7));
        assert_eq!(
            config.driver_config().spawn,
            SpawnPolicy::Probabilistic {
                frames: 120,
                chance: 0.8
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(parse_run_config("colums: 10\n").is_err());
        assert!(parse_run_config("palette: { glow: { r: 1, g: 2, b: 3 } }\n").is_err());
    }

    #[test]
    fn validation_failures_are_invalid_config() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("run.yaml");
        fs::write(&path, "speed: 0\n").expect("write");
        let error = load_run_config(&path).expect_err("speed 0 rejected");
        assert_eq!(
            find_coded_error(&error).map(|e| e.code),
            Some(INVALID_CONFIG)
        );
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "columns: [1, 2\n").expect("write");
        let error = load_run_config(&path).expect_err("broken yaml");
        let message = error.to_string();
        assert!(message.contains("INVALID_CONFIG"));
        assert!(message.contains("broken.yaml"));
    }

    #[test]
    fn inverted_flow_ratios_fail_validation() {
        let config = RunConfig {
            flow_length: crate::flow::FlowLengthRange {
                min_ratio: 1.0,
                max_ratio: 0.5,
            },
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
