//! Animation driver: advances column flows tick by tick and yields frames.
//!
//! The driver is a lazy iterator. A coverage run renders until every column
//! has hosted one complete flow, then repeats the final frame `hold_frames`
//! times. A probabilistic run renders a fixed number of frames.

use anyhow::Result;
use rand::Rng;
use tracing::{debug, info};

use crate::compositor::{Frame, FrameCompositor, Palette};
use crate::error_codes::CodedError;
use crate::flow::{ColumnFlows, FlowLengthRange, DEFAULT_SPEED, MAX_FLOW_LENGTH_RATIO};
use crate::grid::{validate_grids, CharacterGrid, ColorGrid};

pub const DEFAULT_SKIP_FRAMES: usize = 30;
pub const DEFAULT_HOLD_FRAMES: usize = 30;
pub const DEFAULT_PROBABILISTIC_FRAMES: usize = 500;
pub const DEFAULT_SPAWN_CHANCE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SpawnPolicy {
    /// Prefer columns that have not yet hosted a full flow; stop once all have.
    #[default]
    Coverage,
    /// Fixed-length run: each tick, with probability `chance`, try a uniformly
    /// random column.
    Probabilistic { frames: usize, chance: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub speed: usize,
    /// Warm-up ticks before any flow may spawn.
    pub skip_frames: usize,
    /// Repeats of the final frame appended after coverage completes.
    pub hold_frames: usize,
    pub flow_length: FlowLengthRange,
    pub spawn: SpawnPolicy,
    pub palette: Palette,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            skip_frames: DEFAULT_SKIP_FRAMES,
            hold_frames: DEFAULT_HOLD_FRAMES,
            flow_length: FlowLengthRange::default(),
            spawn: SpawnPolicy::Coverage,
            palette: Palette::default(),
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.speed == 0 {
            return Err(CodedError::config("speed must be >= 1").into());
        }
        let FlowLengthRange {
            min_ratio,
            max_ratio,
        } = self.flow_length;
        if !min_ratio.is_finite() || !max_ratio.is_finite() || min_ratio < 0.0 {
            return Err(CodedError::config(format!(
                "flow_length ratios must be finite and non-negative, got {min_ratio}..{max_ratio}"
            ))
            .into());
        }
        if max_ratio > MAX_FLOW_LENGTH_RATIO {
            return Err(CodedError::config(format!(
                "flow_length.max_ratio ({max_ratio}) must be <= {MAX_FLOW_LENGTH_RATIO}"
            ))
            .into());
        }
        if max_ratio < min_ratio {
            return Err(CodedError::config(format!(
                "flow_length.max_ratio ({max_ratio}) must be >= min_ratio ({min_ratio})"
            ))
            .into());
        }
        if let SpawnPolicy::Probabilistic { frames, chance } = self.spawn {
            if frames == 0 {
                return Err(CodedError::config("probabilistic frame count must be > 0").into());
            }
            if !(chance > 0.0 && chance <= 1.0) {
                return Err(CodedError::config(format!(
                    "spawn chance must be in (0, 1], got {chance}"
                ))
                .into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Holding { remaining: usize },
    Done,
}

pub struct AnimationDriver<'a, R> {
    chars: &'a CharacterGrid,
    colors: Option<&'a ColorGrid>,
    config: DriverConfig,
    flows: ColumnFlows,
    compositor: FrameCompositor,
    rng: R,
    state: DriverState,
    tick: usize,
    last_frame: Option<Frame>,
}

impl<'a, R: Rng> AnimationDriver<'a, R> {
    /// Fails with `INVALID_GRID` before any frame is produced if the grids
    /// have zero area or disagree in shape.
    pub fn new(
        chars: &'a CharacterGrid,
        colors: Option<&'a ColorGrid>,
        config: DriverConfig,
        rng: R,
    ) -> Result<Self> {
        validate_grids(chars, colors)?;
        config.validate()?;

        let (width, height) = (chars.width(), chars.height());
        debug!(width, height, colored = colors.is_some(), "starting animation run");
        Ok(Self {
            chars,
            colors,
            flows: ColumnFlows::new(width, height),
            compositor: FrameCompositor::new(width, height, config.palette),
            config,
            rng,
            state: DriverState::Running,
            tick: 0,
            last_frame: None,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Ticks rendered so far, excluding held repeats.
    pub fn ticks(&self) -> usize {
        self.tick
    }

    pub fn flows(&self) -> &ColumnFlows {
        &self.flows
    }

    /// Render one tick, then advance and maybe spawn. Returns `None` after
    /// moving out of `Running`.
    fn step_running(&mut self) -> Option<Frame> {
        match self.config.spawn {
            SpawnPolicy::Coverage if self.flows.all_covered() => {
                info!(ticks = self.tick, "all columns covered");
                self.state = DriverState::Holding {
                    remaining: self.config.hold_frames,
                };
                return None;
            }
            SpawnPolicy::Probabilistic { frames, .. } if self.tick >= frames => {
                self.state = DriverState::Done;
                return None;
            }
            _ => {}
        }

        let frame = self
            .compositor
            .render(self.chars, self.colors, self.flows.columns(), &mut self.rng);
        self.flows.advance_all(self.config.speed);
        self.maybe_spawn();
        self.tick += 1;

        if self.config.spawn == SpawnPolicy::Coverage {
            self.last_frame = Some(frame.clone());
        }
        Some(frame)
    }

    fn maybe_spawn(&mut self) {
        if self.tick < self.config.skip_frames {
            return;
        }
        let width = self.flows.width();
        if self.flows.active_count() >= width {
            return;
        }

        let column = match self.config.spawn {
            SpawnPolicy::Coverage => {
                let uncovered = self.flows.uncovered();
                if uncovered.is_empty() {
                    self.rng.random_range(0..width)
                } else {
                    uncovered[self.rng.random_range(0..uncovered.len())]
                }
            }
            SpawnPolicy::Probabilistic { chance, .. } => {
                if !self.rng.random_bool(chance) {
                    return;
                }
                self.rng.random_range(0..width)
            }
        };

        let idle = self
            .flows
            .get(column)
            .map(|state| !state.is_active())
            .unwrap_or(false);
        if idle {
            let length = self
                .config
                .flow_length
                .sample(self.flows.height(), &mut self.rng);
            self.flows.spawn(column, length);
            debug!(tick = self.tick, column, length, "spawned flow");
        }
    }
}

impl<R: Rng> Iterator for AnimationDriver<'_, R> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            match self.state {
                DriverState::Running => {
                    if let Some(frame) = self.step_running() {
                        return Some(frame);
                    }
                }
                DriverState::Holding { remaining } => {
                    if remaining == 0 {
                        self.state = DriverState::Done;
                        continue;
                    }
                    let Some(frame) = self.last_frame.clone() else {
                        self.state = DriverState::Done;
                        continue;
                    };
                    self.state = DriverState::Holding {
                        remaining: remaining - 1,
                    };
                    return Some(frame);
                }
                DriverState::Done => return None,
            }
        }
    }
}
