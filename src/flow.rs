//! Per-column falling-code simulation state.

use rand::Rng;
use serde::Deserialize;

/// Default rows a flow's head moves per tick.
pub const DEFAULT_SPEED: usize = 2;
/// Upper bound on either flow length ratio. Longer trails would keep a
/// column busy for an unbounded number of ticks.
pub const MAX_FLOW_LENGTH_RATIO: f32 = 16.0;

/// State of the flow hosted by one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnState {
    /// Row of the leading edge; `None` while no flow is active.
    pub fall_position: Option<usize>,
    pub flow_length: usize,
    /// Set once a flow in this column has fully drained; never cleared.
    pub covered: bool,
}

impl ColumnState {
    pub fn is_active(&self) -> bool {
        self.fall_position.is_some()
    }

    /// Rows `[start, head)` rendered as trail, clipped at row 0.
    pub fn trail_rows(&self) -> Option<std::ops::Range<usize>> {
        let head = self.fall_position?;
        Some(head.saturating_sub(self.flow_length)..head)
    }
}

/// Flow length bounds as fractions of grid height.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FlowLengthRange {
    pub min_ratio: f32,
    pub max_ratio: f32,
}

impl Default for FlowLengthRange {
    fn default() -> Self {
        Self {
            min_ratio: 0.2,
            max_ratio: 1.2,
        }
    }
}

impl FlowLengthRange {
    /// Draws from `[min, max)` rows, clamped to at least one row so a flow can
    /// never deactivate on the tick it spawns.
    pub fn sample<R: Rng + ?Sized>(&self, height: usize, rng: &mut R) -> usize {
        let low = (self.min_ratio * height as f32) as usize;
        let high = (self.max_ratio * height as f32) as usize;
        let drawn = if high > low {
            rng.random_range(low..high)
        } else {
            low
        };
        drawn.max(1)
    }
}

/// Column states for one grid, owned by a single animation run.
#[derive(Debug, Clone)]
pub struct ColumnFlows {
    height: usize,
    columns: Vec<ColumnState>,
}

impl ColumnFlows {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            height,
            columns: vec![ColumnState::default(); width],
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn columns(&self) -> &[ColumnState] {
        &self.columns
    }

    pub fn get(&self, column: usize) -> Option<&ColumnState> {
        self.columns.get(column)
    }

    /// Start a flow at the top of `column`. Returns `false` (and leaves state
    /// untouched) if the column is out of range or already hosts a flow.
    pub fn spawn(&mut self, column: usize, flow_length: usize) -> bool {
        let Some(state) = self.columns.get_mut(column) else {
            return false;
        };
        if state.is_active() {
            return false;
        }
        state.fall_position = Some(0);
        state.flow_length = flow_length.max(1);
        true
    }

    /// Move the flow in `column` down by `speed` rows, deactivating it and
    /// marking the column covered once the whole trail has left the grid.
    /// Returns `true` if this call deactivated the flow.
    pub fn advance(&mut self, column: usize, speed: usize) -> bool {
        let height = self.height;
        let Some(state) = self.columns.get_mut(column) else {
            return false;
        };
        let Some(position) = state.fall_position else {
            return false;
        };

        let next = position.saturating_add(speed.max(1));
        if next >= height.saturating_add(state.flow_length) {
            state.fall_position = None;
            state.covered = true;
            true
        } else {
            state.fall_position = Some(next);
            false
        }
    }

    /// Advance every column; returns how many flows finished this tick.
    pub fn advance_all(&mut self, speed: usize) -> usize {
        (0..self.columns.len())
            .filter(|&column| self.advance(column, speed))
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.columns.iter().filter(|state| state.is_active()).count()
    }

    pub fn all_covered(&self) -> bool {
        self.columns.iter().all(|state| state.covered)
    }

    pub fn uncovered(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(column, state)| (!state.covered).then_some(column))
            .collect()
    }
}
