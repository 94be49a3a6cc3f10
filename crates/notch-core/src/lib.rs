//! Core types for the Notch-Delta lateral inhibition model.
//!
//! A [`Colony`] owns a toroidal grid of [`Cell`]s. Every tick each active
//! cell senses whether any of its eight neighbors has committed to the
//! [`Fate::Black`] fate, then relaxes its internal Notch level toward
//! `beta / alpha` and commits once the level crosses the shared threshold.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Moore neighborhood offsets as `(row, column)` deltas, excluding the cell itself.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Draws a uniform sample from `(0, 1)`, redrawing until the value is non-zero.
pub fn nonzero_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let value: f64 = rng.random();
        if value != 0.0 {
            return value;
        }
    }
}

/// Returns the eight wrapped neighbor coordinates of `(row, col)` on a `rows × columns` torus.
#[must_use]
pub fn toroidal_neighbors(
    rows: usize,
    columns: usize,
    row: usize,
    col: usize,
) -> [(usize, usize); 8] {
    NEIGHBOR_OFFSETS.map(|(dr, dc)| {
        let r = (row as isize + dr).rem_euclid(rows as isize) as usize;
        let c = (col as isize + dc).rem_euclid(columns as isize) as usize;
        (r, c)
    })
}

/// Errors raised when building or addressing a colony.
#[derive(Debug, Error, PartialEq)]
pub enum ColonyError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Supplied cells do not fill the requested grid.
    #[error("expected {expected} cells for the grid, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    /// Coordinates fall outside the grid.
    #[error("cell ({row}, {col}) is outside the {rows}x{columns} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        columns: usize,
    },
    /// A decay delay could not be parsed.
    #[error("invalid decay delay `{0}` (expected a non-negative number or `inf`)")]
    InvalidDelay(String),
}

/// Cell fate (rendered color).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Fate {
    #[default]
    White,
    Black,
}

impl Fate {
    /// Whether this is the committed (Black) fate.
    #[must_use]
    pub const fn is_committed(self) -> bool {
        matches!(self, Self::Black)
    }
}

/// Deactivation delay (`tau`) shared by every cell of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecayDelay {
    /// Countdown of the given number of ticks once a neighbor signal arrives.
    Finite(f64),
    /// The countdown never expires; cells only leave the active state by committing.
    Unbounded,
}

impl DecayDelay {
    /// Countdown length in ticks; `Unbounded` maps to positive infinity.
    #[must_use]
    pub const fn as_ticks(self) -> f64 {
        match self {
            Self::Finite(ticks) => ticks,
            Self::Unbounded => f64::INFINITY,
        }
    }

    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl Default for DecayDelay {
    fn default() -> Self {
        Self::Finite(0.0)
    }
}

impl From<f64> for DecayDelay {
    fn from(value: f64) -> Self {
        if value == f64::INFINITY {
            Self::Unbounded
        } else {
            Self::Finite(value)
        }
    }
}

impl fmt::Display for DecayDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(ticks) => write!(f, "{ticks}"),
            Self::Unbounded => f.write_str("inf"),
        }
    }
}

impl FromStr for DecayDelay {
    type Err = ColonyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if matches!(
            trimmed.to_ascii_lowercase().as_str(),
            "inf" | "infinity" | "unbounded"
        ) || trimmed == "∞"
        {
            return Ok(Self::Unbounded);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value >= 0.0 => Ok(Self::from(value)),
            _ => Err(ColonyError::InvalidDelay(s.to_string())),
        }
    }
}

impl Serialize for DecayDelay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(ticks) => serializer.serialize_f64(*ticks),
            Self::Unbounded => serializer.serialize_str("inf"),
        }
    }
}

impl<'de> Deserialize<'de> for DecayDelay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Ticks(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Ticks(ticks) => Ok(Self::from(ticks)),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Deactivation countdown of an active cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Countdown {
    /// No neighbor signal received yet.
    #[default]
    Unarmed,
    /// Ticks remaining before deactivation.
    Armed(f64),
}

/// Discrete state of a cell.
///
/// Color is implied by the phase: only `Committed` cells are Black, and
/// neither inactive phase carries a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CellPhase {
    Active { countdown: Countdown },
    /// Crossed the Notch threshold (Black, frozen).
    Committed,
    /// Countdown expired before committing (White, frozen).
    Deactivated,
}

impl CellPhase {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }

    #[must_use]
    pub const fn fate(self) -> Fate {
        match self {
            Self::Committed => Fate::Black,
            Self::Active { .. } | Self::Deactivated => Fate::White,
        }
    }
}

impl Default for CellPhase {
    fn default() -> Self {
        Self::Active {
            countdown: Countdown::Unarmed,
        }
    }
}

/// Result of applying a single tick to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The cell was already inactive; nothing changed.
    Idle,
    /// Signal level relaxed, cell stays active.
    Updated,
    /// Signal crossed the threshold this tick.
    Committed,
    /// Countdown expired this tick.
    Deactivated,
}

/// One lattice site.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    alpha: f64,
    beta: f64,
    signal_level: f64,
    phase: CellPhase,
    tau: DecayDelay,
    notch_threshold: f64,
}

impl Cell {
    /// Creates an active White cell with zero signal.
    ///
    /// `alpha` must be non-zero; [`Cell::random`] guarantees this.
    #[must_use]
    pub fn new(alpha: f64, beta: f64, tau: DecayDelay, notch_threshold: f64) -> Self {
        Self {
            alpha,
            beta,
            signal_level: 0.0,
            phase: CellPhase::default(),
            tau,
            notch_threshold,
        }
    }

    /// Creates a cell with `alpha` and `beta` drawn uniformly from `(0, 1)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, tau: DecayDelay, notch_threshold: f64) -> Self {
        let alpha = nonzero_unit(rng);
        let beta = nonzero_unit(rng);
        Self::new(alpha, beta, tau, notch_threshold)
    }

    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub const fn beta(&self) -> f64 {
        self.beta
    }

    /// Current Notch level.
    #[must_use]
    pub const fn signal_level(&self) -> f64 {
        self.signal_level
    }

    #[must_use]
    pub const fn phase(&self) -> CellPhase {
        self.phase
    }

    #[must_use]
    pub const fn tau(&self) -> DecayDelay {
        self.tau
    }

    #[must_use]
    pub const fn notch_threshold(&self) -> f64 {
        self.notch_threshold
    }

    /// Level the Notch signal relaxes toward (`beta / alpha`).
    #[must_use]
    pub fn steady_state(&self) -> f64 {
        self.beta / self.alpha
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    #[must_use]
    pub const fn fate(&self) -> Fate {
        self.phase.fate()
    }

    /// Forces the cell into the committed (Black, inactive) phase.
    pub fn commit(&mut self) {
        self.phase = CellPhase::Committed;
    }

    /// Advances the cell by one tick given whether a Black neighbor was sensed.
    ///
    /// The countdown is checked before the signal update: a cell whose
    /// countdown has reached zero deactivates without a final chance to commit.
    pub fn apply_time_tick(&mut self, delta_signal: bool) -> TickOutcome {
        let CellPhase::Active { mut countdown } = self.phase else {
            return TickOutcome::Idle;
        };

        if countdown == Countdown::Unarmed && delta_signal {
            countdown = Countdown::Armed(self.tau.as_ticks());
        }

        if let Countdown::Armed(remaining) = countdown {
            if remaining > 0.0 {
                countdown = Countdown::Armed(remaining - 1.0);
            } else {
                self.phase = CellPhase::Deactivated;
                return TickOutcome::Deactivated;
            }
        }

        self.relax_signal();
        if self.signal_level >= self.notch_threshold {
            self.phase = CellPhase::Committed;
            return TickOutcome::Committed;
        }

        self.phase = CellPhase::Active { countdown };
        TickOutcome::Updated
    }

    /// One unit step of `dN/dt = beta - alpha * N`, solved exactly.
    fn relax_signal(&mut self) {
        let steady = self.steady_state();
        self.signal_level = steady + (self.signal_level - steady) * (-self.alpha).exp();
    }
}

/// Simulation clock (ticks applied since construction).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Whole-grid phase counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Census {
    pub active: usize,
    pub committed: usize,
    pub deactivated: usize,
}

impl Census {
    /// Total number of cells counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.active + self.committed + self.deactivated
    }
}

/// Summary recorded after each colony tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: Tick,
    /// Cells still active after the tick.
    pub active: usize,
    /// Black cells after the tick.
    pub committed: usize,
    pub newly_committed: usize,
    pub newly_deactivated: usize,
}

/// Static configuration for a colony run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColonyConfig {
    pub rows: usize,
    pub columns: usize,
    /// Deactivation delay shared by every cell.
    pub tau: DecayDelay,
    /// Notch level at which a cell commits to Black.
    pub notch_threshold: f64,
    /// Optional RNG seed for reproducible `alpha`/`beta` draws.
    pub rng_seed: Option<u64>,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            columns: 100,
            tau: DecayDelay::default(),
            notch_threshold: 0.5,
            rng_seed: None,
            history_capacity: 256,
        }
    }
}

impl ColonyConfig {
    /// Configuration with the given grid and cell parameters, other fields defaulted.
    #[must_use]
    pub fn new(rows: usize, columns: usize, tau: DecayDelay, notch_threshold: f64) -> Self {
        Self {
            rows,
            columns,
            tau,
            notch_threshold,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ColonyError> {
        if self.rows == 0 || self.columns == 0 {
            return Err(ColonyError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if let DecayDelay::Finite(ticks) = self.tau {
            if !ticks.is_finite() || ticks < 0.0 {
                return Err(ColonyError::InvalidConfig(
                    "finite tau must be non-negative; use DecayDelay::Unbounded for no expiry",
                ));
            }
        }
        if self.notch_threshold.is_nan() {
            return Err(ColonyError::InvalidConfig(
                "notch_threshold must be a number",
            ));
        }
        if self.history_capacity == 0 {
            return Err(ColonyError::InvalidConfig(
                "history_capacity must be positive",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

/// Toroidal grid of cells advanced in synchronous ticks.
#[derive(Debug, Clone)]
pub struct Colony {
    config: ColonyConfig,
    tick: Tick,
    cells: Vec<Cell>,
    /// Per-cell sensed delta signal for the current tick; `None` for inactive cells.
    signal_scratch: Vec<Option<bool>>,
    history: VecDeque<TickSummary>,
}

impl Colony {
    /// Builds a colony with randomly drawn cell rates.
    pub fn new(config: ColonyConfig) -> Result<Self, ColonyError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let cells = (0..config.rows * config.columns)
            .map(|_| Cell::random(&mut rng, config.tau, config.notch_threshold))
            .collect();
        Ok(Self::assemble(config, cells))
    }

    /// Builds a colony from explicit cells laid out row-major.
    pub fn from_cells(config: ColonyConfig, cells: Vec<Cell>) -> Result<Self, ColonyError> {
        config.validate()?;
        let expected = config.rows * config.columns;
        if cells.len() != expected {
            return Err(ColonyError::ShapeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self::assemble(config, cells))
    }

    fn assemble(config: ColonyConfig, cells: Vec<Cell>) -> Self {
        let history_capacity = config.history_capacity;
        Self {
            signal_scratch: vec![None; cells.len()],
            cells,
            config,
            tick: Tick::zero(),
            history: VecDeque::with_capacity(history_capacity),
        }
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.config.rows
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.config.columns
    }

    #[must_use]
    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Iterate over retained tick summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows() && col < self.columns()).then(|| row * self.columns() + col)
    }

    /// Immutable access to a specific cell.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.offset(row, col).map(|idx| &self.cells[idx])
    }

    /// Row-major view of every cell.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Forces the cell at `(row, col)` to Black.
    pub fn commit(&mut self, row: usize, col: usize) -> Result<(), ColonyError> {
        let idx = self.offset(row, col).ok_or(ColonyError::OutOfBounds {
            row,
            col,
            rows: self.rows(),
            columns: self.columns(),
        })?;
        self.cells[idx].commit();
        Ok(())
    }

    /// Wrapped Moore neighborhood of `(row, col)`.
    #[must_use]
    pub fn neighbors(&self, row: usize, col: usize) -> [(usize, usize); 8] {
        toroidal_neighbors(self.rows(), self.columns(), row, col)
    }

    /// Whether any neighbor of `(row, col)` is currently Black.
    #[must_use]
    pub fn delta_signal(&self, row: usize, col: usize) -> bool {
        sense_delta(&self.cells, self.rows(), self.columns(), row, col)
    }

    /// Counts cells per phase.
    #[must_use]
    pub fn census(&self) -> Census {
        self.cells
            .iter()
            .fold(Census::default(), |mut census, cell| {
                match cell.phase() {
                    CellPhase::Active { .. } => census.active += 1,
                    CellPhase::Committed => census.committed += 1,
                    CellPhase::Deactivated => census.deactivated += 1,
                }
                census
            })
    }

    /// Snapshot of every cell's fate, one inner `Vec` per row.
    #[must_use]
    pub fn as_color_array(&self) -> Vec<Vec<Fate>> {
        self.cells
            .chunks(self.columns())
            .map(|row| row.iter().map(Cell::fate).collect())
            .collect()
    }

    /// Computes every active cell's delta signal from the current colors.
    ///
    /// Only reads `cells`; nothing is mutated until the whole grid has been sensed.
    fn stage_sense(&mut self) {
        let rows = self.rows();
        let columns = self.columns();
        let cells = &self.cells;
        self.signal_scratch
            .par_chunks_mut(columns)
            .enumerate()
            .for_each(|(row, signals)| {
                for (col, slot) in signals.iter_mut().enumerate() {
                    let cell = &cells[row * columns + col];
                    *slot = cell
                        .is_active()
                        .then(|| sense_delta(cells, rows, columns, row, col));
                }
            });
    }

    fn stage_apply(&mut self, tick: Tick) -> TickSummary {
        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };
        for (cell, signal) in self.cells.iter_mut().zip(&self.signal_scratch) {
            let Some(delta) = *signal else {
                continue;
            };
            match cell.apply_time_tick(delta) {
                TickOutcome::Committed => summary.newly_committed += 1,
                TickOutcome::Deactivated => summary.newly_deactivated += 1,
                TickOutcome::Updated | TickOutcome::Idle => {}
            }
        }
        let census = self.census();
        summary.active = census.active;
        summary.committed = census.committed;
        summary
    }

    fn stage_history(&mut self, summary: TickSummary) {
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);
    }

    /// Applies one synchronous tick: sense the whole grid, then update it.
    pub fn step(&mut self) -> TickSummary {
        let next_tick = self.tick.next();
        self.stage_sense();
        let summary = self.stage_apply(next_tick);
        self.stage_history(summary);
        self.tick = next_tick;
        summary
    }

    /// Applies `rounds` ticks in sequence.
    pub fn run(&mut self, rounds: usize) {
        for _ in 0..rounds {
            let summary = self.step();
            debug!(
                tick = summary.tick.0,
                active = summary.active,
                committed = summary.committed,
                newly_committed = summary.newly_committed,
                newly_deactivated = summary.newly_deactivated,
                "colony tick",
            );
        }
    }
}

fn sense_delta(cells: &[Cell], rows: usize, columns: usize, row: usize, col: usize) -> bool {
    toroidal_neighbors(rows, columns, row, col)
        .iter()
        .any(|&(r, c)| cells[r * columns + c].fate().is_committed())
}
