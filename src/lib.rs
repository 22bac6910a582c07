//! # fibwave - streaming Fibonacci / Elliott-Wave scenario engine
//!
//! Consumes an ordered feed of price bars and incrementally maintains confirmed swing
//! pivots, the Fibonacci level set of the latest anchor pair, a simplified Elliott-Wave
//! count, a single Active scenario with its drawable artifacts, and per-bar alert signals.
//!
//! ## Quick Start
//!
//! ```rust
//! use fibwave::prelude::*;
//!
//! let mut engine = EngineBuilder::new()
//!     .pivot_length(3)
//!     .min_range(0.5)
//!     .build()
//!     .unwrap();
//!
//! let bars: Vec<Bar> = (0..50)
//!     .map(|i| {
//!         let p = 100.0 + ((i as f64) * 0.4).sin() * 10.0;
//!         Bar::new(i, p + 0.5, p - 0.5, p)
//!     })
//!     .collect();
//!
//! for bar in &bars {
//!     let out = engine.on_bar(bar).unwrap();
//!     for event in &out.draw_events {
//!         // hand create/update/delete instructions to the renderer
//!         let _ = event;
//!     }
//! }
//! ```

pub mod params;
pub mod pipeline;

pub mod prelude {
    pub use crate::{
        // Parameters
        params::{get_min_range, get_period, ParamMeta, ParamType, Parameterized},
        // Stages
        pipeline::*,
        // Parallel
        replay_parallel,
        // Core types
        Bar,
        BarOutput,
        Checkpoint,
        Direction,
        EngineBuilder,
        EngineConfig,
        // Errors
        EngineError,
        FibWaveEngine,
        MinRange,
        Period,
        Pivot,
        PivotKind,
        PriceBar,
        PriceBarExt,
        ReplayError,
        ReplayIterator,
        ReplayResult,
        Result,
    };
}

use pipeline::{
    is_extension_ratio, AlertSet, AlertStateEmitter, ArtifactKind, DrawEvent,
    ElliottWaveTracker, FibonacciLevelEngine, LevelSet, LifecycleOutput, ObjectLimits,
    PivotDetector, RatioSet, RingBuffer, Scenario, ScenarioLifecycleManager, Transition,
    WaveState, DEFAULT_EXTENSION_TARGET, DEFAULT_LABEL_CAP,
};
use serde::{Deserialize, Serialize};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the engine.
///
/// Only `OutOfOrder` and `InvalidBar` are fatal: they abort the current bar and are returned
/// to the caller. Everything else is recovered locally and reported as a notice.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient history: need {need} bars, got {got}")]
    InsufficientHistory { need: usize, got: usize },

    #[error("Degenerate anchor range: high {high} equals low {low}")]
    DegenerateRange { high: f64, low: f64 },

    #[error("Anchor range {range} does not exceed minimum {min_range}")]
    RangeBelowMinimum { range: f64, min_range: f64 },

    #[error("{kind:?} limit of {limit} reached, lowest-priority artifacts dropped")]
    ObjectLimitExceeded { kind: ArtifactKind, limit: usize },

    #[error("Invalid pivot sequence: {0}")]
    InvalidPivotSequence(&'static str),

    #[error("Bar out of order: expected index {expected}, got {got}")]
    OutOfOrder { expected: usize, got: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

impl EngineError {
    /// True for feed-contract violations that abort the current bar
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::OutOfOrder { .. } | EngineError::InvalidBar { .. }
        )
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Bar count (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(EngineError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

/// Minimum anchor range in price units (finite, > 0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MinRange(f64);

impl MinRange {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(EngineError::InvalidValue(
                "MinRange cannot be NaN or infinite",
            ));
        }
        if value <= 0.0 {
            return Err(EngineError::OutOfRange {
                field: "MinRange",
                value,
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Serialize for MinRange {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> Deserialize<'de> for MinRange {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        MinRange::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// BAR TRAITS
// ============================================================

/// Bar data consumed by the engine
pub trait PriceBar {
    fn index(&self) -> usize;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    /// Only confirmed (closed) bars may finalize a pivot or invalidate a scenario.
    fn is_confirmed(&self) -> bool {
        true
    }
}

/// Extension trait with computed properties for bar data
pub trait PriceBarExt: PriceBar {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Owned copy of the bar's fields
    #[inline]
    fn to_bar(&self) -> Bar {
        Bar {
            index: self.index(),
            high: self.high(),
            low: self.low(),
            close: self.close(),
            confirmed: self.is_confirmed(),
        }
    }

    /// Validate bar data consistency
    fn validate(&self) -> Result<()> {
        let index = self.index();
        let (high, low, close) = (self.high(), self.low(), self.close());
        if high.is_nan() || low.is_nan() || close.is_nan() {
            return Err(EngineError::InvalidBar {
                index,
                reason: "NaN in bar",
            });
        }
        if high.is_infinite() || low.is_infinite() || close.is_infinite() {
            return Err(EngineError::InvalidBar {
                index,
                reason: "Infinite value in bar",
            });
        }
        if high < low {
            return Err(EngineError::InvalidBar {
                index,
                reason: "high < low",
            });
        }
        if close > high || close < low {
            return Err(EngineError::InvalidBar {
                index,
                reason: "close outside [low, high]",
            });
        }
        Ok(())
    }
}

impl<T: PriceBar + ?Sized> PriceBarExt for T {}

/// Plain bar record. Immutable once produced by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub index: usize,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub confirmed: bool,
}

impl Bar {
    /// Confirmed bar
    pub fn new(index: usize, high: f64, low: f64, close: f64) -> Self {
        Self {
            index,
            high,
            low,
            close,
            confirmed: true,
        }
    }

    /// Still-forming bar
    pub fn unconfirmed(index: usize, high: f64, low: f64, close: f64) -> Self {
        Self {
            confirmed: false,
            ..Self::new(index, high, low, close)
        }
    }
}

impl PriceBar for Bar {
    fn index(&self) -> usize {
        self.index
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn is_confirmed(&self) -> bool {
        self.confirmed
    }
}

// ============================================================
// PIVOTS
// ============================================================

/// Direction of an impulse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Direction::Up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            PivotKind::High => PivotKind::Low,
            PivotKind::Low => PivotKind::High,
        }
    }
}

/// Confirmed swing extreme. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub bar_index: usize,
    pub price: f64,
    pub kind: PivotKind,
    /// Bar that completed the confirmation window
    pub confirmed_at_index: usize,
}

// ============================================================
// ENGINE CONFIG
// ============================================================

/// Pivots kept for anchor-pair selection
const PIVOT_HISTORY: usize = 8;

/// Largest accepted `pivot_length`; the detector buffers `2L + 1` bars up front
pub const MAX_PIVOT_LENGTH: usize = 10_000;

/// Largest accepted `wave_label_cap`
pub const MAX_LABEL_CAP: usize = 10_000;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bars on each side of a pivot candidate
    pub pivot_length: Period,
    /// An anchor pair must span strictly more than this to activate a scenario
    pub min_range: MinRange,
    pub ratios: RatioSet,
    pub limits: ObjectLimits,
    pub wave_label_cap: Period,
    /// Extension ratio used for the target alert
    pub extension_target: f64,
    /// Emit `Update` events moving line and box right edges to each confirmed bar
    pub extend_right: bool,
    /// Reject NaN / inconsistent bars as fatal
    pub validate_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pivot_length: Period::new_const(5),
            min_range: MinRange::new_const(1e-8),
            ratios: RatioSet::all(),
            limits: ObjectLimits::default(),
            wave_label_cap: Period::new_const(DEFAULT_LABEL_CAP),
            extension_target: DEFAULT_EXTENSION_TARGET,
            extend_right: true,
            validate_data: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        let bounded = [
            ("pivot_length", self.pivot_length.get(), MAX_PIVOT_LENGTH),
            ("wave_label_cap", self.wave_label_cap.get(), MAX_LABEL_CAP),
        ];
        for (field, value, max) in bounded {
            if value > max {
                return Err(EngineError::OutOfRange {
                    field,
                    value: value as f64,
                    min: 1.0,
                    max: max as f64,
                });
            }
        }
        if !is_extension_ratio(self.extension_target) {
            return Err(EngineError::InvalidConfig(format!(
                "extension_target {} is not an extension ratio",
                self.extension_target
            )));
        }
        self.ratios.validate()
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Everything produced while processing one bar
#[derive(Debug, Clone, PartialEq)]
pub struct BarOutput {
    pub index: usize,
    pub confirmed: bool,
    /// Pivot confirmed by this bar
    pub pivot: Option<Pivot>,
    /// Level set recomputed for the new anchor pair, whether or not it activated
    pub levels: Option<LevelSet>,
    pub transitions: Vec<Transition>,
    pub draw_events: Vec<DrawEvent>,
    pub alerts: AlertSet,
    /// Recoverable conditions met while processing the bar
    pub notices: Vec<EngineError>,
}

impl BarOutput {
    fn new(index: usize, confirmed: bool) -> Self {
        Self {
            index,
            confirmed,
            pivot: None,
            levels: None,
            transitions: Vec::new(),
            draw_events: Vec::new(),
            alerts: AlertSet::default(),
            notices: Vec::new(),
        }
    }
}

/// Streaming engine. All state lives here and is threaded through `on_bar`.
#[derive(Debug, Clone)]
pub struct FibWaveEngine {
    config: EngineConfig,
    detector: PivotDetector,
    pivots: RingBuffer<Pivot>,
    fib: FibonacciLevelEngine,
    waves: ElliottWaveTracker,
    scenarios: ScenarioLifecycleManager,
    alerts: AlertStateEmitter,
}

impl FibWaveEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: PivotDetector::new(config.pivot_length),
            pivots: RingBuffer::with_capacity(PIVOT_HISTORY),
            fib: FibonacciLevelEngine::new(config.ratios),
            waves: ElliottWaveTracker::new(config.wave_label_cap.get()),
            scenarios: ScenarioLifecycleManager::new(config.limits, config.min_range),
            alerts: AlertStateEmitter::new(config.extension_target),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn active_scenario(&self) -> Option<&Scenario> {
        self.scenarios.active()
    }

    #[inline]
    pub fn wave_state(&self) -> Option<&WaveState> {
        self.waves.state()
    }

    #[inline]
    pub fn scenarios(&self) -> &ScenarioLifecycleManager {
        &self.scenarios
    }

    /// Recent pivots, oldest first
    pub fn pivots(&self) -> impl Iterator<Item = &Pivot> + '_ {
        self.pivots.iter()
    }

    /// True once enough confirmed bars have arrived for pivot confirmation
    pub fn is_warmed_up(&self) -> bool {
        self.detector.ensure_history().is_ok()
    }

    /// Process one bar to completion.
    ///
    /// Confirmed bars run the whole pipeline; unconfirmed bars only refresh alert signals.
    /// A fatal error leaves the engine state as it was before the call.
    pub fn on_bar<T: PriceBar + ?Sized>(&mut self, bar: &T) -> Result<BarOutput> {
        self.detector.check_order(bar)?;
        if self.config.validate_data {
            bar.validate()?;
        }

        let confirmed = bar.is_confirmed();
        let mut out = BarOutput::new(bar.index(), confirmed);
        let mut lifecycle = LifecycleOutput::default();

        if confirmed {
            match self.detector.on_bar(bar)? {
                Some(pivot) => {
                    out.pivot = Some(pivot);
                    out.levels = self.on_pivot(pivot, bar, &mut lifecycle);
                }
                None => {
                    if let Err(e) = self.detector.ensure_history() {
                        tracing::trace!(index = bar.index(), %e, "warming up");
                    }
                }
            }
        }

        out.alerts = self.alerts.on_bar(bar, self.scenarios.active());

        if confirmed {
            self.scenarios
                .on_confirmed_close(bar.index(), bar.close(), &mut lifecycle);
            if self.config.extend_right {
                self.scenarios.extend_right(bar.index(), &mut lifecycle);
            }
        }

        out.transitions = lifecycle.transitions;
        out.draw_events = lifecycle.events;
        out.notices = lifecycle.notices;
        Ok(out)
    }

    /// Process a batch. Output is identical to calling `on_bar` for each bar in turn.
    pub fn run<T: PriceBar>(&mut self, bars: &[T]) -> Result<Vec<BarOutput>> {
        bars.iter().map(|bar| self.on_bar(bar)).collect()
    }

    /// Iterate bar outputs lazily; stops after the first fatal error.
    pub fn replay<'e, 'b, T: PriceBar>(&'e mut self, bars: &'b [T]) -> ReplayIterator<'e, 'b, T> {
        ReplayIterator {
            engine: self,
            bars,
            current: 0,
            failed: false,
        }
    }

    fn on_pivot<T: PriceBar + ?Sized>(
        &mut self,
        pivot: Pivot,
        bar: &T,
        out: &mut LifecycleOutput,
    ) -> Option<LevelSet> {
        self.pivots.push(pivot);
        let wave = self.waves.on_pivot(&pivot);

        // pair with the most recent pivot of the other kind
        let opposite = self
            .pivots
            .iter()
            .rev()
            .skip(1)
            .find(|p| p.kind != pivot.kind)
            .copied()?;
        let (high, low) = match pivot.kind {
            PivotKind::High => (pivot, opposite),
            PivotKind::Low => (opposite, pivot),
        };

        match self.fib.recompute(&high, &low) {
            Ok(levels) => {
                self.scenarios.on_anchor_pair(
                    high,
                    low,
                    levels.clone(),
                    wave,
                    bar.index(),
                    bar.close(),
                    out,
                );
                Some(levels)
            }
            Err(e) => {
                tracing::warn!(%e, at_index = bar.index(), "anchor pair rejected, keeping current scenario");
                out.notices.push(e);
                None
            }
        }
    }
}

// ============================================================
// REPLAY ITERATOR
// ============================================================

/// Lazy bar-by-bar replay over a slice
pub struct ReplayIterator<'e, 'b, T: PriceBar> {
    engine: &'e mut FibWaveEngine,
    bars: &'b [T],
    current: usize,
    failed: bool,
}

impl<'e, 'b, T: PriceBar> Iterator for ReplayIterator<'e, 'b, T> {
    type Item = Result<BarOutput>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let bar = self.bars.get(self.current)?;
        self.current += 1;
        let result = self.engine.on_bar(bar);
        self.failed = result.is_err();
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed {
            0
        } else {
            self.bars.len().saturating_sub(self.current)
        };
        (0, Some(remaining))
    }
}

// ============================================================
// CHECKPOINT
// ============================================================

/// Resumable engine state.
///
/// Holds the confirmation window, recent pivots, the wave count, the Active scenario with
/// its owned handles, and the last confirmed close. No other history is needed to resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub config: EngineConfig,
    detector: PivotDetector,
    pivots: RingBuffer<Pivot>,
    waves: ElliottWaveTracker,
    scenarios: ScenarioLifecycleManager,
    alerts: AlertStateEmitter,
}

impl FibWaveEngine {
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            config: self.config.clone(),
            detector: self.detector.clone(),
            pivots: self.pivots.clone(),
            waves: self.waves.clone(),
            scenarios: self.scenarios.clone(),
            alerts: self.alerts.clone(),
        }
    }

    /// Rebuild an engine from a checkpoint, rejecting state that contradicts its config.
    pub fn restore(checkpoint: Checkpoint) -> Result<Self> {
        let Checkpoint {
            config,
            detector,
            pivots,
            waves,
            scenarios,
            alerts,
        } = checkpoint;
        config.validate()?;

        if !detector.is_consistent() || detector.length() != config.pivot_length.get() {
            return Err(EngineError::InvalidConfig(
                "checkpoint pivot window does not match pivot_length".into(),
            ));
        }
        if !pivots.is_consistent() || pivots.capacity() != PIVOT_HISTORY {
            return Err(EngineError::InvalidConfig(
                "checkpoint pivot history is malformed".into(),
            ));
        }
        if !waves.is_consistent() || waves.label_cap() != config.wave_label_cap.get() {
            return Err(EngineError::InvalidConfig(
                "checkpoint wave state does not match wave_label_cap".into(),
            ));
        }
        if !scenarios.is_consistent() || scenarios.limits() != config.limits {
            return Err(EngineError::InvalidConfig(
                "checkpoint scenario state is inconsistent".into(),
            ));
        }
        if scenarios.min_range() != config.min_range {
            return Err(EngineError::InvalidConfig(
                "checkpoint scenario state does not match min_range".into(),
            ));
        }
        if alerts.extension_target() != config.extension_target {
            return Err(EngineError::InvalidConfig(
                "checkpoint alert state does not match extension_target".into(),
            ));
        }

        tracing::debug!(
            last_index = ?detector.last_index(),
            active = scenarios.active().map(|s| s.id.0),
            "engine restored from checkpoint"
        );

        Ok(Self {
            fib: FibonacciLevelEngine::new(config.ratios),
            detector,
            pivots,
            waves,
            scenarios,
            alerts,
            config,
        })
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating FibWaveEngine instances
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    pivot_length: usize,
    min_range: f64,
    wave_label_cap: usize,
    config: EngineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        let config = EngineConfig::default();
        Self {
            pivot_length: config.pivot_length.get(),
            min_range: config.min_range.get(),
            wave_label_cap: config.wave_label_cap.get(),
            config,
        }
    }

    /// Bars on each side of a pivot candidate
    pub fn pivot_length(mut self, bars: usize) -> Self {
        self.pivot_length = bars;
        self
    }

    /// Minimum anchor range (price units)
    pub fn min_range(mut self, range: f64) -> Self {
        self.min_range = range;
        self
    }

    /// Enabled Fibonacci ratios
    pub fn ratios(mut self, ratios: RatioSet) -> Self {
        self.config.ratios = ratios;
        self
    }

    /// Artifact ceilings per kind
    pub fn limits(mut self, limits: ObjectLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn wave_label_cap(mut self, cap: usize) -> Self {
        self.wave_label_cap = cap;
        self
    }

    pub fn extension_target(mut self, ratio: f64) -> Self {
        self.config.extension_target = ratio;
        self
    }

    pub fn extend_right(mut self, enable: bool) -> Self {
        self.config.extend_right = enable;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Validated configuration without building an engine
    pub fn config(self) -> Result<EngineConfig> {
        let mut config = self.config;
        config.pivot_length = Period::new(self.pivot_length)?;
        config.min_range = MinRange::new(self.min_range)?;
        config.wave_label_cap = Period::new(self.wave_label_cap)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the engine
    pub fn build(self) -> Result<FibWaveEngine> {
        FibWaveEngine::new(self.config()?)
    }
}

// ============================================================
// PARALLEL REPLAY
// ============================================================

use rayon::prelude::*;

/// Result of replaying a single instrument
#[derive(Debug)]
pub struct ReplayResult {
    pub symbol: String,
    pub outputs: Vec<BarOutput>,
}

/// Error from replaying a single instrument
#[derive(Debug)]
pub struct ReplayError {
    pub symbol: String,
    pub error: EngineError,
}

/// Replay many instruments concurrently, one engine per instrument.
pub fn replay_parallel<'a, T, I>(
    config: &EngineConfig,
    instruments: I,
) -> (Vec<ReplayResult>, Vec<ReplayError>)
where
    T: PriceBar + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            FibWaveEngine::new(config.clone())
                .and_then(|mut engine| engine.run(bars))
                .map(|outputs| ReplayResult {
                    symbol: symbol.to_string(),
                    outputs,
                })
                .map_err(|error| ReplayError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
