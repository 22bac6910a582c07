//! Fibonacci retracement / extension levels
//!
//! Levels are derived from one High and one Low anchor pivot. Direction follows the order in
//! which the anchors formed: low first then high is an upward impulse, high first then low a
//! downward one. For an upward impulse of range `R = high - low`:
//!
//! - retracement at ratio `r`: `high - r * R`
//! - extension at ratio `r > 1`: `high + (r - 1) * R`
//!
//! and the mirror image around `low` for a downward impulse. Every recompute produces a new
//! [`LevelSet`]; level sets are never patched in place.

use serde::{Deserialize, Serialize};

use super::helpers::{same_ratio, spans_overlap, RANGE_EPSILON};
use crate::{Direction, EngineError, Pivot, PivotKind, Result};

// ============================================================
// RATIO TABLE
// ============================================================

/// Retracement ratios, shallow to deep
pub const RETRACEMENT_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

/// Extension ratios, near to far
pub const EXTENSION_RATIOS: [f64; 9] = [1.272, 1.414, 1.618, 2.0, 2.272, 2.414, 2.618, 3.0, 3.618];

/// Golden Zone band (ratio bounds)
pub const GOLDEN_ZONE: (f64, f64) = (0.618, 0.786);

/// Golden Pocket band (ratio bounds)
pub const GOLDEN_POCKET: (f64, f64) = (0.618, 0.65);

/// Default extension used as the projected continuation target
pub const DEFAULT_EXTENSION_TARGET: f64 = 1.618;

const TABLE_LEN: usize = RETRACEMENT_RATIOS.len() + EXTENSION_RATIOS.len();

fn table() -> impl Iterator<Item = f64> {
    RETRACEMENT_RATIOS.into_iter().chain(EXTENSION_RATIOS)
}

/// True if `ratio` is one of the fixed extension ratios
pub fn is_extension_ratio(ratio: f64) -> bool {
    EXTENSION_RATIOS.iter().any(|&r| same_ratio(r, ratio))
}

/// Enabled subset of the fixed ratio table (bitmask, one bit per ratio).
///
/// The 0% and 100% anchor levels are always produced and are not part of the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioSet(u16);

impl Default for RatioSet {
    fn default() -> Self {
        Self::all()
    }
}

impl RatioSet {
    pub const fn all() -> Self {
        Self((1 << TABLE_LEN) - 1)
    }

    pub const fn none() -> Self {
        Self(0)
    }

    pub const fn retracements() -> Self {
        Self((1 << RETRACEMENT_RATIOS.len()) - 1)
    }

    pub const fn extensions() -> Self {
        Self(Self::all().0 & !Self::retracements().0)
    }

    fn slot(ratio: f64) -> Result<usize> {
        table()
            .position(|r| same_ratio(r, ratio))
            .ok_or(EngineError::InvalidValue(
                "ratio is not in the Fibonacci ratio table",
            ))
    }

    /// Enable `ratio`; fails if it is not a table ratio.
    pub fn with(self, ratio: f64) -> Result<Self> {
        Ok(Self(self.0 | 1 << Self::slot(ratio)?))
    }

    /// Disable `ratio`; fails if it is not a table ratio.
    pub fn without(self, ratio: f64) -> Result<Self> {
        Ok(Self(self.0 & !(1 << Self::slot(ratio)?)))
    }

    pub fn contains(self, ratio: f64) -> bool {
        Self::slot(ratio).is_ok_and(|slot| self.0 & (1 << slot) != 0)
    }

    /// Enabled ratios in table order.
    pub fn iter(self) -> impl Iterator<Item = f64> {
        table()
            .enumerate()
            .filter(move |(slot, _)| self.0 & (1 << slot) != 0)
            .map(|(_, r)| r)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Reject bit patterns outside the table (e.g. from a hand-edited checkpoint).
    pub fn validate(self) -> Result<()> {
        if self.0 & !Self::all().0 != 0 {
            return Err(EngineError::InvalidConfig(format!(
                "ratio set {:#06x} has bits outside the {TABLE_LEN}-ratio table",
                self.0
            )));
        }
        Ok(())
    }
}

// ============================================================
// LEVEL TYPES
// ============================================================

/// What a level represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    /// 0% or 100% of the anchor range
    Anchor,
    Retracement,
    Extension,
}

/// Named retracement band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    GoldenZone,
    GoldenPocket,
}

impl Zone {
    /// Ratio bounds `(from, to)`
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Zone::GoldenZone => GOLDEN_ZONE,
            Zone::GoldenPocket => GOLDEN_POCKET,
        }
    }
}

/// A single derived price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
    pub kind: LevelKind,
    /// Band this level bounds, if any. 0.618 opens both bands and is tagged with the
    /// narrower Golden Pocket.
    pub zone: Option<Zone>,
}

/// Price band for a [`Zone`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneBand {
    pub zone: Zone,
    pub upper: f64,
    pub lower: f64,
}

impl ZoneBand {
    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        (self.lower..=self.upper).contains(&price)
    }

    /// True if a bar spanning `[low, high]` touches the band.
    #[inline]
    pub fn touched_by(&self, low: f64, high: f64) -> bool {
        spans_overlap(low, high, self.lower, self.upper)
    }
}

/// Complete level set for one anchor pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub direction: Direction,
    pub high: f64,
    pub low: f64,
    /// Sorted by ratio ascending.
    pub levels: Vec<FibLevel>,
    pub bands: Vec<ZoneBand>,
}

impl LevelSet {
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Price of an arbitrary ratio for this anchor pair.
    #[inline]
    pub fn price_at(&self, ratio: f64) -> f64 {
        level_price(self.direction, self.high, self.low, ratio)
    }

    /// Price of the 0% level (the impulse end).
    #[inline]
    pub fn zero_price(&self) -> f64 {
        self.price_at(0.0)
    }

    /// Price of the 100% level (the impulse origin).
    #[inline]
    pub fn full_price(&self) -> f64 {
        self.price_at(1.0)
    }

    pub fn level(&self, ratio: f64) -> Option<&FibLevel> {
        self.levels.iter().find(|l| same_ratio(l.ratio, ratio))
    }

    pub fn band(&self, zone: Zone) -> Option<&ZoneBand> {
        self.bands.iter().find(|b| b.zone == zone)
    }

    /// True if `price` lies within the anchor range (inclusive).
    #[inline]
    pub fn within_anchors(&self, price: f64) -> bool {
        (self.low..=self.high).contains(&price)
    }
}

/// Project `ratio` onto an anchor pair.
pub fn level_price(direction: Direction, high: f64, low: f64, ratio: f64) -> f64 {
    let range = high - low;
    match (direction, ratio > 1.0) {
        (Direction::Up, false) => high - ratio * range,
        (Direction::Up, true) => high + (ratio - 1.0) * range,
        (Direction::Down, false) => low + ratio * range,
        (Direction::Down, true) => low - (ratio - 1.0) * range,
    }
}

// ============================================================
// ENGINE
// ============================================================

/// Derives level sets from anchor pairs. Holds only the ratio toggles; no per-pair state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FibonacciLevelEngine {
    ratios: RatioSet,
}

impl FibonacciLevelEngine {
    pub fn new(ratios: RatioSet) -> Self {
        Self { ratios }
    }

    pub fn ratios(&self) -> RatioSet {
        self.ratios
    }

    /// Full replacement level set for an anchor pair.
    ///
    /// Errors: `InvalidPivotSequence` when the anchors are not one High and one Low on
    /// distinct bars or the high sits below the low; `DegenerateRange` when their prices
    /// coincide. No level set is produced in either case.
    pub fn recompute(&self, anchor_high: &Pivot, anchor_low: &Pivot) -> Result<LevelSet> {
        if anchor_high.kind != PivotKind::High || anchor_low.kind != PivotKind::Low {
            return Err(EngineError::InvalidPivotSequence(
                "anchors must be one High and one Low pivot",
            ));
        }
        if anchor_high.bar_index == anchor_low.bar_index {
            return Err(EngineError::InvalidPivotSequence(
                "anchor pivots share a bar",
            ));
        }

        let (high, low) = (anchor_high.price, anchor_low.price);
        let range = high - low;
        if range.abs() <= RANGE_EPSILON {
            return Err(EngineError::DegenerateRange { high, low });
        }
        if range < 0.0 {
            return Err(EngineError::InvalidPivotSequence(
                "anchor high is below anchor low",
            ));
        }

        let direction = if anchor_low.bar_index < anchor_high.bar_index {
            Direction::Up
        } else {
            Direction::Down
        };

        let mut levels = Vec::with_capacity(self.ratios.len() + 2);
        levels.push(self.level(direction, high, low, 0.0, LevelKind::Anchor));
        levels.extend(
            self.ratios
                .iter()
                .filter(|&r| r < 1.0)
                .map(|r| self.level(direction, high, low, r, LevelKind::Retracement)),
        );
        levels.push(self.level(direction, high, low, 1.0, LevelKind::Anchor));
        levels.extend(
            self.ratios
                .iter()
                .filter(|&r| r > 1.0)
                .map(|r| self.level(direction, high, low, r, LevelKind::Extension)),
        );

        let bands = [Zone::GoldenPocket, Zone::GoldenZone]
            .into_iter()
            .map(|zone| {
                let (from, to) = zone.bounds();
                let (a, b) = (
                    level_price(direction, high, low, from),
                    level_price(direction, high, low, to),
                );
                ZoneBand {
                    zone,
                    upper: a.max(b),
                    lower: a.min(b),
                }
            })
            .collect();

        Ok(LevelSet {
            direction,
            high,
            low,
            levels,
            bands,
        })
    }

    fn level(
        &self,
        direction: Direction,
        high: f64,
        low: f64,
        ratio: f64,
        kind: LevelKind,
    ) -> FibLevel {
        let zone = if same_ratio(ratio, GOLDEN_POCKET.0) {
            Some(Zone::GoldenPocket)
        } else if same_ratio(ratio, GOLDEN_ZONE.1) {
            Some(Zone::GoldenZone)
        } else {
            None
        };
        FibLevel {
            ratio,
            price: level_price(direction, high, low, ratio),
            kind,
            zone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pivot(kind: PivotKind, bar_index: usize, price: f64) -> Pivot {
        Pivot {
            bar_index,
            price,
            kind,
            confirmed_at_index: bar_index + 3,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_upward_impulse_levels() {
        let engine = FibonacciLevelEngine::default();
        let set = engine
            .recompute(
                &pivot(PivotKind::High, 20, 150.0),
                &pivot(PivotKind::Low, 10, 100.0),
            )
            .unwrap();

        assert_eq!(set.direction, Direction::Up);
        assert!(approx(set.level(0.618).unwrap().price, 119.1));
        assert!(approx(set.price_at(0.65), 117.5));
        assert!(approx(set.level(1.618).unwrap().price, 180.9));
        assert!(approx(set.zero_price(), 150.0));
        assert!(approx(set.full_price(), 100.0));

        let pocket = set.band(Zone::GoldenPocket).unwrap();
        assert!(approx(pocket.upper, 119.1));
        assert!(approx(pocket.lower, 117.5));
        let zone = set.band(Zone::GoldenZone).unwrap();
        assert!(approx(zone.lower, 110.7));
    }

    #[test]
    fn test_downward_impulse_mirrors() {
        let engine = FibonacciLevelEngine::default();
        let set = engine
            .recompute(
                &pivot(PivotKind::High, 10, 150.0),
                &pivot(PivotKind::Low, 20, 100.0),
            )
            .unwrap();

        assert_eq!(set.direction, Direction::Down);
        assert!(approx(set.level(0.618).unwrap().price, 130.9));
        assert!(approx(set.level(1.618).unwrap().price, 69.1));
        assert!(approx(set.zero_price(), 100.0));
        assert!(approx(set.full_price(), 150.0));
    }

    #[test]
    fn test_levels_sorted_and_complete() {
        let engine = FibonacciLevelEngine::default();
        let set = engine
            .recompute(
                &pivot(PivotKind::High, 20, 150.0),
                &pivot(PivotKind::Low, 10, 100.0),
            )
            .unwrap();

        assert_eq!(set.levels.len(), 2 + RETRACEMENT_RATIOS.len() + EXTENSION_RATIOS.len());
        assert!(set.levels.windows(2).all(|w| w[0].ratio < w[1].ratio));
        assert_eq!(set.levels[0].kind, LevelKind::Anchor);
        assert_eq!(set.level(1.0).unwrap().kind, LevelKind::Anchor);
        assert_eq!(set.level(0.618).unwrap().zone, Some(Zone::GoldenPocket));
        assert_eq!(set.level(0.786).unwrap().zone, Some(Zone::GoldenZone));
        assert_eq!(set.level(0.5).unwrap().zone, None);
    }

    #[test]
    fn test_degenerate_range() {
        let engine = FibonacciLevelEngine::default();
        let err = engine
            .recompute(
                &pivot(PivotKind::High, 11, 100.0),
                &pivot(PivotKind::Low, 10, 100.0),
            )
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::DegenerateRange {
                high: 100.0,
                low: 100.0
            }
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invalid_sequences() {
        let engine = FibonacciLevelEngine::default();
        let same_kind = engine.recompute(
            &pivot(PivotKind::High, 20, 150.0),
            &pivot(PivotKind::High, 10, 100.0),
        );
        assert!(matches!(same_kind, Err(EngineError::InvalidPivotSequence(_))));

        let inverted = engine.recompute(
            &pivot(PivotKind::High, 20, 90.0),
            &pivot(PivotKind::Low, 10, 100.0),
        );
        assert!(matches!(inverted, Err(EngineError::InvalidPivotSequence(_))));
    }

    #[test]
    fn test_ratio_toggles() {
        let ratios = RatioSet::retracements().without(0.236).unwrap().with(1.618).unwrap();
        assert!(!ratios.contains(0.236));
        assert!(ratios.contains(0.5));
        assert!(ratios.contains(1.618));
        assert!(!ratios.contains(2.618));
        assert_eq!(ratios.len(), 5);
        assert!(RatioSet::all().with(0.7).is_err());

        let set = FibonacciLevelEngine::new(ratios)
            .recompute(
                &pivot(PivotKind::High, 20, 150.0),
                &pivot(PivotKind::Low, 10, 100.0),
            )
            .unwrap();
        // anchors are always present
        assert_eq!(set.levels.len(), 7);
        assert!(set.level(0.236).is_none());
        assert!(set.level(1.618).is_some());
        assert_eq!(set.bands.len(), 2);
    }

    #[test]
    fn test_ratio_set_validate() {
        assert!(RatioSet::all().validate().is_ok());
        assert!(RatioSet(0xFFFF).validate().is_err());
        assert_eq!(RatioSet::extensions().len(), EXTENSION_RATIOS.len());
        assert!(RatioSet::none().is_empty());
    }
}
