//! Boolean alert signals
//!
//! Signals are recomputed on every bar against the Active scenario's levels, whether or not
//! the bar is the newest one in the feed, so replays and backtests see every transition.
//! The previous close used for cross detection advances on confirmed bars only.

use serde::{Deserialize, Serialize};

use super::fibonacci::{Zone, DEFAULT_EXTENSION_TARGET};
use super::helpers::crossed;
use super::scenario::Scenario;
use crate::{Direction, PriceBar};

/// Named alert condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertSignal {
    /// Bar range touched the 0.618-0.65 band
    GoldenPocketTouch,
    /// Bar range touched the 0.618-0.786 band
    GoldenZoneTouch,
    /// Close crossed the 0% level (impulse end)
    CrossedZeroLevel,
    /// Close crossed the 100% level (impulse origin)
    CrossedFullRetracement,
    /// Price reached the configured extension target
    ExtensionTargetReached,
}

impl AlertSignal {
    pub const ALL: [AlertSignal; 5] = [
        AlertSignal::GoldenPocketTouch,
        AlertSignal::GoldenZoneTouch,
        AlertSignal::CrossedZeroLevel,
        AlertSignal::CrossedFullRetracement,
        AlertSignal::ExtensionTargetReached,
    ];

    /// Stable identifier for alert wiring
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSignal::GoldenPocketTouch => "GOLDEN_POCKET_TOUCH",
            AlertSignal::GoldenZoneTouch => "GOLDEN_ZONE_TOUCH",
            AlertSignal::CrossedZeroLevel => "CROSSED_ZERO_LEVEL",
            AlertSignal::CrossedFullRetracement => "CROSSED_FULL_RETRACEMENT",
            AlertSignal::ExtensionTargetReached => "EXTENSION_TARGET_REACHED",
        }
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of raised signals (bitset, Copy, no allocations)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertSet(u8);

impl AlertSet {
    #[inline]
    pub fn insert(&mut self, signal: AlertSignal) {
        self.0 |= signal.bit();
    }

    #[inline]
    pub fn contains(self, signal: AlertSignal) -> bool {
        self.0 & signal.bit() != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raised signals in declaration order
    pub fn iter(self) -> impl Iterator<Item = AlertSignal> {
        AlertSignal::ALL.into_iter().filter(move |s| self.contains(*s))
    }

    /// Every signal paired with its current value
    pub fn named(self) -> [(&'static str, bool); 5] {
        AlertSignal::ALL.map(|s| (s.as_str(), self.contains(s)))
    }
}

impl FromIterator<AlertSignal> for AlertSet {
    fn from_iter<I: IntoIterator<Item = AlertSignal>>(iter: I) -> Self {
        let mut set = AlertSet::default();
        iter.into_iter().for_each(|s| set.insert(s));
        set
    }
}

/// Per-bar signal evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStateEmitter {
    extension_target: f64,
    prev_close: Option<f64>,
}

impl Default for AlertStateEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION_TARGET)
    }
}

impl AlertStateEmitter {
    pub fn new(extension_target: f64) -> Self {
        Self {
            extension_target,
            prev_close: None,
        }
    }

    #[inline]
    pub fn extension_target(&self) -> f64 {
        self.extension_target
    }

    /// Last confirmed close seen
    pub fn prev_close(&self) -> Option<f64> {
        self.prev_close
    }

    /// Evaluate all signals for `bar` against the Active scenario.
    pub fn on_bar<T: PriceBar + ?Sized>(&mut self, bar: &T, active: Option<&Scenario>) -> AlertSet {
        let signals = self.evaluate(bar, active);
        if bar.is_confirmed() {
            self.prev_close = Some(bar.close());
        }
        signals
    }

    fn evaluate<T: PriceBar + ?Sized>(&self, bar: &T, active: Option<&Scenario>) -> AlertSet {
        let mut signals = AlertSet::default();
        let Some(scenario) = active else {
            return signals;
        };
        let levels = &scenario.levels;
        let (high, low, close) = (bar.high(), bar.low(), bar.close());

        if levels
            .band(Zone::GoldenPocket)
            .is_some_and(|b| b.touched_by(low, high))
        {
            signals.insert(AlertSignal::GoldenPocketTouch);
        }
        if levels
            .band(Zone::GoldenZone)
            .is_some_and(|b| b.touched_by(low, high))
        {
            signals.insert(AlertSignal::GoldenZoneTouch);
        }

        if let Some(prev) = self.prev_close {
            if crossed(prev, close, levels.zero_price()) {
                signals.insert(AlertSignal::CrossedZeroLevel);
            }
            if crossed(prev, close, levels.full_price()) {
                signals.insert(AlertSignal::CrossedFullRetracement);
            }
        }

        let target = levels.price_at(self.extension_target);
        let reached = match levels.direction {
            Direction::Up => high >= target,
            Direction::Down => low <= target,
        };
        if reached {
            signals.insert(AlertSignal::ExtensionTargetReached);
        }

        signals
    }
}
