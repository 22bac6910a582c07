//! Simplified Elliott-Wave counting
//!
//! The tracker follows the alternating pivot sequence and numbers each pivot that extends
//! it: 1 through 5, then A, B, C, then back to 1. The count restarts at 1 with the opposite
//! direction when a pivot breaks the previous pivot of the same kind against the trend
//! (a lower low or lower high in an up count, a higher high or higher low in a down count).
//!
//! This is a counting heuristic only. Wave legality (wave-2 retracement depth, wave-3
//! length, wave-4 overlap) and corrective-pattern shapes are not checked.

use serde::{Deserialize, Serialize};

use super::helpers::RingBuffer;
use crate::{Direction, Pivot, PivotKind};

/// Default number of wave labels kept before the oldest is retired
pub const DEFAULT_LABEL_CAP: usize = 20;

/// Position in the count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveNumber {
    One,
    Two,
    Three,
    Four,
    Five,
    A,
    B,
    C,
}

impl WaveNumber {
    /// Successor in the 1-5, A-C cycle
    pub fn next(self) -> Self {
        match self {
            WaveNumber::One => WaveNumber::Two,
            WaveNumber::Two => WaveNumber::Three,
            WaveNumber::Three => WaveNumber::Four,
            WaveNumber::Four => WaveNumber::Five,
            WaveNumber::Five => WaveNumber::A,
            WaveNumber::A => WaveNumber::B,
            WaveNumber::B => WaveNumber::C,
            WaveNumber::C => WaveNumber::One,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WaveNumber::One => "1",
            WaveNumber::Two => "2",
            WaveNumber::Three => "3",
            WaveNumber::Four => "4",
            WaveNumber::Five => "5",
            WaveNumber::A => "A",
            WaveNumber::B => "B",
            WaveNumber::C => "C",
        }
    }

    /// Impulse waves are numbered 1..=5
    pub fn impulse_number(self) -> Option<u8> {
        match self {
            WaveNumber::One => Some(1),
            WaveNumber::Two => Some(2),
            WaveNumber::Three => Some(3),
            WaveNumber::Four => Some(4),
            WaveNumber::Five => Some(5),
            _ => None,
        }
    }

    #[inline]
    pub fn is_corrective(self) -> bool {
        self.impulse_number().is_none()
    }
}

/// A wave label placed on a pivot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveLabel {
    pub bar_index: usize,
    pub price: f64,
    pub kind: PivotKind,
    pub wave: WaveNumber,
}

/// Current count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveState {
    pub current: WaveNumber,
    pub direction: Direction,
    /// Pivots of the current count, oldest first. Cleared on reset and on cycle wrap,
    /// so it never holds more than one full 1-5, A-C cycle.
    pub anchor_pivots: Vec<Pivot>,
    /// Most recent labels across counts, bounded FIFO.
    pub labels: RingBuffer<WaveLabel>,
}

impl WaveState {
    fn start(pivot: &Pivot, label_cap: usize) -> Self {
        // A low starts an upward count, a high a downward one.
        let direction = match pivot.kind {
            PivotKind::Low => Direction::Up,
            PivotKind::High => Direction::Down,
        };
        let mut state = Self {
            current: WaveNumber::One,
            direction,
            anchor_pivots: Vec::with_capacity(8),
            labels: RingBuffer::with_capacity(label_cap),
        };
        state.begin_count(pivot, direction);
        state
    }

    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Current wave number as a 1-based ordinal within the cycle (1..=8)
    pub fn ordinal(&self) -> usize {
        let mut wave = WaveNumber::One;
        let mut n = 1;
        while wave != self.current {
            wave = wave.next();
            n += 1;
        }
        n
    }

    fn begin_count(&mut self, pivot: &Pivot, direction: Direction) {
        self.direction = direction;
        self.current = WaveNumber::One;
        self.anchor_pivots.clear();
        self.anchor_pivots.push(*pivot);
        self.push_label(pivot);
    }

    fn push_label(&mut self, pivot: &Pivot) {
        self.labels.push(WaveLabel {
            bar_index: pivot.bar_index,
            price: pivot.price,
            kind: pivot.kind,
            wave: self.current,
        });
    }
}

/// Streaming wave counter fed with confirmed pivots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElliottWaveTracker {
    label_cap: usize,
    state: Option<WaveState>,
}

impl Default for ElliottWaveTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_CAP)
    }
}

impl ElliottWaveTracker {
    pub fn new(label_cap: usize) -> Self {
        Self {
            label_cap: label_cap.max(1),
            state: None,
        }
    }

    pub fn label_cap(&self) -> usize {
        self.label_cap
    }

    /// Current count, `None` before the first pivot
    pub fn state(&self) -> Option<&WaveState> {
        self.state.as_ref()
    }

    /// Advance the count with a newly confirmed pivot.
    pub fn on_pivot(&mut self, pivot: &Pivot) -> &WaveState {
        let state = match self.state.take() {
            Some(mut state) => {
                Self::advance(&mut state, pivot);
                state
            }
            None => WaveState::start(pivot, self.label_cap),
        };
        self.state.insert(state)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.state.as_ref().map_or(true, |s| {
            !s.anchor_pivots.is_empty()
                && s.labels.capacity() == self.label_cap
                && s.labels.is_consistent()
        })
    }

    fn advance(state: &mut WaveState, pivot: &Pivot) {
        let Some(last) = state.anchor_pivots.last().copied() else {
            state.begin_count(pivot, state.direction);
            return;
        };

        if last.kind == pivot.kind {
            // Same side twice: the swing extended. Move the last point if this one is
            // more extreme, otherwise the pivot is noise.
            let more_extreme = match pivot.kind {
                PivotKind::High => pivot.price > last.price,
                PivotKind::Low => pivot.price < last.price,
            };
            if more_extreme {
                if let Some(slot) = state.anchor_pivots.last_mut() {
                    *slot = *pivot;
                }
                if let Some(label) = state.labels.back_mut() {
                    if label.bar_index == last.bar_index {
                        label.bar_index = pivot.bar_index;
                        label.price = pivot.price;
                    }
                }
                tracing::debug!(bar = pivot.bar_index, wave = state.current.as_str(), "wave point extended");
            }
            return;
        }

        let reversed = state
            .anchor_pivots
            .iter()
            .rev()
            .find(|p| p.kind == pivot.kind)
            .is_some_and(|prev| match state.direction {
                Direction::Up => pivot.price < prev.price,
                Direction::Down => pivot.price > prev.price,
            });

        if reversed {
            let direction = state.direction.opposite();
            tracing::debug!(bar = pivot.bar_index, ?direction, "wave count reset on reversal");
            state.begin_count(pivot, direction);
            return;
        }

        let next = state.current.next();
        if next == WaveNumber::One {
            state.begin_count(pivot, state.direction);
        } else {
            state.current = next;
            state.anchor_pivots.push(*pivot);
            state.push_label(pivot);
        }
        tracing::debug!(bar = pivot.bar_index, wave = state.current.as_str(), "wave advanced");
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
            confirmed_at_index: bar_index + 2,
        }
    }

    fn low(bar_index: usize, price: f64) -> Pivot {
        pivot(PivotKind::Low, bar_index, price)
    }

    fn high(bar_index: usize, price: f64) -> Pivot {
        pivot(PivotKind::High, bar_index, price)
    }

    #[test]
    fn test_ascending_sequence_then_reversal() {
        let mut tracker = ElliottWaveTracker::default();
        let waves: Vec<_> = [low(10, 100.0), high(20, 150.0), low(25, 120.0), high(30, 170.0)]
            .iter()
            .map(|p| tracker.on_pivot(p).current)
            .collect();
        assert_eq!(
            waves,
            vec![WaveNumber::One, WaveNumber::Two, WaveNumber::Three, WaveNumber::Four]
        );
        assert_eq!(tracker.state().unwrap().direction, Direction::Up);

        let state = tracker.on_pivot(&low(35, 110.0));
        assert_eq!(state.current, WaveNumber::One);
        assert_eq!(state.direction, Direction::Down);
        assert_eq!(state.anchor_pivots.len(), 1);
        assert_eq!(state.label_count(), 5);
    }

    #[test]
    fn test_on_pivot_returns_stored_state() {
        let mut tracker = ElliottWaveTracker::new(4);
        let first = tracker.on_pivot(&low(10, 100.0)).clone();
        assert_eq!(Some(&first), tracker.state());
        assert_eq!(first.labels.capacity(), 4);

        let second = tracker.on_pivot(&high(20, 150.0)).clone();
        assert_eq!(Some(&second), tracker.state());
        assert_eq!(second.current, WaveNumber::Two);
        assert!(tracker.is_consistent());
    }

    #[test]
    fn test_lower_high_reverses_up_count() {
        let mut tracker = ElliottWaveTracker::default();
        tracker.on_pivot(&low(0, 100.0));
        tracker.on_pivot(&high(5, 150.0));
        tracker.on_pivot(&low(8, 120.0));
        let state = tracker.on_pivot(&high(12, 140.0));
        assert_eq!(state.current, WaveNumber::One);
        assert_eq!(state.direction, Direction::Down);
    }

    #[test]
    fn test_full_cycle_wraps_to_one() {
        let mut tracker = ElliottWaveTracker::default();
        let mut price = 100.0;
        let mut last = WaveNumber::One;
        for i in 0..9 {
            let p = if i % 2 == 0 {
                low(i * 5, price)
            } else {
                high(i * 5, price + 50.0)
            };
            if i % 2 == 1 {
                price += 10.0;
            }
            last = tracker.on_pivot(&p).current;
            if i == 5 {
                assert_eq!(last, WaveNumber::A);
                assert!(last.is_corrective());
            }
        }
        assert_eq!(last, WaveNumber::One);
        let state = tracker.state().unwrap();
        assert_eq!(state.direction, Direction::Up);
        assert_eq!(state.anchor_pivots.len(), 1);
        assert_eq!(state.ordinal(), 1);
    }

    #[test]
    fn test_same_kind_more_extreme_moves_point() {
        let mut tracker = ElliottWaveTracker::default();
        tracker.on_pivot(&low(0, 100.0));
        tracker.on_pivot(&high(5, 150.0));
        let state = tracker.on_pivot(&high(9, 160.0));
        assert_eq!(state.current, WaveNumber::Two);
        assert_eq!(state.anchor_pivots.last().unwrap().bar_index, 9);
        let label = state.labels.back().unwrap();
        assert_eq!(label.bar_index, 9);
        assert_eq!(label.price, 160.0);
        assert_eq!(state.label_count(), 2);

        // less extreme high is ignored
        let state = tracker.on_pivot(&high(12, 155.0));
        assert_eq!(state.anchor_pivots.last().unwrap().bar_index, 9);
        assert_eq!(state.label_count(), 2);
    }

    #[test]
    fn test_label_cap_retires_oldest() {
        let mut tracker = ElliottWaveTracker::new(20);
        let mut price = 100.0;
        for i in 0..30 {
            let p = if i % 2 == 0 {
                low(i, price)
            } else {
                high(i, price + 20.0)
            };
            price += 5.0;
            tracker.on_pivot(&p);
        }
        let state = tracker.state().unwrap();
        assert_eq!(state.label_count(), 20);
        assert_eq!(state.labels.get(0).unwrap().bar_index, 10);
        assert_eq!(state.labels.back().unwrap().bar_index, 29);
    }

    #[test]
    fn test_high_first_starts_down_count() {
        let mut tracker = ElliottWaveTracker::default();
        let state = tracker.on_pivot(&high(3, 150.0));
        assert_eq!(state.direction, Direction::Down);
        assert_eq!(state.current.as_str(), "1");
        assert!(tracker.is_consistent());
    }
}
