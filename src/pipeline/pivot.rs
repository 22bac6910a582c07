//! Swing pivot detection
//!
//! A bar at position `i` is a High pivot when no bar in `[i - L, i + L]` has a strictly
//! greater high, and a Low pivot symmetrically on lows. Confirmation is always `L` bars
//! late: the detector keeps a `2L + 1` bar window and only classifies its middle bar once
//! the window is full of confirmed bars.
//!
//! Ties resolve to the earliest bar: an equal extreme *before* the candidate disqualifies
//! it, an equal extreme *after* it does not.

use serde::{Deserialize, Serialize};

use super::helpers::RingBuffer;
use crate::{Bar, EngineError, Period, Pivot, PivotKind, PriceBar, PriceBarExt, Result};

/// Streaming swing-pivot detector over a fixed `2L + 1` bar window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotDetector {
    length: usize,
    window: RingBuffer<Bar>,
    last_index: Option<usize>,
    last_kind: Option<PivotKind>,
}

impl PivotDetector {
    pub fn new(length: Period) -> Self {
        let length = length.get();
        Self {
            length,
            window: RingBuffer::with_capacity(2 * length + 1),
            last_index: None,
            last_kind: None,
        }
    }

    /// Bars on each side of a candidate (`L`).
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Bars required before the first pivot can be confirmed (`2L + 1`).
    #[inline]
    pub fn window_size(&self) -> usize {
        2 * self.length + 1
    }

    /// Index of the last confirmed bar admitted.
    #[inline]
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// Confirmed bars currently buffered.
    pub fn buffered(&self) -> impl Iterator<Item = &Bar> + '_ {
        self.window.iter()
    }

    /// `Err(InsufficientHistory)` until the window holds `2L + 1` confirmed bars.
    pub fn ensure_history(&self) -> Result<()> {
        if self.window.is_full() {
            Ok(())
        } else {
            Err(EngineError::InsufficientHistory {
                need: self.window_size(),
                got: self.window.len(),
            })
        }
    }

    /// Index the next bar must carry.
    #[inline]
    pub fn expected_index(&self) -> Option<usize> {
        self.last_index.map(|i| i + 1)
    }

    /// Reject a bar that does not continue the feed.
    ///
    /// Both confirmed and unconfirmed bars must carry `last_index + 1`; the unconfirmed
    /// bar is the still-forming successor and may be re-delivered until it confirms.
    pub fn check_order<T: PriceBar + ?Sized>(&self, bar: &T) -> Result<()> {
        match self.expected_index() {
            Some(expected) if bar.index() != expected => Err(EngineError::OutOfOrder {
                expected,
                got: bar.index(),
            }),
            _ => Ok(()),
        }
    }

    /// Admit a bar; returns the pivot confirmed by it, if any.
    ///
    /// Unconfirmed bars are checked for ordering and otherwise ignored. An out-of-order bar
    /// is the only error and leaves the detector untouched.
    pub fn on_bar<T: PriceBar + ?Sized>(&mut self, bar: &T) -> Result<Option<Pivot>> {
        self.check_order(bar)?;
        if !bar.is_confirmed() {
            return Ok(None);
        }

        self.window.push(bar.to_bar());
        self.last_index = Some(bar.index());

        if !self.window.is_full() {
            return Ok(None);
        }

        let pivot = self.classify();
        if let Some(p) = pivot {
            self.last_kind = Some(p.kind);
        }
        Ok(pivot)
    }

    /// Forget all buffered bars and ordering state.
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_index = None;
        self.last_kind = None;
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.length > 0
            && self.window.capacity() == self.window_size()
            && self.window.is_consistent()
    }

    fn classify(&self) -> Option<Pivot> {
        let l = self.length;
        let candidate = *self.window.get(l)?;
        let confirmed_at = self.window.back()?.index;

        let is_high = self.window.iter().enumerate().all(|(pos, b)| match pos {
            p if p < l => b.high < candidate.high,
            p if p > l => b.high <= candidate.high,
            _ => true,
        });
        let is_low = self.window.iter().enumerate().all(|(pos, b)| match pos {
            p if p < l => b.low > candidate.low,
            p if p > l => b.low >= candidate.low,
            _ => true,
        });

        // An outside bar can be both; keep the swing sequence alternating.
        let kind = match (is_high, is_low) {
            (true, true) => match self.last_kind {
                Some(PivotKind::High) => PivotKind::Low,
                _ => PivotKind::High,
            },
            (true, false) => PivotKind::High,
            (false, true) => PivotKind::Low,
            (false, false) => return None,
        };

        let price = match kind {
            PivotKind::High => candidate.high,
            PivotKind::Low => candidate.low,
        };

        tracing::debug!(
            bar = candidate.index,
            confirmed_at,
            ?kind,
            price,
            "pivot confirmed"
        );

        Some(Pivot {
            bar_index: candidate.index,
            price,
            kind,
            confirmed_at_index: confirmed_at,
        })
    }
}
