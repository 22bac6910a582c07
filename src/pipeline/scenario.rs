//! Scenario lifecycle and drawable-handle ownership
//!
//! A scenario is one anchor pair together with its level set and a snapshot of the wave
//! count. The manager is the only component that creates or releases drawable handles, and
//! it keeps two hard invariants:
//!
//! - at most one scenario is Active at any time;
//! - an invalidated scenario releases every handle it owns, synchronously, before any other
//!   scenario may create handles.
//!
//! ```text
//! Inactive --(new pair, range > min)----> Active
//! Active   --(close beyond 0%/100%)-----> Invalidated --(handles released)--> Inactive
//! Active   --(new pair)-----------------> Invalidated --(handles released)--> Active (new)
//!                                                                       or Inactive (range <= min)
//! ```

use serde::{Deserialize, Serialize};

use super::fibonacci::{LevelKind, LevelSet, Zone};
use super::wave::{WaveNumber, WaveState};
use crate::{Direction, EngineError, MinRange, Pivot};

// ============================================================
// RENDERING PROTOCOL
// ============================================================

/// Kind of rendered primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Line,
    Label,
    Box,
}

/// Style bucket handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleKey {
    Bullish,
    Bearish,
    Neutral,
}

impl From<Option<Direction>> for StyleKey {
    fn from(direction: Option<Direction>) -> Self {
        match direction {
            Some(Direction::Up) => StyleKey::Bullish,
            Some(Direction::Down) => StyleKey::Bearish,
            None => StyleKey::Neutral,
        }
    }
}

/// Opaque reference to a rendered artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(pub u64);

/// Scenario identifier, increasing in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioId(pub u64);

/// Chart coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub bar_index: usize,
    pub price: f64,
}

/// What an artifact depicts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArtifactTag {
    Level { ratio: f64, kind: LevelKind },
    Zone(Zone),
    Wave(WaveNumber),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawOp {
    Create,
    Update,
    Delete,
}

/// Instruction for the rendering collaborator.
///
/// Lines run from `anchor` to `extent` at one price; boxes span `anchor` (left, upper) to
/// `extent` (right, lower); labels have no extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawEvent {
    pub op: DrawOp,
    pub scenario: ScenarioId,
    pub handle: HandleId,
    pub kind: ArtifactKind,
    pub anchor: Anchor,
    pub extent: Option<Anchor>,
    pub style: StyleKey,
    pub tag: ArtifactTag,
}

/// Maximum concurrent artifacts per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLimits {
    pub max_lines: usize,
    pub max_labels: usize,
    pub max_boxes: usize,
}

impl Default for ObjectLimits {
    fn default() -> Self {
        Self {
            max_lines: 50,
            max_labels: 50,
            max_boxes: 50,
        }
    }
}

impl ObjectLimits {
    pub fn limit(&self, kind: ArtifactKind) -> usize {
        match kind {
            ArtifactKind::Line => self.max_lines,
            ArtifactKind::Label => self.max_labels,
            ArtifactKind::Box => self.max_boxes,
        }
    }
}

/// A live, owned artifact
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub handle: HandleId,
    pub kind: ArtifactKind,
    pub anchor: Anchor,
    pub extent: Option<Anchor>,
    pub style: StyleKey,
    pub tag: ArtifactTag,
}

// ============================================================
// SCENARIO
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStatus {
    Active,
    Invalidated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub anchor_high: Pivot,
    pub anchor_low: Pivot,
    pub direction: Direction,
    pub levels: LevelSet,
    pub wave_state: WaveState,
    pub status: ScenarioStatus,
    /// Bar whose processing activated the scenario
    pub activated_at: usize,
}

impl Scenario {
    /// First bar of the anchor pair
    #[inline]
    pub fn start_index(&self) -> usize {
        self.anchor_high.bar_index.min(self.anchor_low.bar_index)
    }

    #[inline]
    pub fn style(&self) -> StyleKey {
        Some(self.direction).into()
    }
}

/// Lifecycle state of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Inactive,
    Active,
    /// Transient: an invalidated scenario is releasing its handles
    Invalidated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// A confirmed close went beyond the 0% or 100% anchor price
    ClosedBeyondAnchor { close: f64, ratio: f64 },
    /// A newer valid anchor pair replaced this one
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    Activated {
        id: ScenarioId,
        direction: Direction,
        at_index: usize,
    },
    Invalidated {
        id: ScenarioId,
        reason: InvalidationReason,
        at_index: usize,
    },
    /// All handles of an invalidated scenario were released
    Removed { id: ScenarioId, released: usize },
}

/// Everything a single reconcile step produced, in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleOutput {
    pub transitions: Vec<Transition>,
    pub events: Vec<DrawEvent>,
    pub notices: Vec<EngineError>,
}

// ============================================================
// MANAGER
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioLifecycleManager {
    limits: ObjectLimits,
    min_range: MinRange,
    state: LifecycleState,
    active: Option<Scenario>,
    artifacts: Vec<Artifact>,
    next_scenario: u64,
    next_handle: u64,
}

/// Artifact planned for creation, before limits are applied
struct Planned {
    kind: ArtifactKind,
    anchor: Anchor,
    extent: Option<Anchor>,
    tag: ArtifactTag,
}

impl ScenarioLifecycleManager {
    pub fn new(limits: ObjectLimits, min_range: MinRange) -> Self {
        Self {
            limits,
            min_range,
            state: LifecycleState::Inactive,
            active: None,
            artifacts: Vec::new(),
            next_scenario: 1,
            next_handle: 1,
        }
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[inline]
    pub fn active(&self) -> Option<&Scenario> {
        self.active.as_ref()
    }

    #[inline]
    pub fn limits(&self) -> ObjectLimits {
        self.limits
    }

    #[inline]
    pub fn min_range(&self) -> MinRange {
        self.min_range
    }

    /// Handles currently owned (all belong to the Active scenario).
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn count(&self, kind: ArtifactKind) -> usize {
        self.artifacts.iter().filter(|a| a.kind == kind).count()
    }

    /// Handles still owned by scenario `id`; zero for anything but the Active scenario.
    pub fn outstanding_handles(&self, id: ScenarioId) -> usize {
        match &self.active {
            Some(s) if s.id == id => self.artifacts.len(),
            _ => 0,
        }
    }

    /// Offer a freshly derived anchor pair.
    ///
    /// The current scenario is always superseded and torn down first. The new one activates
    /// only if its range exceeds the minimum and `close` lies within its anchor range.
    #[allow(clippy::too_many_arguments)]
    pub fn on_anchor_pair(
        &mut self,
        anchor_high: Pivot,
        anchor_low: Pivot,
        levels: LevelSet,
        wave_state: &WaveState,
        at_index: usize,
        close: f64,
        out: &mut LifecycleOutput,
    ) {
        self.invalidate(InvalidationReason::Superseded, at_index, out);

        let range = levels.range();
        if range <= self.min_range.get() {
            tracing::warn!(
                range,
                min_range = self.min_range.get(),
                at_index,
                "anchor pair below minimum range, not activating"
            );
            out.notices.push(EngineError::RangeBelowMinimum {
                range,
                min_range: self.min_range.get(),
            });
            return;
        }

        if !levels.within_anchors(close) {
            tracing::debug!(
                close,
                at_index,
                "anchor pair already broken at confirmation, not activating"
            );
            return;
        }

        let id = ScenarioId(self.next_scenario);
        self.next_scenario += 1;

        let scenario = Scenario {
            id,
            anchor_high,
            anchor_low,
            direction: levels.direction,
            levels,
            wave_state: wave_state.clone(),
            status: ScenarioStatus::Active,
            activated_at: at_index,
        };

        tracing::info!(
            scenario = id.0,
            direction = ?scenario.direction,
            high = scenario.anchor_high.price,
            low = scenario.anchor_low.price,
            at_index,
            "scenario activated"
        );

        let planned = Self::plan(&scenario, at_index);
        self.state = LifecycleState::Active;
        out.transitions.push(Transition::Activated {
            id,
            direction: scenario.direction,
            at_index,
        });
        let style = scenario.style();
        self.active = Some(scenario);
        self.create_all(id, style, planned, out);
    }

    /// Check a confirmed close against the Active scenario's anchor prices.
    pub fn on_confirmed_close(&mut self, index: usize, close: f64, out: &mut LifecycleOutput) {
        let Some(scenario) = &self.active else {
            return;
        };
        let levels = &scenario.levels;
        let breach = if close > levels.high {
            Some(levels.high)
        } else if close < levels.low {
            Some(levels.low)
        } else {
            None
        };
        if let Some(price) = breach {
            let ratio = if price == levels.zero_price() { 0.0 } else { 1.0 };
            self.invalidate(
                InvalidationReason::ClosedBeyondAnchor { close, ratio },
                index,
                out,
            );
        }
    }

    /// Move the right edge of the Active scenario's lines and boxes to `index`.
    pub fn extend_right(&mut self, index: usize, out: &mut LifecycleOutput) {
        let Some(scenario) = &self.active else {
            return;
        };
        let id = scenario.id;
        for artifact in self.artifacts.iter_mut() {
            let Some(extent) = artifact.extent.as_mut() else {
                continue;
            };
            if extent.bar_index >= index {
                continue;
            }
            extent.bar_index = index;
            out.events.push(Self::event(DrawOp::Update, id, artifact));
        }
    }

    /// Tear down the Active scenario, if any.
    pub fn invalidate(
        &mut self,
        reason: InvalidationReason,
        at_index: usize,
        out: &mut LifecycleOutput,
    ) {
        let Some(mut scenario) = self.active.take() else {
            return;
        };
        scenario.status = ScenarioStatus::Invalidated;
        self.state = LifecycleState::Invalidated;
        out.transitions.push(Transition::Invalidated {
            id: scenario.id,
            reason,
            at_index,
        });

        let released = self.artifacts.len();
        while let Some(artifact) = self.artifacts.pop() {
            out.events.push(Self::event(DrawOp::Delete, scenario.id, &artifact));
        }
        out.transitions.push(Transition::Removed {
            id: scenario.id,
            released,
        });
        self.state = LifecycleState::Inactive;

        tracing::info!(
            scenario = scenario.id.0,
            ?reason,
            released,
            at_index,
            "scenario invalidated"
        );
    }

    pub(crate) fn is_consistent(&self) -> bool {
        let state_matches = match (&self.active, self.state) {
            (Some(s), LifecycleState::Active) => s.status == ScenarioStatus::Active,
            (None, LifecycleState::Inactive) => true,
            _ => false,
        };
        let within_limits = [ArtifactKind::Line, ArtifactKind::Label, ArtifactKind::Box]
            .into_iter()
            .all(|k| self.count(k) <= self.limits.limit(k));
        state_matches
            && within_limits
            && (self.active.is_some() || self.artifacts.is_empty())
            && self.artifacts.iter().all(|a| a.handle.0 < self.next_handle)
    }

    /// Artifacts for a scenario in priority order within each kind.
    fn plan(scenario: &Scenario, at_index: usize) -> Vec<Planned> {
        let start = scenario.start_index();
        let mut planned = Vec::new();

        // anchors, then retracements by ratio, then extensions by ratio (deepest last)
        let mut levels: Vec<_> = scenario.levels.levels.iter().collect();
        levels.sort_by(|a, b| {
            let rank = |k: LevelKind| match k {
                LevelKind::Anchor => 0,
                LevelKind::Retracement => 1,
                LevelKind::Extension => 2,
            };
            rank(a.kind)
                .cmp(&rank(b.kind))
                .then(a.ratio.total_cmp(&b.ratio))
        });
        planned.extend(levels.into_iter().map(|level| Planned {
            kind: ArtifactKind::Line,
            anchor: Anchor {
                bar_index: start,
                price: level.price,
            },
            extent: Some(Anchor {
                bar_index: at_index,
                price: level.price,
            }),
            tag: ArtifactTag::Level {
                ratio: level.ratio,
                kind: level.kind,
            },
        }));

        for zone in [Zone::GoldenPocket, Zone::GoldenZone] {
            if let Some(band) = scenario.levels.band(zone) {
                planned.push(Planned {
                    kind: ArtifactKind::Box,
                    anchor: Anchor {
                        bar_index: start,
                        price: band.upper,
                    },
                    extent: Some(Anchor {
                        bar_index: at_index,
                        price: band.lower,
                    }),
                    tag: ArtifactTag::Zone(zone),
                });
            }
        }

        // newest labels first; the oldest are the first to go
        planned.extend(scenario.wave_state.labels.iter().rev().map(|label| Planned {
            kind: ArtifactKind::Label,
            anchor: Anchor {
                bar_index: label.bar_index,
                price: label.price,
            },
            extent: None,
            tag: ArtifactTag::Wave(label.wave),
        }));

        planned
    }

    fn create_all(
        &mut self,
        id: ScenarioId,
        style: StyleKey,
        planned: Vec<Planned>,
        out: &mut LifecycleOutput,
    ) {
        let mut dropped = [
            (ArtifactKind::Line, 0usize),
            (ArtifactKind::Label, 0),
            (ArtifactKind::Box, 0),
        ];

        for item in planned {
            let limit = self.limits.limit(item.kind);
            if self.count(item.kind) >= limit {
                if let Some((_, n)) = dropped.iter_mut().find(|(k, _)| *k == item.kind) {
                    *n += 1;
                }
                continue;
            }
            let artifact = Artifact {
                handle: HandleId(self.next_handle),
                kind: item.kind,
                anchor: item.anchor,
                extent: item.extent,
                style,
                tag: item.tag,
            };
            self.next_handle += 1;
            out.events.push(Self::event(DrawOp::Create, id, &artifact));
            self.artifacts.push(artifact);
        }

        for (kind, n) in dropped {
            if n == 0 {
                continue;
            }
            let limit = self.limits.limit(kind);
            tracing::warn!(
                scenario = id.0,
                ?kind,
                limit,
                dropped = n,
                "object limit reached, dropping lowest-priority artifacts"
            );
            out.notices.push(EngineError::ObjectLimitExceeded { kind, limit });
        }
    }

    fn event(op: DrawOp, scenario: ScenarioId, artifact: &Artifact) -> DrawEvent {
        DrawEvent {
            op,
            scenario,
            handle: artifact.handle,
            kind: artifact.kind,
            anchor: artifact.anchor,
            extent: artifact.extent,
            style: artifact.style,
            tag: artifact.tag,
        }
    }
}
