// THEORY:
// The `engine` module is the top-level API of the zone tracking engine. It wires
// the grid, scorer, history, accessway inference and scheduler into a single
// per-frame entry point, `on_detection_batch`, and reports what the caller
// should act on.
//
// Key architectural principles:
// 1.  **Immutable Engine, Explicit State**: `ActivityEngine` holds only the
//     configuration and the zone grid, both fixed at construction. Everything that
//     changes between frames lives in an `EngineState` that the caller owns and
//     passes in by mutable reference. Resetting is an explicit call.
// 2.  **Single Callback**: Each batch is processed to completion in one call, in
//     frame order. Nothing here blocks; the expensive work (inference, decoding,
//     encoding) happens in collaborators before and after.
// 3.  **Gated Derivations**: Trap placement and accessway inference are hypothesis
//     updates, not continuous tracking. They re-run only when their cooldown is due
//     and their data precondition holds; in between, the last result stands.
// 4.  **Report, Don't Act**: The engine decides that a deterrent sound or snapshot
//     is due, but playing and saving are left to the caller.

use crate::core_modules::accessway::{infer_accessways, AbsenceTracker, AccesswaySet};
use crate::core_modules::cooldown::{CooldownConfig, GatedAction, Scheduler};
use crate::core_modules::detection::{AnchorRule, Detection};
use crate::core_modules::history::{DetectionHistory, HistoryLimit};
use crate::core_modules::scorer::{score, RankedZone};
use crate::core_modules::zone::{Zone, ZoneGrid, ZoneId};
use std::time::{Duration, Instant};

pub const DEFAULT_ZONE_STRIDE: u32 = 100;
pub const DEFAULT_ZONE_SIZE: u32 = 200;
pub const DEFAULT_MIN_HISTORY_FOR_PLACEMENT: usize = 10;
pub const DEFAULT_ABSENCE_GAP: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_TRAP_PLACEMENTS: usize = 3;

/// Configuration for the `ActivityEngine`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Step between neighbouring zones, in pixels.
    pub zone_stride: u32,
    /// Side length of each square zone, in pixels.
    pub zone_size: u32,
    /// Which point of a detection box is tested for zone membership.
    pub anchor: AnchorRule,
    pub history_limit: HistoryLimit,
    /// Trap placement only recomputes once the history holds more detections than this.
    pub min_history_for_placement: usize,
    /// How long the stream must go without detections before the next sighting
    /// is treated as a return (and the last one before it as a departure).
    pub absence_gap: Duration,
    /// Treat the very first sighting as a return after absence.
    pub infer_on_first_sighting: bool,
    pub cooldowns: CooldownConfig,
    /// How many of the ranked placements a renderer should highlight.
    pub max_trap_placements: usize,
}

impl EngineConfig {
    /// Reference settings for a frame of the given size.
    pub fn for_frame(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            zone_stride: DEFAULT_ZONE_STRIDE,
            zone_size: DEFAULT_ZONE_SIZE,
            anchor: AnchorRule::default(),
            history_limit: HistoryLimit::default(),
            min_history_for_placement: DEFAULT_MIN_HISTORY_FOR_PLACEMENT,
            absence_gap: DEFAULT_ABSENCE_GAP,
            infer_on_first_sighting: true,
            cooldowns: CooldownConfig::default(),
            max_trap_placements: DEFAULT_MAX_TRAP_PLACEMENTS,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_frame(1280, 720)
    }
}

/// All mutable state of the engine. Owned by the caller.
#[derive(Debug, Clone)]
pub struct EngineState {
    history: DetectionHistory,
    absence: AbsenceTracker,
    accessways: AccesswaySet,
    trap_placements: Vec<RankedZone>,
    scheduler: Scheduler,
    cycle: u64,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            history: DetectionHistory::new(config.history_limit),
            absence: AbsenceTracker::new(config.absence_gap, config.infer_on_first_sighting),
            accessways: AccesswaySet::new(),
            trap_placements: Vec::new(),
            scheduler: Scheduler::new(&config.cooldowns),
            cycle: 0,
        }
    }

    /// Forgets all history, accessways and timers.
    pub fn reset(&mut self) {
        self.history.clear();
        self.absence.reset();
        self.accessways.clear();
        self.trap_placements.clear();
        self.scheduler.reset();
        self.cycle = 0;
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    pub fn accessways(&self) -> &AccesswaySet {
        &self.accessways
    }

    pub fn trap_placements(&self) -> &[RankedZone] {
        &self.trap_placements
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The most recent non-empty batch.
    pub fn last_batch(&self) -> &[Detection] {
        self.absence.last_batch()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}

/// What one call to `on_detection_batch` produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// 1-based index of the batch this report belongs to.
    pub cycle: u64,
    /// Actions whose cooldown and precondition were satisfied this cycle.
    pub fired_actions: Vec<GatedAction>,
    /// Current ranking, most active first. Replaced wholesale on each recompute.
    pub trap_placements: Vec<RankedZone>,
    /// Every accessway inferred so far, in discovery order.
    pub accessways: Vec<Zone>,
    /// Accessways first inferred this cycle.
    pub new_accessways: Vec<ZoneId>,
    pub entry: Option<RankedZone>,
    pub exit: Option<RankedZone>,
}

impl CycleReport {
    pub fn fired(&self, action: GatedAction) -> bool {
        self.fired_actions.contains(&action)
    }

    /// The leading `n` placements.
    pub fn top_placements(&self, n: usize) -> &[RankedZone] {
        &self.trap_placements[..n.min(self.trap_placements.len())]
    }
}

/// The zone tracking engine: configuration plus the fixed zone grid.
#[derive(Debug, Clone)]
pub struct ActivityEngine {
    config: EngineConfig,
    grid: ZoneGrid,
}

impl ActivityEngine {
    pub fn new(config: EngineConfig) -> Self {
        let grid = ZoneGrid::new(
            config.frame_width,
            config.frame_height,
            config.zone_stride,
            config.zone_size,
        );
        tracing::info!(
            zones = grid.len(),
            frame_width = config.frame_width,
            frame_height = config.frame_height,
            "activity engine ready"
        );
        Self { config, grid }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &ZoneGrid {
        &self.grid
    }

    pub fn zones(&self) -> &[Zone] {
        self.grid.zones()
    }

    /// A fresh state sized for this engine's configuration.
    pub fn new_state(&self) -> EngineState {
        EngineState::new(&self.config)
    }

    /// Ranks zones against an arbitrary set of detections using this engine's grid
    /// and anchor rule.
    pub fn score<'a, I>(&self, detections: I) -> Vec<RankedZone>
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        score(detections, self.grid.zones(), self.config.anchor)
    }

    /// Processes one frame's detections observed at `now`.
    pub fn on_detection_batch(
        &self,
        state: &mut EngineState,
        batch: &[Detection],
        now: Instant,
    ) -> CycleReport {
        state.cycle += 1;
        let mut report = CycleReport {
            cycle: state.cycle,
            ..CycleReport::default()
        };

        // Stage 1: Accessway hypothesis, driven by gaps in the detection stream.
        if let Some(absence) = state.absence.observe(batch, now) {
            if state.scheduler.poll(GatedAction::AccesswayEvaluation, now, true) {
                let inference = infer_accessways(
                    batch,
                    &absence.previous_batch,
                    self.grid.zones(),
                    self.config.anchor,
                    &mut state.accessways,
                );
                for id in &inference.added {
                    tracing::info!(zone = id.0, cycle = state.cycle, "new accessway inferred");
                }
                report.fired_actions.push(GatedAction::AccesswayEvaluation);
                report.entry = inference.entry;
                report.exit = inference.exit;
                report.new_accessways = inference.added;
            } else {
                tracing::debug!(
                    gap = ?absence.gap,
                    remaining = ?state.scheduler.timer(GatedAction::AccesswayEvaluation).remaining(now),
                    "absence ended while accessway evaluation cooling; skipped"
                );
            }
        }

        // Stage 2: Accumulation.
        state.history.accumulate(batch, now);

        // Stage 3: Trap placement over the full retained history.
        let enough_history = state.history.len() > self.config.min_history_for_placement;
        if state.scheduler.poll(GatedAction::TrapPlacement, now, enough_history) {
            state.trap_placements = score(state.history.iter(), self.grid.zones(), self.config.anchor);
            tracing::info!(
                placements = state.trap_placements.len(),
                history = state.history.len(),
                "trap placements recomputed"
            );
            report.fired_actions.push(GatedAction::TrapPlacement);
        }

        // Stage 4: Side effects for the caller.
        if state.scheduler.poll(GatedAction::SoundTrigger, now, !batch.is_empty()) {
            tracing::info!(detections = batch.len(), "deterrent sound due");
            report.fired_actions.push(GatedAction::SoundTrigger);
        }
        if state.scheduler.poll(GatedAction::Snapshot, now, true) {
            tracing::debug!(cycle = state.cycle, "snapshot due");
            report.fired_actions.push(GatedAction::Snapshot);
        }

        report.trap_placements = state.trap_placements.clone();
        report.accessways = state.accessways.zones().to_vec();
        tracing::trace!(cycle = state.cycle, detections = batch.len(), fired = ?report.fired_actions, "cycle complete");
        report
    }
}
