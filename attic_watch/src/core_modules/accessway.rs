// THEORY:
// The `accessway` module forms hypotheses about where animals get into and out
// of the space. It has no notion of identity or tracks; instead it leans on a
// simple temporal heuristic built from aggregate sightings:
//
// 1.  **Entry**: The first batch of detections after a period with none marks
//     where activity reappeared. Its top-scoring zone is a candidate entry.
// 2.  **Exit**: The last non-empty batch before that period marks where activity
//     was last seen. Its top-scoring zone is a candidate exit.
// 3.  **Monotonic Memory**: Candidates accumulate into an `AccesswaySet` that
//     only grows and is deduplicated by zone identity.
//
// The `AbsenceTracker` decides when a period of absence has ended, using the
// timestamps of non-empty batches. Empty batches never replace the remembered
// last sighting, so a run of empty frames of any length is a single gap.

use crate::core_modules::detection::{AnchorRule, Detection};
use crate::core_modules::scorer::{top_zone, RankedZone};
use crate::core_modules::zone::{Zone, ZoneId};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A deduplicated, insertion-ordered set of zones believed to be entry or exit points.
#[derive(Debug, Clone, Default)]
pub struct AccesswaySet {
    zones: Vec<Zone>,
    members: HashSet<ZoneId>,
}

impl AccesswaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zone. Returns `false` if a zone with the same identity was already present.
    pub fn insert(&mut self, zone: Zone) -> bool {
        if !self.members.insert(zone.id) {
            return false;
        }
        self.zones.push(zone);
        true
    }

    pub fn contains(&self, id: ZoneId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// Zones in the order they were first inferred.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn clear(&mut self) {
        self.zones.clear();
        self.members.clear();
    }
}

/// The outcome of one accessway inference pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccesswayInference {
    pub entry: Option<RankedZone>,
    pub exit: Option<RankedZone>,
    /// Zones that were new to the set on this pass.
    pub added: Vec<ZoneId>,
}

/// Scores the batch that ended an absence (entry side) and the batch that preceded
/// it (exit side), adding each side's top zone to `set`.
///
/// A side whose batch touches no zone contributes nothing.
pub fn infer_accessways(
    recent_batch: &[Detection],
    last_batch: &[Detection],
    zones: &[Zone],
    anchor: AnchorRule,
    set: &mut AccesswaySet,
) -> AccesswayInference {
    let entry = top_zone(recent_batch, zones, anchor);
    let exit = top_zone(last_batch, zones, anchor);

    let mut added = Vec::new();
    for ranked in entry.iter().chain(exit.iter()) {
        if set.insert(ranked.zone) {
            added.push(ranked.zone.id);
        }
    }

    if entry.is_none() && !recent_batch.is_empty() {
        tracing::debug!(detections = recent_batch.len(), "entry batch touched no zone");
    }
    if exit.is_none() && !last_batch.is_empty() {
        tracing::debug!(detections = last_batch.len(), "exit batch touched no zone");
    }

    AccesswayInference { entry, exit, added }
}

/// Reported when a non-empty batch arrives after a long enough absence.
#[derive(Debug, Clone, PartialEq)]
pub struct AbsenceEnded {
    /// Time since the previous non-empty batch; `None` for the first sighting ever.
    pub gap: Option<Duration>,
    /// The last non-empty batch seen before the absence (empty for the first sighting).
    pub previous_batch: Vec<Detection>,
}

/// Watches the detection stream for gaps of at least `absence_gap`.
#[derive(Debug, Clone)]
pub struct AbsenceTracker {
    absence_gap: Duration,
    infer_on_first_sighting: bool,
    last_detection_at: Option<Instant>,
    last_batch: Vec<Detection>,
}

impl AbsenceTracker {
    pub fn new(absence_gap: Duration, infer_on_first_sighting: bool) -> Self {
        Self {
            absence_gap,
            infer_on_first_sighting,
            last_detection_at: None,
            last_batch: Vec::new(),
        }
    }

    /// Records a batch. Returns the end of an absence when `batch` is the first
    /// non-empty batch after at least `absence_gap` without detections.
    pub fn observe(&mut self, batch: &[Detection], now: Instant) -> Option<AbsenceEnded> {
        if batch.is_empty() {
            return None;
        }

        let ended = match self.last_detection_at {
            None if self.infer_on_first_sighting => Some(AbsenceEnded {
                gap: None,
                previous_batch: Vec::new(),
            }),
            None => None,
            Some(previous) => {
                let gap = now.saturating_duration_since(previous);
                (gap >= self.absence_gap).then(|| AbsenceEnded {
                    gap: Some(gap),
                    previous_batch: std::mem::take(&mut self.last_batch),
                })
            }
        };

        self.last_detection_at = Some(now);
        self.last_batch = batch.to_vec();
        ended
    }

    pub fn last_batch(&self) -> &[Detection] {
        &self.last_batch
    }

    pub fn reset(&mut self) {
        self.last_detection_at = None;
        self.last_batch.clear();
    }
}
