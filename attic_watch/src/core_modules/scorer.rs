// THEORY:
// The scorer turns a batch of detections into a ranking of zones. For every zone
// it counts the detections whose anchor point falls inside it (the zone's
// "trigger count"), drops zones nobody touched, and sorts the rest by count.
//
// Counts are returned fresh on every call and are never written back into the
// zones, so two scoring passes over different batches cannot leak into each
// other. The cost is O(detections x zones), which stays small for one frame's
// batch against a few hundred zones.

use crate::core_modules::detection::{AnchorRule, Detection};
use crate::core_modules::zone::Zone;

/// A zone together with the number of detections it captured in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedZone {
    pub zone: Zone,
    pub trigger_count: u32,
}

/// Per-zone trigger counts, aligned index-for-index with `zones`.
pub fn trigger_counts<'a, I>(detections: I, zones: &[Zone], anchor: AnchorRule) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Detection>,
{
    let mut counts = vec![0u32; zones.len()];
    if zones.is_empty() {
        return counts;
    }

    for detection in detections {
        let point = detection.anchor(anchor);
        for (count, zone) in counts.iter_mut().zip(zones) {
            if zone.contains(point) {
                *count += 1;
            }
        }
    }

    counts
}

/// Ranks zones by how many detections fall inside them.
///
/// Only zones with at least one trigger are returned, highest count first. The
/// sort is stable, so zones with equal counts keep their grid order.
pub fn score<'a, I>(detections: I, zones: &[Zone], anchor: AnchorRule) -> Vec<RankedZone>
where
    I: IntoIterator<Item = &'a Detection>,
{
    let counts = trigger_counts(detections, zones, anchor);
    let mut ranked: Vec<RankedZone> = zones
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(zone, trigger_count)| RankedZone {
            zone: *zone,
            trigger_count,
        })
        .collect();

    ranked.sort_by(|a, b| b.trigger_count.cmp(&a.trigger_count));
    ranked
}

/// The single highest-scoring zone, if any detection touched any zone.
pub fn top_zone<'a, I>(detections: I, zones: &[Zone], anchor: AnchorRule) -> Option<RankedZone>
where
    I: IntoIterator<Item = &'a Detection>,
{
    score(detections, zones, anchor).into_iter().next()
}
