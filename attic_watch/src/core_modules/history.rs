// THEORY:
// The `history` module keeps the running record of every detection observed so
// far. Trap placement is scored against this record, so the ranking reflects
// where activity has accumulated over time rather than where the animal is now.
//
// Detections are appended as independent samples: the same animal sitting still
// for a hundred frames contributes a hundred samples to its zone, which is the
// intended weighting for "where does it spend time".
//
// Left alone the record grows without bound. Growth is governed by a
// `HistoryLimit` instead, defaulting to a generous detection cap; `Unbounded`
// turns the cap off when that is explicitly wanted.

use crate::core_modules::detection::Detection;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_MAX_DETECTIONS: usize = 10_000;

/// Retention policy for the detection history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLimit {
    /// Keep every detection for the life of the process.
    Unbounded,
    /// Keep at most this many detections, evicting the oldest first.
    MaxDetections(usize),
    /// Keep only detections observed within this window of the latest batch.
    MaxAge(Duration),
}

impl Default for HistoryLimit {
    fn default() -> Self {
        HistoryLimit::MaxDetections(DEFAULT_MAX_DETECTIONS)
    }
}

/// Appends `batch` to `history` without deduplication.
pub fn accumulate(mut history: Vec<Detection>, batch: &[Detection]) -> Vec<Detection> {
    if history.is_empty() {
        return batch.to_vec();
    }
    history.extend_from_slice(batch);
    history
}

/// The union of all detection batches observed since start (or the last reset),
/// subject to a retention limit.
#[derive(Debug, Clone)]
pub struct DetectionHistory {
    /// Detections paired with the time their batch arrived, oldest first.
    entries: VecDeque<(Instant, Detection)>,
    limit: HistoryLimit,
    /// Lifetime number of detections accumulated, unaffected by eviction.
    total_observed: u64,
}

impl DetectionHistory {
    pub fn new(limit: HistoryLimit) -> Self {
        let capacity = match limit {
            HistoryLimit::MaxDetections(n) => n.min(DEFAULT_MAX_DETECTIONS),
            _ => 0,
        };
        Self {
            entries: VecDeque::with_capacity(capacity),
            limit,
            total_observed: 0,
        }
    }

    /// Adds a batch observed at `now`, then applies the retention limit.
    pub fn accumulate(&mut self, batch: &[Detection], now: Instant) {
        self.entries
            .extend(batch.iter().cloned().map(|detection| (now, detection)));
        self.total_observed += batch.len() as u64;
        self.evict(now);
    }

    fn evict(&mut self, now: Instant) {
        match self.limit {
            HistoryLimit::Unbounded => {}
            HistoryLimit::MaxDetections(max) => {
                let excess = self.entries.len().saturating_sub(max);
                self.entries.drain(..excess);
            }
            HistoryLimit::MaxAge(window) => {
                while let Some((seen_at, _)) = self.entries.front() {
                    if now.saturating_duration_since(*seen_at) > window {
                        self.entries.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> HistoryLimit {
        self.limit
    }

    pub fn total_observed(&self) -> u64 {
        self.total_observed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.entries.iter().map(|(_, detection)| detection)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_observed = 0;
    }
}

impl Default for DetectionHistory {
    fn default() -> Self {
        Self::new(HistoryLimit::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(n: usize) -> Vec<Detection> {
        (0..n)
            .map(|i| Detection::centered_at(i as f32, i as f32, 10.0, 10.0))
            .collect()
    }

    #[test]
    fn free_function_concatenates() {
        let history = accumulate(Vec::new(), &batch(3));
        assert_eq!(history.len(), 3);
        let history = accumulate(history, &batch(2));
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn accumulation_count_is_associative() {
        let (b1, b2) = (batch(4), batch(7));
        let stepwise = accumulate(accumulate(batch(2), &b1), &b2);
        let combined: Vec<Detection> = b1.iter().chain(&b2).cloned().collect();
        let at_once = accumulate(batch(2), &combined);
        assert_eq!(stepwise.len(), at_once.len());
    }

    #[test]
    fn identical_detections_are_kept() {
        let t0 = Instant::now();
        let mut history = DetectionHistory::new(HistoryLimit::Unbounded);
        let same = vec![Detection::centered_at(5.0, 5.0, 1.0, 1.0)];
        history.accumulate(&same, t0);
        history.accumulate(&same, t0);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn detection_cap_evicts_oldest() {
        let t0 = Instant::now();
        let mut history = DetectionHistory::new(HistoryLimit::MaxDetections(5));
        history.accumulate(&batch(4), t0);
        history.accumulate(&batch(4), t0);
        assert_eq!(history.len(), 5);
        assert_eq!(history.total_observed(), 8);
        // Oldest retained is the fourth detection of the first batch.
        assert_eq!(history.iter().next().map(|d| d.bbox.x1), Some(3.0 - 5.0));
    }

    #[test]
    fn age_window_drops_stale_batches() {
        let t0 = Instant::now();
        let mut history = DetectionHistory::new(HistoryLimit::MaxAge(Duration::from_secs(10)));
        history.accumulate(&batch(3), t0);
        history.accumulate(&batch(2), t0 + Duration::from_secs(10));
        assert_eq!(history.len(), 5);
        history.accumulate(&batch(1), t0 + Duration::from_secs(11));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut history = DetectionHistory::default();
        history.accumulate(&[], Instant::now());
        assert!(history.is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut history = DetectionHistory::default();
        history.accumulate(&batch(3), Instant::now());
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.total_observed(), 0);
    }
}
