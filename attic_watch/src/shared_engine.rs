// THEORY:
// When batches arrive from more than one task (a worker pool around the inference
// client, a control task issuing resets, a renderer asking for the current
// placements), the engine state must still be observed and updated one batch at
// a time. `SharedEngine` puts the whole `EngineState` behind a single async
// mutex and holds it for an entire cycle, so accumulation, inference and timer
// updates always see a consistent snapshot of history.

use crate::core_modules::detection::Detection;
use crate::core_modules::scorer::RankedZone;
use crate::core_modules::zone::Zone;
use crate::engine::{ActivityEngine, CycleReport, EngineConfig, EngineState};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// A point-in-time view of the engine's derived state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSummary {
    pub cycles: u64,
    pub history_len: usize,
    pub total_observed: u64,
    pub trap_placements: Vec<RankedZone>,
    pub accessways: Vec<Zone>,
}

/// A cloneable handle to one engine and its state.
#[derive(Clone)]
pub struct SharedEngine {
    engine: Arc<ActivityEngine>,
    state: Arc<Mutex<EngineState>>,
}

impl SharedEngine {
    pub fn new(config: EngineConfig) -> Self {
        let engine = ActivityEngine::new(config);
        let state = engine.new_state();
        Self {
            engine: Arc::new(engine),
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn engine(&self) -> &ActivityEngine {
        &self.engine
    }

    /// Runs one full cycle while holding the state lock.
    pub async fn on_detection_batch(&self, batch: &[Detection], now: Instant) -> CycleReport {
        let mut state = self.state.lock().await;
        self.engine.on_detection_batch(&mut state, batch, now)
    }

    pub async fn summary(&self) -> EngineSummary {
        let state = self.state.lock().await;
        EngineSummary {
            cycles: state.cycle(),
            history_len: state.history().len(),
            total_observed: state.history().total_observed(),
            trap_placements: state.trap_placements().to_vec(),
            accessways: state.accessways().zones().to_vec(),
        }
    }

    pub async fn reset(&self) {
        self.state.lock().await.reset();
        tracing::info!("engine state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_producers_see_every_batch() {
        let shared = SharedEngine::new(EngineConfig::default());
        let t0 = Instant::now();

        let mut handles = Vec::new();
        for worker in 0..4u64 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..5u64 {
                    let batch = [Detection::centered_at(150.0, 150.0, 10.0, 10.0)];
                    let now = t0 + Duration::from_millis(worker * 100 + i);
                    shared.on_detection_batch(&batch, now).await;
                }
            }));
        }
        for handle in handles {
            handle.await.expect("producer task panicked");
        }

        let summary = shared.summary().await;
        assert_eq!(summary.cycles, 20);
        assert_eq!(summary.history_len, 20);
        assert_eq!(summary.total_observed, 20);
    }

    #[tokio::test]
    async fn reset_clears_shared_state() {
        let shared = SharedEngine::new(EngineConfig::default());
        let batch = [Detection::centered_at(150.0, 150.0, 10.0, 10.0)];
        shared.on_detection_batch(&batch, Instant::now()).await;
        shared.reset().await;
        assert_eq!(shared.summary().await, EngineSummary::default());
    }
}
