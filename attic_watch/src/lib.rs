// THEORY:
// This file is the main entry point for the `attic_watch` library crate. The
// public face of the crate is the `ActivityEngine` with its caller-owned
// `EngineState`, plus `SharedEngine` for callers that feed batches from several
// tasks. The building blocks in `core_modules` (zone grid, scorer, history,
// accessway inference, cooldown scheduler) are exported as well, since each is a
// pure, independently useful piece.

pub mod core_modules;
pub mod engine;
pub mod shared_engine;

pub use crate::core_modules::accessway::{AccesswayInference, AccesswaySet};
pub use crate::core_modules::cooldown::{CooldownConfig, CooldownTimer, GatedAction, Scheduler};
pub use crate::core_modules::detection::{AnchorRule, BoundingBox, Detection};
pub use crate::core_modules::history::{DetectionHistory, HistoryLimit};
pub use crate::core_modules::scorer::RankedZone;
pub use crate::core_modules::zone::{build_zones, Zone, ZoneGrid, ZoneId};
pub use crate::engine::{ActivityEngine, CycleReport, EngineConfig, EngineState};
pub use crate::shared_engine::{EngineSummary, SharedEngine};
