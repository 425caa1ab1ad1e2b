// THEORY:
// Supervisor configuration is a TOML file whose sections all default, plus a
// handful of `ATTIC_*` environment overrides for the paths that change between
// deployments. Durations are written as seconds and converted to engine types
// at the boundary.

use crate::error::{Result, SupervisorError};
use attic_watch::core_modules::history::HistoryLimit;
use attic_watch::{AnchorRule, CooldownConfig, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub deterrent: DeterrentSection,
    #[serde(default)]
    pub snapshots: SnapshotSection,
    #[serde(default)]
    pub source: SourceSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_zone_stride")]
    pub zone_stride: u32,
    #[serde(default = "default_zone_size")]
    pub zone_size: u32,
    #[serde(default)]
    pub anchor: AnchorRule,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// When set, history is a time window instead of a detection cap.
    #[serde(default)]
    pub max_history_age_secs: Option<f64>,
    #[serde(default)]
    pub unbounded_history: bool,
    #[serde(default = "default_min_history")]
    pub min_history_for_placement: usize,
    #[serde(default = "default_absence_gap")]
    pub absence_gap_secs: f64,
    #[serde(default = "default_true")]
    pub infer_on_first_sighting: bool,
    #[serde(default = "default_sound_cooldown")]
    pub sound_cooldown_secs: f64,
    #[serde(default = "default_accessway_cooldown")]
    pub accessway_cooldown_secs: f64,
    #[serde(default = "default_trap_cooldown")]
    pub trap_placement_cooldown_secs: f64,
    #[serde(default = "default_snapshot_cooldown")]
    pub snapshot_cooldown_secs: f64,
    #[serde(default = "default_max_trap_placements")]
    pub max_trap_placements: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterrentSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Player executable, invoked as `<command> <sound_file>`.
    #[serde(default = "default_player")]
    pub command: String,
    #[serde(default)]
    pub sound_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,
    /// Still image of the space to draw overlays on; a dark canvas otherwise.
    #[serde(default)]
    pub background: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_detections")]
    pub detections: PathBuf,
    #[serde(default)]
    pub min_confidence: f32,
}

fn default_frame_width() -> u32 { 1280 }
fn default_frame_height() -> u32 { 720 }
fn default_zone_stride() -> u32 { attic_watch::engine::DEFAULT_ZONE_STRIDE }
fn default_zone_size() -> u32 { attic_watch::engine::DEFAULT_ZONE_SIZE }
fn default_max_history() -> usize { 10_000 }
fn default_min_history() -> usize { attic_watch::engine::DEFAULT_MIN_HISTORY_FOR_PLACEMENT }
fn default_absence_gap() -> f64 { 5.0 }
fn default_true() -> bool { true }
fn default_sound_cooldown() -> f64 { 30.0 }
fn default_accessway_cooldown() -> f64 { 5.0 }
fn default_trap_cooldown() -> f64 { 5.0 }
fn default_snapshot_cooldown() -> f64 { 10.0 }
fn default_max_trap_placements() -> usize { attic_watch::engine::DEFAULT_MAX_TRAP_PLACEMENTS }
fn default_player() -> String { "aplay".to_string() }
fn default_snapshot_dir() -> PathBuf { PathBuf::from("./data/snapshots") }
fn default_detections() -> PathBuf { PathBuf::from("./data/detections.jsonl") }

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            zone_stride: default_zone_stride(),
            zone_size: default_zone_size(),
            anchor: AnchorRule::default(),
            max_history: default_max_history(),
            max_history_age_secs: None,
            unbounded_history: false,
            min_history_for_placement: default_min_history(),
            absence_gap_secs: default_absence_gap(),
            infer_on_first_sighting: true,
            sound_cooldown_secs: default_sound_cooldown(),
            accessway_cooldown_secs: default_accessway_cooldown(),
            trap_placement_cooldown_secs: default_trap_cooldown(),
            snapshot_cooldown_secs: default_snapshot_cooldown(),
            max_trap_placements: default_max_trap_placements(),
        }
    }
}

impl Default for DeterrentSection {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_player(),
            sound_file: None,
        }
    }
}

impl Default for SnapshotSection {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_snapshot_dir(),
            background: None,
        }
    }
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            detections: default_detections(),
            min_confidence: 0.0,
        }
    }
}

/// Negative, NaN or infinite second counts collapse to zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl EngineSection {
    pub fn history_limit(&self) -> HistoryLimit {
        if self.unbounded_history {
            HistoryLimit::Unbounded
        } else if let Some(age) = self.max_history_age_secs {
            HistoryLimit::MaxAge(seconds(age))
        } else {
            HistoryLimit::MaxDetections(self.max_history)
        }
    }

    /// Builds the engine configuration for a frame of the given size.
    pub fn to_engine_config(&self, frame_width: u32, frame_height: u32) -> EngineConfig {
        EngineConfig {
            frame_width,
            frame_height,
            zone_stride: self.zone_stride,
            zone_size: self.zone_size,
            anchor: self.anchor,
            history_limit: self.history_limit(),
            min_history_for_placement: self.min_history_for_placement,
            absence_gap: seconds(self.absence_gap_secs),
            infer_on_first_sighting: self.infer_on_first_sighting,
            cooldowns: CooldownConfig {
                sound: seconds(self.sound_cooldown_secs),
                accessway: seconds(self.accessway_cooldown_secs),
                trap_placement: seconds(self.trap_placement_cooldown_secs),
                snapshot: seconds(self.snapshot_cooldown_secs),
            },
            max_trap_placements: self.max_trap_placements,
        }
    }
}

impl SupervisorConfig {
    /// Reads a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SupervisorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| SupervisorError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies `ATTIC_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `ATTIC_*` overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ATTIC_DETECTIONS") {
            self.source.detections = PathBuf::from(path);
        }
        if let Some(dir) = lookup("ATTIC_SNAPSHOT_DIR") {
            self.snapshots.dir = PathBuf::from(dir);
        }
        if let Some(sound) = lookup("ATTIC_SOUND_FILE") {
            self.deterrent.sound_file = Some(PathBuf::from(sound));
        }
        if let Some(background) = lookup("ATTIC_BACKGROUND") {
            self.snapshots.background = Some(PathBuf::from(background));
        }
    }
}
