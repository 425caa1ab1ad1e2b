// THEORY:
// The engine only says when an action is due; this module carries it out.
//
// Key architectural principles:
// 1.  **Never Block The Feed**: The deterrent player runs as a detached child
//     process and snapshots are encoded on the blocking pool.
// 2.  **Failures Are Logged, Not Fatal**: A missing player or a full disk is
//     reported as it happens and the feed keeps running.

use crate::error::{Result, SupervisorError};
use image::RgbaImage;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tokio::task::{JoinError, JoinSet};

/// Plays the deterrent sound. Implementations must not block the caller.
pub trait Deterrent: Send {
    fn trigger(&mut self) -> Result<()>;
}

/// Spawns an external audio player (`aplay`, `afplay`, `paplay`, ...) on the
/// configured sound file and leaves it running in the background.
pub struct CommandDeterrent {
    program: String,
    sound_file: PathBuf,
    child: Option<std::process::Child>,
}

impl CommandDeterrent {
    pub fn new(program: impl Into<String>, sound_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            sound_file: sound_file.into(),
            child: None,
        }
    }

    /// True while the previously started player is still running.
    fn still_playing(&mut self) -> bool {
        match self.child.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                if !status.success() {
                    tracing::warn!(%status, "deterrent player exited with failure");
                }
                self.child = None;
                false
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "could not poll deterrent player");
                self.child = None;
                false
            }
            None => false,
        }
    }
}

impl Deterrent for CommandDeterrent {
    fn trigger(&mut self) -> Result<()> {
        if self.still_playing() {
            tracing::debug!("deterrent already playing");
            return Ok(());
        }
        let child = Command::new(&self.program)
            .arg(&self.sound_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SupervisorError::Deterrent(format!("{}: {e}", self.program)))?;
        tracing::info!(program = %self.program, sound = %self.sound_file.display(), "deterrent playing");
        self.child = Some(child);
        Ok(())
    }
}

/// Records triggers without making a sound; used when no sound file is configured.
#[derive(Debug, Default)]
pub struct LogDeterrent {
    pub triggered: u64,
}

impl Deterrent for LogDeterrent {
    fn trigger(&mut self) -> Result<()> {
        self.triggered += 1;
        tracing::info!(count = self.triggered, "deterrent due (no player configured)");
        Ok(())
    }
}

/// Saves snapshots as `snapshot_{frame:06}.png` under a directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SupervisorError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, frame_id: u64) -> PathBuf {
        self.dir.join(format!("snapshot_{frame_id:06}.png"))
    }

    pub fn save(&self, frame_id: u64, image: &RgbaImage) -> Result<PathBuf> {
        let path = self.path_for(frame_id);
        image.save(&path)?;
        Ok(path)
    }
}

/// Snapshot jobs running on the blocking pool. Finished jobs are reaped while
/// the feed runs so their results are logged as they land.
#[derive(Default)]
pub struct SnapshotQueue {
    tasks: JoinSet<Result<PathBuf>>,
    saved: u64,
    failed: u64,
}

impl SnapshotQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> Result<PathBuf> + Send + 'static,
    {
        self.tasks.spawn_blocking(job);
    }

    /// Collects every job that has already finished without waiting on the rest.
    /// Returns how many were collected.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(joined) = self.tasks.try_join_next() {
            self.record(joined);
            reaped += 1;
        }
        reaped
    }

    /// Waits for every outstanding job.
    pub async fn finish(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    fn record(&mut self, joined: std::result::Result<Result<PathBuf>, JoinError>) {
        match joined {
            Ok(Ok(path)) => {
                self.saved += 1;
                tracing::debug!(path = %path.display(), "snapshot saved");
            }
            Ok(Err(e)) => {
                self.failed += 1;
                tracing::warn!(error = %e, "snapshot failed");
            }
            Err(e) => {
                self.failed += 1;
                tracing::warn!(error = %e, "snapshot task panicked");
            }
        }
    }
}
