// THEORY:
// Every side effect the engine can trigger is rate limited by its own
// `CooldownTimer`. A timer has two states: Due (never fired, or the interval has
// elapsed since it last fired) and Cooling. Firing moves it to Cooling and
// stamps the time. The scheduler only answers "is this action due"; it never
// performs the action itself.
//
// Data preconditions (a non-empty batch for the deterrent, enough history for
// trap placement) are layered on by the caller through `Scheduler::poll`.

use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_SOUND_COOLDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_TRAP_PLACEMENT_COOLDOWN: Duration = Duration::from_secs(5);
pub const DEFAULT_ACCESSWAY_COOLDOWN: Duration = Duration::from_secs(5);
pub const DEFAULT_SNAPSHOT_COOLDOWN: Duration = Duration::from_secs(10);

/// A minimum-interval gate for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownTimer {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl CooldownTimer {
    /// A timer that starts out due.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Marks the action as fired at `now`, regardless of whether it was due.
    pub fn fire(&mut self, now: Instant) {
        self.last_fired = Some(now);
    }

    /// Fires and returns `true` only if the timer was due.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.fire(now);
            true
        } else {
            false
        }
    }

    /// Time left until the timer is due again; zero when already due.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_fired {
            None => Duration::ZERO,
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
        }
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}

/// The actions gated by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GatedAction {
    SoundTrigger,
    AccesswayEvaluation,
    TrapPlacement,
    Snapshot,
}

impl GatedAction {
    pub const ALL: [GatedAction; 4] = [
        GatedAction::SoundTrigger,
        GatedAction::AccesswayEvaluation,
        GatedAction::TrapPlacement,
        GatedAction::Snapshot,
    ];
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatedAction::SoundTrigger => "sound_trigger",
            GatedAction::AccesswayEvaluation => "accessway_evaluation",
            GatedAction::TrapPlacement => "trap_placement",
            GatedAction::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

/// Interval for each gated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownConfig {
    pub sound: Duration,
    pub accessway: Duration,
    pub trap_placement: Duration,
    pub snapshot: Duration,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            sound: DEFAULT_SOUND_COOLDOWN,
            accessway: DEFAULT_ACCESSWAY_COOLDOWN,
            trap_placement: DEFAULT_TRAP_PLACEMENT_COOLDOWN,
            snapshot: DEFAULT_SNAPSHOT_COOLDOWN,
        }
    }
}

/// Four independent cooldown timers, one per `GatedAction`.
#[derive(Debug, Clone)]
pub struct Scheduler {
    sound: CooldownTimer,
    accessway: CooldownTimer,
    trap_placement: CooldownTimer,
    snapshot: CooldownTimer,
}

impl Scheduler {
    pub fn new(config: &CooldownConfig) -> Self {
        Self {
            sound: CooldownTimer::new(config.sound),
            accessway: CooldownTimer::new(config.accessway),
            trap_placement: CooldownTimer::new(config.trap_placement),
            snapshot: CooldownTimer::new(config.snapshot),
        }
    }

    pub fn timer(&self, action: GatedAction) -> &CooldownTimer {
        match action {
            GatedAction::SoundTrigger => &self.sound,
            GatedAction::AccesswayEvaluation => &self.accessway,
            GatedAction::TrapPlacement => &self.trap_placement,
            GatedAction::Snapshot => &self.snapshot,
        }
    }

    fn timer_mut(&mut self, action: GatedAction) -> &mut CooldownTimer {
        match action {
            GatedAction::SoundTrigger => &mut self.sound,
            GatedAction::AccesswayEvaluation => &mut self.accessway,
            GatedAction::TrapPlacement => &mut self.trap_placement,
            GatedAction::Snapshot => &mut self.snapshot,
        }
    }

    pub fn is_due(&self, action: GatedAction, now: Instant) -> bool {
        self.timer(action).is_due(now)
    }

    pub fn fire(&mut self, action: GatedAction, now: Instant) {
        self.timer_mut(action).fire(now);
    }

    /// Fires `action` if its timer is due and `precondition` holds.
    /// A failed precondition leaves the timer untouched.
    pub fn poll(&mut self, action: GatedAction, now: Instant, precondition: bool) -> bool {
        precondition && self.timer_mut(action).try_fire(now)
    }

    pub fn reset(&mut self) {
        for action in GatedAction::ALL {
            self.timer_mut(action).reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_boundaries() {
        let t0 = Instant::now();
        let mut timer = CooldownTimer::new(Duration::from_secs(5));
        assert!(timer.is_due(t0));
        assert!(timer.try_fire(t0));

        assert!(!timer.is_due(t0 + Duration::from_millis(4900)));
        assert!(timer.is_due(t0 + Duration::from_secs(5)));

        let t5 = t0 + Duration::from_secs(5);
        assert!(timer.try_fire(t5));
        assert!(!timer.is_due(t5 + Duration::from_millis(100)));
    }

    #[test]
    fn try_fire_while_cooling_keeps_original_stamp() {
        let t0 = Instant::now();
        let mut timer = CooldownTimer::new(Duration::from_secs(5));
        timer.fire(t0);
        assert!(!timer.try_fire(t0 + Duration::from_secs(3)));
        assert_eq!(timer.last_fired(), Some(t0));
        assert_eq!(timer.remaining(t0 + Duration::from_secs(3)), Duration::from_secs(2));
    }

    #[test]
    fn timers_are_independent() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new(&CooldownConfig::default());
        assert!(GatedAction::ALL.into_iter().all(|a| scheduler.is_due(a, t0)));

        scheduler.fire(GatedAction::SoundTrigger, t0);
        let t6 = t0 + Duration::from_secs(6);
        assert!(!scheduler.is_due(GatedAction::SoundTrigger, t6));
        assert!(scheduler.is_due(GatedAction::TrapPlacement, t6));
        assert!(scheduler.is_due(GatedAction::Snapshot, t6));
    }

    #[test]
    fn failed_precondition_does_not_consume_the_timer() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new(&CooldownConfig::default());
        assert!(!scheduler.poll(GatedAction::SoundTrigger, t0, false));
        assert!(scheduler.poll(GatedAction::SoundTrigger, t0, true));
        assert!(!scheduler.poll(GatedAction::SoundTrigger, t0 + Duration::from_secs(29), true));
    }

    #[test]
    fn reset_makes_everything_due() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new(&CooldownConfig::default());
        for action in GatedAction::ALL {
            scheduler.fire(action, t0);
        }
        assert!(GatedAction::ALL.into_iter().all(|a| !scheduler.is_due(a, t0)));
        scheduler.reset();
        assert!(GatedAction::ALL.into_iter().all(|a| scheduler.is_due(a, t0)));
    }
}
