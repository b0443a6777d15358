use std::time::Duration;

use tracing::{debug, trace};

use crate::scheduler::{Fired, Scheduler, TaskId, TimerEvent};

pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 10;

/// Stereo position of a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Pan {
    Left,
    Center,
    Right,
}

impl Pan {
    /// Stereo pan value in [-1, 1].
    pub fn value(self) -> f32 {
        match self {
            Pan::Left => -1.0,
            Pan::Center => 0.0,
            Pan::Right => 1.0,
        }
    }
}

/// Where the marker last came to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Center,
    Right,
    Left,
}

impl From<Pan> for Phase {
    fn from(pan: Pan) -> Self {
        match pan {
            Pan::Left => Phase::Left,
            Pan::Center => Phase::Center,
            Pan::Right => Phase::Right,
        }
    }
}

/// Receiver of edge cues; the audio player in production.
pub trait CueSink {
    fn play_cue(&mut self, pan: Pan);
}

/// Seconds for one full center-right-center-left-center sweep.
///
/// Level 1 is 6s, each level takes half a second off, level 10 is 1.5s.
/// Out-of-range levels are clamped.
pub fn cycle_duration_secs(level: u8) -> f64 {
    let level = level.clamp(MIN_SPEED, MAX_SPEED);
    6.0 - f64::from(level - 1) * 0.5
}

pub fn cycle_duration(level: u8) -> Duration {
    Duration::from_secs_f64(cycle_duration_secs(level))
}

#[derive(Debug, Clone, Copy)]
struct ActiveCycle {
    started_at: Duration,
    duration: Duration,
}

/// Owns the looping marker motion and the two cues scheduled per cycle.
///
/// A cycle of length D schedules a right cue at D/4, a left cue at 3D/4 and
/// its own restart at D. All three carry the current generation; stopping
/// bumps the generation and cancels the handles, so nothing from an old
/// cycle can fire into a new one.
#[derive(Debug)]
pub struct AnimationDriver {
    speed: u8,
    cycle: Option<ActiveCycle>,
    generation: u64,
    pending: Vec<TaskId>,
    phase: Phase,
}

impl AnimationDriver {
    pub fn new(speed: u8) -> Self {
        Self {
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
            cycle: None,
            generation: 0,
            pending: Vec::with_capacity(3),
            phase: Phase::Center,
        }
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn cycle_duration(&self) -> Duration {
        cycle_duration(self.speed)
    }

    pub fn is_running(&self) -> bool {
        self.cycle.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Outstanding cue and restart handles.
    pub fn pending_handles(&self) -> usize {
        self.pending.len()
    }

    /// Begin a fresh cycle at `now`, replacing any cycle in flight.
    pub fn start_cycle(&mut self, scheduler: &mut Scheduler<TimerEvent>, now: Duration) {
        self.stop_cycle(scheduler);
        debug!(
            speed = self.speed,
            cycle_secs = self.cycle_duration().as_secs_f64(),
            generation = self.generation,
            "animation cycle started"
        );
        self.schedule_cycle(scheduler, now);
    }

    /// Cancel every pending cue and restart and park the marker at center.
    /// Calling it with nothing scheduled is a no-op.
    pub fn stop_cycle(&mut self, scheduler: &mut Scheduler<TimerEvent>) {
        scheduler.cancel_all(self.pending.drain(..));
        if self.cycle.take().is_some() {
            debug!(generation = self.generation, "animation cycle stopped");
        }
        self.generation += 1;
        self.phase = Phase::Center;
    }

    /// Change the speed level. A running cycle restarts at `now` with the new
    /// duration so audio and motion stay in step.
    pub fn set_speed(&mut self, level: u8, scheduler: &mut Scheduler<TimerEvent>, now: Duration) {
        let level = level.clamp(MIN_SPEED, MAX_SPEED);
        if level == self.speed {
            return;
        }
        self.speed = level;
        if self.is_running() {
            self.start_cycle(scheduler, now);
        }
    }

    /// Handle a fired cue or restart. Returns false for stale or foreign events.
    pub fn handle<S: CueSink + ?Sized>(
        &mut self,
        scheduler: &mut Scheduler<TimerEvent>,
        fired: &Fired<TimerEvent>,
        sink: &mut S,
    ) -> bool {
        match fired.event {
            TimerEvent::Cue { pan, generation } if self.is_current(generation) => {
                self.pending.retain(|id| *id != fired.id);
                self.phase = pan.into();
                trace!(%pan, at = ?fired.due, "cue");
                sink.play_cue(pan);
                true
            }
            TimerEvent::CycleRestart { generation } if self.is_current(generation) => {
                self.phase = Phase::Center;
                // Anchor on the due time so late dispatch does not accumulate drift
                self.schedule_cycle(scheduler, fired.due);
                true
            }
            TimerEvent::Cue { generation, .. } | TimerEvent::CycleRestart { generation } => {
                debug!(
                    generation,
                    current = self.generation,
                    "stale animation event dropped"
                );
                false
            }
            TimerEvent::CountdownTick => false,
        }
    }

    /// Horizontal marker offset in [-1, 1] at `now`; 0 whenever stopped.
    pub fn position(&self, now: Duration) -> f64 {
        let Some(cycle) = self.cycle else {
            return 0.0;
        };
        let elapsed = now.saturating_sub(cycle.started_at).as_secs_f64();
        let frac = (elapsed / cycle.duration.as_secs_f64()).fract();
        triangle(frac)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.cycle.is_some() && generation == self.generation
    }

    fn schedule_cycle(&mut self, scheduler: &mut Scheduler<TimerEvent>, start: Duration) {
        let duration = self.cycle_duration();
        let quarter = duration / 4;
        let generation = self.generation;

        self.pending.clear();
        self.pending.push(scheduler.schedule_at(
            start + quarter,
            TimerEvent::Cue {
                pan: Pan::Right,
                generation,
            },
        ));
        self.pending.push(scheduler.schedule_at(
            start + quarter * 3,
            TimerEvent::Cue {
                pan: Pan::Left,
                generation,
            },
        ));
        self.pending.push(scheduler.schedule_at(
            start + duration,
            TimerEvent::CycleRestart { generation },
        ));
        self.cycle = Some(ActiveCycle {
            started_at: start,
            duration,
        });
    }
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new(5)
    }
}

// center -> right -> center -> left -> center over one cycle
fn triangle(frac: f64) -> f64 {
    match frac {
        f if f < 0.25 => f * 4.0,
        f if f < 0.75 => 1.0 - (f - 0.25) * 4.0,
        f => -1.0 + (f - 0.75) * 4.0,
    }
}
