use std::time::Duration;

use tracing::{debug, info};

use crate::animation::{AnimationDriver, CueSink, Phase};
use crate::scheduler::{Fired, Scheduler, TaskId, TimerEvent};
use crate::settings::{ConfigField, SessionConfig};

const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    #[strum(to_string = "Round complete")]
    RoundComplete,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundCounter {
    pub current: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub remaining_secs: u32,
}

/// The round/timer controller.
///
/// Owns the scheduler, the animation driver and the countdown handle, so a
/// transition out of Running cancels every outstanding callback in one place.
/// Time only moves through [`Session::advance_to`].
#[derive(Debug)]
pub struct Session<S: CueSink> {
    config: SessionConfig,
    snapshot: SessionConfig,
    state: SessionState,
    rounds: RoundCounter,
    countdown: Countdown,
    driver: AnimationDriver,
    scheduler: Scheduler<TimerEvent>,
    countdown_task: Option<TaskId>,
    sink: S,
    now: Duration,
}

impl<S: CueSink> Session<S> {
    pub fn new(config: SessionConfig, sink: S) -> Self {
        Self {
            rounds: RoundCounter {
                current: 0,
                total: config.total_rounds,
            },
            countdown: Countdown {
                remaining_secs: config.duration_secs,
            },
            driver: AnimationDriver::new(config.speed_level),
            snapshot: config.clone(),
            config,
            state: SessionState::Idle,
            scheduler: Scheduler::new(),
            countdown_task: None,
            sink,
            now: Duration::ZERO,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rounds(&self) -> RoundCounter {
        self.rounds
    }

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    /// The live, editable configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The configuration captured when the session last started.
    pub fn snapshot(&self) -> &SessionConfig {
        &self.snapshot
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn phase(&self) -> Phase {
        self.driver.phase()
    }

    pub fn is_animating(&self) -> bool {
        self.driver.is_running()
    }

    pub fn countdown_active(&self) -> bool {
        self.countdown_task.is_some()
    }

    /// Outstanding scheduled callbacks of any kind.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Marker offset in [-1, 1]; 0 unless running.
    pub fn marker_position(&self) -> f64 {
        self.driver.position(self.now)
    }

    /// Move the session clock forward, dispatching every callback due on the way
    /// in order. Earlier times are ignored.
    pub fn advance_to(&mut self, now: Duration) {
        while let Some(fired) = self.scheduler.pop_due(now) {
            self.now = self.now.max(fired.due);
            self.dispatch(fired);
        }
        self.now = self.now.max(now);
    }

    /// Start from Idle or Ended. From Paused this continues instead.
    pub fn start(&mut self) {
        match self.state {
            SessionState::Idle | SessionState::Ended => {
                self.snapshot = self.config.clone();
                self.rounds = RoundCounter {
                    current: 1,
                    total: self.snapshot.total_rounds,
                };
                self.countdown.remaining_secs = self.snapshot.duration_secs;
                info!(
                    rounds = self.rounds.total,
                    duration_secs = self.snapshot.duration_secs,
                    speed = self.snapshot.speed_level,
                    "session started"
                );
                self.enter_running();
            }
            SessionState::Paused => self.resume(),
            SessionState::Running | SessionState::RoundComplete => {
                debug!(state = %self.state, "start ignored");
            }
        }
    }

    /// The Pause/Continue toggle: pauses while running, continues while
    /// paused or between rounds.
    pub fn pause(&mut self) {
        match self.state {
            SessionState::Running => {
                info!(
                    round = self.rounds.current,
                    remaining_secs = self.countdown.remaining_secs,
                    "session paused"
                );
                self.leave_running(SessionState::Paused);
            }
            SessionState::Paused | SessionState::RoundComplete => self.resume(),
            SessionState::Idle | SessionState::Ended => {
                debug!(state = %self.state, "pause ignored");
            }
        }
    }

    /// Continue after a pause (same round and countdown) or after a completed
    /// round (next round, fresh countdown).
    pub fn resume(&mut self) {
        match self.state {
            SessionState::Paused => {
                info!(round = self.rounds.current, "session resumed");
                self.enter_running();
            }
            SessionState::RoundComplete => {
                self.rounds.current += 1;
                self.countdown.remaining_secs = self.snapshot.duration_secs;
                info!(
                    round = self.rounds.current,
                    total = self.rounds.total,
                    "next round"
                );
                self.enter_running();
            }
            _ => debug!(state = %self.state, "resume ignored"),
        }
    }

    /// Space bar: start when nothing is in progress, otherwise toggle.
    pub fn start_or_toggle(&mut self) {
        match self.state {
            SessionState::Idle | SessionState::Ended => self.start(),
            _ => self.pause(),
        }
    }

    /// Back to Idle from anywhere, re-reading the current configuration.
    pub fn reset(&mut self) {
        self.cancel_all();
        self.state = SessionState::Idle;
        self.snapshot = self.config.clone();
        self.refresh_idle_display();
        self.driver
            .set_speed(self.config.speed_level, &mut self.scheduler, self.now);
        info!("session reset");
    }

    pub fn input_enabled(&self, field: ConfigField) -> bool {
        !field.locked_while_active()
            || matches!(self.state, SessionState::Idle | SessionState::Ended)
    }

    /// Apply a raw input value. Returns false if the input is locked or the
    /// value was rejected.
    pub fn edit(&mut self, field: ConfigField, raw: &str) -> bool {
        if !self.input_enabled(field) {
            debug!(%field, state = %self.state, "config input disabled");
            return false;
        }
        let changed = self.config.apply(field, raw);
        if changed {
            self.after_edit(field);
        }
        changed
    }

    /// Step an input up or down. `sounds` is the catalog used for the sound field.
    pub fn adjust(&mut self, field: ConfigField, delta: i32, sounds: &[String]) -> bool {
        if !self.input_enabled(field) {
            debug!(%field, state = %self.state, "config input disabled");
            return false;
        }
        let changed = self.config.step(field, delta, sounds);
        if changed {
            self.after_edit(field);
        }
        changed
    }

    pub fn round_label(&self) -> String {
        format!("Round: {} / {}", self.rounds.current, self.rounds.total)
    }

    pub fn time_label(&self) -> String {
        format!("Time: {}s", self.countdown.remaining_secs)
    }

    pub fn pause_label(&self) -> &'static str {
        match self.state {
            SessionState::Paused | SessionState::RoundComplete => "Continue",
            _ => "Pause",
        }
    }

    pub fn start_enabled(&self) -> bool {
        matches!(
            self.state,
            SessionState::Idle | SessionState::Ended | SessionState::Paused
        )
    }

    pub fn pause_enabled(&self) -> bool {
        matches!(
            self.state,
            SessionState::Running | SessionState::Paused | SessionState::RoundComplete
        )
    }

    fn after_edit(&mut self, field: ConfigField) {
        if self.state == SessionState::Idle {
            self.refresh_idle_display();
        }
        if field == ConfigField::Speed {
            self.driver
                .set_speed(self.config.speed_level, &mut self.scheduler, self.now);
        }
    }

    fn refresh_idle_display(&mut self) {
        self.rounds = RoundCounter {
            current: 0,
            total: self.config.total_rounds,
        };
        self.countdown.remaining_secs = self.config.duration_secs;
    }

    fn dispatch(&mut self, fired: Fired<TimerEvent>) {
        match fired.event {
            TimerEvent::CountdownTick => self.on_countdown_tick(),
            TimerEvent::Cue { .. } | TimerEvent::CycleRestart { .. } => {
                self.driver
                    .handle(&mut self.scheduler, &fired, &mut self.sink);
            }
        }
    }

    fn on_countdown_tick(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.countdown.remaining_secs = self.countdown.remaining_secs.saturating_sub(1);
        if self.countdown.remaining_secs == 0 {
            self.complete_round();
        }
    }

    fn complete_round(&mut self) {
        if self.rounds.current >= self.rounds.total {
            info!(rounds = self.rounds.total, "session ended");
            self.leave_running(SessionState::Ended);
        } else {
            info!(
                round = self.rounds.current,
                total = self.rounds.total,
                "round complete"
            );
            self.leave_running(SessionState::RoundComplete);
        }
    }

    fn enter_running(&mut self) {
        self.cancel_all();
        self.state = SessionState::Running;
        self.driver
            .set_speed(self.snapshot.speed_level, &mut self.scheduler, self.now);
        self.driver.start_cycle(&mut self.scheduler, self.now);
        self.countdown_task = Some(self.scheduler.schedule_every(
            self.now,
            COUNTDOWN_INTERVAL,
            TimerEvent::CountdownTick,
        ));
    }

    fn leave_running(&mut self, next: SessionState) {
        self.cancel_all();
        self.state = next;
    }

    // Every exit path funnels through here: countdown, cues and cycle restart go together
    fn cancel_all(&mut self) {
        if let Some(id) = self.countdown_task.take() {
            self.scheduler.cancel(id);
        }
        self.driver.stop_cycle(&mut self.scheduler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Pan;
    use assert_matches::assert_matches;

    #[derive(Debug, Default)]
    struct Cues(Vec<Pan>);

    impl CueSink for Cues {
        fn play_cue(&mut self, pan: Pan) {
            self.0.push(pan);
        }
    }

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn counter(current: u32, total: u32) -> RoundCounter {
        RoundCounter { current, total }
    }

    fn config(duration_secs: u32, total_rounds: u32, speed_level: u8) -> SessionConfig {
        SessionConfig {
            duration_secs,
            total_rounds,
            speed_level,
            ..SessionConfig::default()
        }
    }

    fn session(duration: u32, rounds: u32, speed: u8) -> Session<Cues> {
        Session::new(config(duration, rounds, speed), Cues::default())
    }

    #[test]
    fn idle_defaults() {
        let s = session(30, 5, 5);
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.rounds(), counter(0, 5));
        assert_eq!(s.countdown().remaining_secs, 30);
        assert_eq!(s.round_label(), "Round: 0 / 5");
        assert_eq!(s.time_label(), "Time: 30s");
        assert_eq!(s.pending_timers(), 0);
        assert!(s.start_enabled());
        assert!(!s.pause_enabled());
    }

    #[test]
    fn start_sets_first_round_and_locks_inputs() {
        let mut s = session(10, 3, 5);
        s.start();

        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.rounds(), counter(1, 3));
        assert_eq!(s.countdown().remaining_secs, 10);
        assert!(s.is_animating());
        assert!(s.countdown_active());
        for field in [
            ConfigField::Duration,
            ConfigField::Rounds,
            ConfigField::Speed,
            ConfigField::Sound,
        ] {
            assert!(!s.input_enabled(field), "{field} should be locked");
        }
        assert!(s.input_enabled(ConfigField::MarkerSize));
        assert!(s.input_enabled(ConfigField::MarkerColor));

        // countdown + right cue + left cue + cycle restart
        assert_eq!(s.pending_timers(), 4);
    }

    #[test]
    fn countdown_ticks_once_per_second() {
        let mut s = session(10, 1, 5);
        s.start();
        s.advance_to(ms(999));
        assert_eq!(s.countdown().remaining_secs, 10);
        s.advance_to(secs(3));
        assert_eq!(s.countdown().remaining_secs, 7);
    }

    #[test]
    fn two_round_walkthrough() {
        // duration 5s, 2 rounds, speed 5 -> 4s cycle
        let mut s = session(5, 2, 5);
        s.start();
        assert_eq!(s.round_label(), "Round: 1 / 2");
        assert_eq!(s.time_label(), "Time: 5s");

        s.advance_to(secs(5));
        assert_eq!(s.state(), SessionState::RoundComplete);
        assert_eq!(s.countdown().remaining_secs, 0);
        assert_eq!(s.phase(), Phase::Center);
        assert_eq!(s.marker_position(), 0.0);
        assert_eq!(s.pending_timers(), 0);
        assert_eq!(s.pause_label(), "Continue");

        // Time spent waiting between rounds changes nothing
        s.advance_to(secs(60));
        assert_eq!(s.state(), SessionState::RoundComplete);

        s.pause(); // the toggle continues
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.round_label(), "Round: 2 / 2");
        assert_eq!(s.time_label(), "Time: 5s");

        s.advance_to(secs(65));
        assert_eq!(s.state(), SessionState::Ended);
        assert_eq!(s.pending_timers(), 0);
        for field in ConfigField::ALL {
            assert!(s.input_enabled(field));
        }
    }

    #[test]
    fn final_round_goes_straight_to_ended() {
        let mut s = session(2, 1, 5);
        s.start();
        s.advance_to(secs(2));
        assert_eq!(s.state(), SessionState::Ended);
        assert_eq!(s.rounds().current, 1);
    }

    #[test]
    fn pause_resume_preserves_countdown() {
        let mut s = session(10, 1, 5);
        s.start();
        s.advance_to(ms(3500));
        assert_eq!(s.countdown().remaining_secs, 7);

        s.pause();
        assert_eq!(s.state(), SessionState::Paused);
        assert_eq!(s.pending_timers(), 0);
        assert!(!s.is_animating());

        s.advance_to(secs(100));
        assert_eq!(s.countdown().remaining_secs, 7);

        s.pause(); // toggle again resumes
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.countdown().remaining_secs, 7);
        assert_eq!(s.rounds().current, 1);

        s.advance_to(secs(101));
        assert_eq!(s.countdown().remaining_secs, 6);
    }

    #[test]
    fn start_while_paused_resumes() {
        let mut s = session(10, 2, 5);
        s.start();
        s.advance_to(secs(4));
        s.pause();
        s.start();
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.countdown().remaining_secs, 6);
    }

    #[test]
    fn start_while_running_is_ignored() {
        let mut s = session(10, 2, 5);
        s.start();
        s.advance_to(secs(3));
        let pending = s.pending_timers();
        s.start();
        assert_eq!(s.countdown().remaining_secs, 7);
        assert_eq!(s.pending_timers(), pending);
    }

    #[test]
    fn pause_is_noop_when_idle_or_ended() {
        let mut s = session(1, 1, 5);
        s.pause();
        assert_eq!(s.state(), SessionState::Idle);
        s.start();
        s.advance_to(secs(1));
        assert_eq!(s.state(), SessionState::Ended);
        s.pause();
        assert_eq!(s.state(), SessionState::Ended);
    }

    #[test]
    fn reset_from_every_state_leaks_nothing() {
        let setups: [fn(&mut Session<Cues>); 4] = [
            |s| s.start(),
            |s| {
                s.start();
                s.pause();
            },
            |s| {
                s.start();
                s.advance_to(secs(3));
            },
            |s| {
                s.start();
                s.advance_to(secs(3));
                s.pause();
                s.advance_to(secs(20));
                s.pause();
                s.advance_to(secs(23));
            },
        ];
        for setup in setups {
            let mut s = session(3, 2, 5);
            setup(&mut s);
            s.reset();
            assert_eq!(s.state(), SessionState::Idle);
            assert_eq!(s.rounds(), counter(0, 2));
            assert_eq!(s.countdown().remaining_secs, 3);
            assert_eq!(s.pending_timers(), 0);
            assert!(!s.countdown_active());
            assert!(!s.is_animating());
        }
    }

    #[test]
    fn ended_start_is_fresh() {
        let mut s = session(1, 1, 5);
        s.start();
        s.advance_to(secs(1));
        assert_eq!(s.state(), SessionState::Ended);

        s.start();
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.rounds().current, 1);
        assert_eq!(s.countdown().remaining_secs, 1);
    }

    #[test]
    fn cues_follow_cycle_and_stop_on_pause() {
        let mut s = session(60, 1, 5); // 4s cycle
        s.start();
        s.advance_to(secs(8));
        assert_eq!(
            s.sink().0,
            vec![Pan::Right, Pan::Left, Pan::Right, Pan::Left]
        );

        s.advance_to(ms(8500));
        s.pause();
        s.advance_to(secs(30));
        assert_eq!(s.sink().0.len(), 4, "no cue fires while paused");
    }

    #[test]
    fn round_complete_cancels_pending_cue() {
        // 3s round, 6s cycle: the left cue at 4.5s must never fire
        let mut s = session(3, 2, 1);
        s.start();
        s.advance_to(secs(10));
        assert_eq!(s.sink().0, vec![Pan::Right]);
        assert_eq!(s.state(), SessionState::RoundComplete);
    }

    #[test]
    fn edits_locked_while_active() {
        let mut s = session(10, 2, 5);
        s.start();
        assert!(!s.edit(ConfigField::Duration, "99"));
        assert!(!s.adjust(ConfigField::Speed, 1, &[]));
        assert!(s.edit(ConfigField::MarkerColor, "green"));
        assert_eq!(s.config().duration_secs, 10);
        assert_eq!(s.config().marker_color, "green");

        s.pause();
        assert!(
            !s.edit(ConfigField::Rounds, "9"),
            "paused still counts as active"
        );
    }

    #[test]
    fn idle_edits_refresh_display_and_next_start_uses_them() {
        let mut s = session(10, 2, 5);
        assert!(s.edit(ConfigField::Duration, "20"));
        assert!(s.edit(ConfigField::Rounds, "4"));
        assert!(s.edit(ConfigField::Speed, "10"));
        assert_eq!(s.time_label(), "Time: 20s");
        assert_eq!(s.round_label(), "Round: 0 / 4");

        s.start();
        assert_eq!(s.snapshot().speed_level, 10);
        assert_eq!(s.rounds().total, 4);
    }

    #[test]
    fn space_bar_toggle_semantics() {
        let mut s = session(2, 2, 5);
        s.start_or_toggle();
        assert_matches!(s.state(), SessionState::Running);
        s.start_or_toggle();
        assert_matches!(s.state(), SessionState::Paused);
        s.start_or_toggle();
        assert_matches!(s.state(), SessionState::Running);
        s.advance_to(secs(2));
        assert_matches!(s.state(), SessionState::RoundComplete);
        s.start_or_toggle();
        assert_matches!(s.state(), SessionState::Running);
        assert_eq!(s.rounds().current, 2);
    }

    #[test]
    fn at_most_one_countdown_and_cycle() {
        let mut s = session(30, 3, 5);
        s.start();
        for i in 0..10 {
            s.pause();
            s.advance_to(secs(i));
        }
        assert!(s.pending_timers() <= 4);
        s.reset();
        assert_eq!(s.pending_timers(), 0);
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::RoundComplete.to_string(), "Round complete");
        assert_eq!(SessionState::Running.to_string(), "Running");
    }
}
