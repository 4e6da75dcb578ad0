//! Attempt lifecycle and the anti-cheat detectors it arms.
//!
//! [`Session`] is the only owner of attempt state. It arms the input monitor
//! and the challenge scheduler exactly while it is [`SessionState::Active`],
//! and records at most one [`Disqualification`] per attempt: the first call
//! to [`Session::fail`] wins and every later one is a no-op.

pub mod challenge;
pub mod clock;
pub mod monitor;
mod timer;

use std::fmt;
use std::time::{Duration, Instant};

use engine::InputEvent;
use rand::rngs::SmallRng;
use thiserror::Error;
use tracing::{debug, info};

pub use challenge::{Challenge, ChallengeConfig, MAX_CHECK_INTERVAL};
pub use clock::{format_elapsed, format_minutes_seconds, Stopwatch};
pub use monitor::MonitorConfig;

use challenge::{ChallengeEvent, ChallengeScheduler};
use monitor::{InputMonitor, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Disqualified,
    Paused,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Disqualified => "disqualified",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisqualificationReason {
    PointerMoved,
    KeyPressed,
    Scrolled,
    TabHidden,
    WindowBlurred,
    ChallengeTimedOut,
    Other(String),
}

impl DisqualificationReason {
    /// Stable identifier for logs.
    pub fn code(&self) -> &str {
        match self {
            Self::PointerMoved => "pointer_moved",
            Self::KeyPressed => "key_pressed",
            Self::Scrolled => "scrolled",
            Self::TabHidden => "tab_hidden",
            Self::WindowBlurred => "window_blurred",
            Self::ChallengeTimedOut => "challenge_timed_out",
            Self::Other(_) => "other",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::PointerMoved => "You moved the mouse!",
            Self::KeyPressed => "You pressed a key!",
            Self::Scrolled => "You scrolled!",
            Self::TabHidden => "You looked away! (window hidden)",
            Self::WindowBlurred => "You switched to another window!",
            Self::ChallengeTimedOut => "You missed the survival check! (away from keyboard)",
            Self::Other(message) => message,
        }
    }
}

impl fmt::Display for DisqualificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of an attempt: why it ended and the score it froze at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disqualification {
    pub reason: DisqualificationReason,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
        })
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot {action} a session that is {from}")]
pub struct TransitionError {
    pub from: SessionState,
    pub action: SessionAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Paused { elapsed: Duration },
    Resumed { elapsed: Duration },
    ChallengeOpened { remaining_seconds: u32 },
    ChallengeCountdown { remaining_seconds: u32 },
    ChallengeCleared,
    Disqualified(Disqualification),
    Reset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionConfig {
    pub monitor: MonitorConfig,
    pub challenge: ChallengeConfig,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    stopwatch: Stopwatch,
    disqualification: Option<Disqualification>,
    monitor: InputMonitor,
    scheduler: ChallengeScheduler,
    events: Vec<SessionEvent>,
    challenge_scratch: Vec<ChallengeEvent>,
}

impl Session {
    pub fn new(config: SessionConfig, rng: SmallRng) -> Self {
        Self {
            state: SessionState::Idle,
            stopwatch: Stopwatch::default(),
            disqualification: None,
            monitor: InputMonitor::new(config.monitor),
            scheduler: ChallengeScheduler::new(config.challenge, rng),
            events: Vec::new(),
            challenge_scratch: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.stopwatch.elapsed(now)
    }

    pub fn disqualification(&self) -> Option<&Disqualification> {
        self.disqualification.as_ref()
    }

    pub fn open_challenge(&self) -> Option<Challenge> {
        self.scheduler.open_challenge()
    }

    /// True while the detectors are attached. Always equal to
    /// `state() == Active`.
    pub fn is_armed(&self) -> bool {
        self.monitor.is_armed() && self.scheduler.is_armed()
    }

    pub fn start(&mut self, now: Instant) -> Result<(), TransitionError> {
        if !matches!(
            self.state,
            SessionState::Idle | SessionState::Disqualified
        ) {
            return Err(self.reject(SessionAction::Start));
        }

        self.disqualification = None;
        self.stopwatch.start(now);
        self.arm(now);
        self.state = SessionState::Active;
        self.events.push(SessionEvent::Started);
        info!("session_started");
        Ok(())
    }

    /// Ends the attempt with `reason`, freezing the score at `now`. Returns
    /// false, and changes nothing, unless the session is active.
    pub fn fail(&mut self, reason: DisqualificationReason, now: Instant) -> bool {
        if self.state != SessionState::Active {
            debug!(
                state = %self.state,
                reason = reason.code(),
                "fail_ignored"
            );
            return false;
        }

        self.disarm();
        let elapsed = self.stopwatch.freeze(now);
        info!(
            reason = reason.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "session_disqualified"
        );
        let disqualification = Disqualification { reason, elapsed };
        self.events
            .push(SessionEvent::Disqualified(disqualification.clone()));
        self.disqualification = Some(disqualification);
        self.state = SessionState::Disqualified;
        true
    }

    pub fn reset(&mut self) {
        self.disarm();
        self.stopwatch.clear();
        self.disqualification = None;
        self.state = SessionState::Idle;
        self.events.push(SessionEvent::Reset);
        debug!("session_reset");
    }

    pub fn pause(&mut self, now: Instant) -> Result<(), TransitionError> {
        if self.state != SessionState::Active {
            return Err(self.reject(SessionAction::Pause));
        }

        self.disarm();
        let elapsed = self.stopwatch.freeze(now);
        self.state = SessionState::Paused;
        self.events.push(SessionEvent::Paused { elapsed });
        info!(elapsed_ms = elapsed.as_millis() as u64, "session_paused");
        Ok(())
    }

    /// Continues from the paused value; the time spent paused is not scored.
    /// The detectors re-arm fresh: a new pointer reference and a newly rolled
    /// challenge interval.
    pub fn resume(&mut self, now: Instant) -> Result<(), TransitionError> {
        if self.state != SessionState::Paused {
            return Err(self.reject(SessionAction::Resume));
        }

        self.stopwatch.resume(now);
        self.arm(now);
        self.state = SessionState::Active;
        let elapsed = self.stopwatch.elapsed(now);
        self.events.push(SessionEvent::Resumed { elapsed });
        info!(elapsed_ms = elapsed.as_millis() as u64, "session_resumed");
        Ok(())
    }

    /// Routes one input event through the monitor.
    ///
    /// Timers due at or before `now` are processed first, so a challenge
    /// that expired before this event was delivered wins the tie.
    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) {
        self.poll(now);
        match self.monitor.observe(event) {
            Verdict::Ignore => {}
            Verdict::Acknowledge => {
                self.acknowledge(now);
            }
            Verdict::Violation(reason) => {
                self.fail(reason, now);
            }
        }
    }

    /// The explicit "still here" action. Returns true when it closed an open
    /// challenge; with nothing open it does nothing.
    pub fn acknowledge(&mut self, now: Instant) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        match self.scheduler.acknowledge(now) {
            Some(ChallengeEvent::Cleared { next_fire_at, .. }) => {
                info!(
                    next_in_ms = next_fire_at.saturating_duration_since(now).as_millis() as u64,
                    "challenge_cleared"
                );
                self.events.push(SessionEvent::ChallengeCleared);
                true
            }
            _ => false,
        }
    }

    /// Advances the challenge timers to `now`. An expiry disqualifies the
    /// session with the score frozen at the expiry instant.
    pub fn poll(&mut self, now: Instant) {
        if self.state != SessionState::Active {
            return;
        }

        let mut fired = std::mem::take(&mut self.challenge_scratch);
        self.scheduler.poll(now, &mut fired);
        for event in fired.drain(..) {
            match event {
                ChallengeEvent::Opened {
                    remaining_seconds, ..
                } => {
                    info!(remaining_seconds, "challenge_opened");
                    self.events
                        .push(SessionEvent::ChallengeOpened { remaining_seconds });
                }
                ChallengeEvent::Countdown {
                    remaining_seconds, ..
                } => {
                    debug!(remaining_seconds, "challenge_countdown");
                    self.events
                        .push(SessionEvent::ChallengeCountdown { remaining_seconds });
                }
                ChallengeEvent::Cleared { .. } => {}
                ChallengeEvent::Expired { at } => {
                    self.fail(DisqualificationReason::ChallengeTimedOut, at);
                }
            }
        }
        self.challenge_scratch = fired;
    }

    /// Display-tick value: the running elapsed time, or `None` when nothing
    /// needs to be redrawn continuously.
    pub fn frame(&self, now: Instant) -> Option<Duration> {
        (self.state == SessionState::Active).then(|| self.stopwatch.elapsed(now))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state != SessionState::Active {
            return None;
        }
        self.scheduler.next_deadline()
    }

    pub fn drain_events(&mut self, out: &mut Vec<SessionEvent>) {
        out.append(&mut self.events);
    }

    fn arm(&mut self, now: Instant) {
        self.monitor.arm();
        self.scheduler.arm(now);
    }

    fn disarm(&mut self) {
        self.monitor.disarm();
        self.scheduler.disarm();
    }

    fn reject(&self, action: SessionAction) -> TransitionError {
        let error = TransitionError {
            from: self.state,
            action,
        };
        debug!(error = %error, "transition_rejected");
        error
    }
}

#[cfg(test)]
mod tests {
    use engine::{Key, PointerPosition};
    use rand::SeedableRng;

    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    fn session_with(challenge: ChallengeConfig) -> Session {
        Session::new(
            SessionConfig {
                monitor: MonitorConfig::default(),
                challenge,
            },
            SmallRng::seed_from_u64(42),
        )
    }

    fn session() -> Session {
        session_with(ChallengeConfig::default())
    }

    fn fixed_challenge(seconds: u64) -> ChallengeConfig {
        ChallengeConfig {
            min_interval: Duration::from_secs(seconds),
            max_interval: Duration::from_secs(seconds),
            response_seconds: 5,
        }
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerPosition::new(x, y))
    }

    fn drained(session: &mut Session) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        session.drain_events(&mut out);
        out
    }

    #[test]
    fn new_session_is_idle_and_disarmed() {
        let session = session();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_armed());
        assert_eq!(session.elapsed(Instant::now()), Duration::ZERO);
        assert!(session.next_deadline().is_none());
    }

    #[test]
    fn start_arms_and_rejects_double_start() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start from idle");
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.is_armed());

        let error = session.start(base + SECOND).expect_err("already active");
        assert_eq!(
            error,
            TransitionError {
                from: SessionState::Active,
                action: SessionAction::Start
            }
        );
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.elapsed(base + SECOND), SECOND);
    }

    #[test]
    fn pointer_delta_at_two_seconds_disqualifies_with_frozen_score() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");
        session.handle_input(&moved(300.0, 200.0), base + Duration::from_millis(100));
        session.handle_input(&moved(320.0, 200.0), base + Duration::from_millis(2_000));

        assert_eq!(session.state(), SessionState::Disqualified);
        assert!(!session.is_armed());
        let disqualification = session.disqualification().expect("disqualified");
        assert_eq!(disqualification.reason, DisqualificationReason::PointerMoved);
        assert_eq!(disqualification.elapsed, Duration::from_millis(2_000));
        assert_eq!(
            session.elapsed(base + Duration::from_secs(30)),
            Duration::from_millis(2_000)
        );
    }

    #[test]
    fn sub_threshold_jitter_never_fails() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");
        session.handle_input(&moved(100.0, 100.0), base);
        session.handle_input(&moved(110.0, 110.0), base + SECOND);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn first_violation_wins_and_later_signals_are_ignored() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");

        let blur_at = base + Duration::from_secs(3);
        session.handle_input(&InputEvent::FocusChanged { focused: false }, blur_at);
        session.handle_input(&InputEvent::VisibilityChanged { hidden: true }, blur_at);
        assert!(!session.fail(DisqualificationReason::Scrolled, blur_at + SECOND));

        let disqualification = session.disqualification().expect("disqualified");
        assert_eq!(disqualification.reason, DisqualificationReason::WindowBlurred);
        assert_eq!(disqualification.elapsed, Duration::from_secs(3));
        let disqualified_events = drained(&mut session)
            .into_iter()
            .filter(|event| matches!(event, SessionEvent::Disqualified(_)))
            .count();
        assert_eq!(disqualified_events, 1);
    }

    #[test]
    fn first_pointer_sample_after_restart_does_not_fail() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");
        session.handle_input(&moved(10.0, 10.0), base);
        session.reset();

        session.start(base + SECOND).expect("restart");
        session.handle_input(&moved(800.0, 600.0), base + SECOND * 2);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn space_without_open_challenge_is_a_no_op() {
        let base = Instant::now();
        let mut session = session_with(fixed_challenge(30));
        session.start(base).expect("start");
        let deadline = session.next_deadline();

        session.handle_input(&InputEvent::KeyPressed(Key::Space), base + SECOND);
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.open_challenge().is_none());
        assert_eq!(session.next_deadline(), deadline);
    }

    #[test]
    fn other_keys_disqualify() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");
        session.handle_input(&InputEvent::KeyPressed(Key::Character('a')), base + SECOND);
        assert_eq!(
            session.disqualification().map(|d| d.reason.clone()),
            Some(DisqualificationReason::KeyPressed)
        );
    }

    #[test]
    fn unanswered_challenge_times_out_on_fifth_tick() {
        let base = Instant::now();
        let mut session = session_with(fixed_challenge(30));
        session.start(base).expect("start");
        let fire_at = base + Duration::from_secs(30);

        session.poll(fire_at);
        assert_eq!(
            session.open_challenge().map(|c| c.remaining_seconds),
            Some(5)
        );
        for tick in 1..=4u32 {
            session.poll(fire_at + SECOND * tick);
            assert_eq!(session.state(), SessionState::Active);
        }

        session.poll(fire_at + SECOND * 5);
        assert_eq!(session.state(), SessionState::Disqualified);
        assert!(session.open_challenge().is_none());
        let disqualification = session.disqualification().expect("disqualified");
        assert_eq!(
            disqualification.reason,
            DisqualificationReason::ChallengeTimedOut
        );
        assert_eq!(disqualification.elapsed, Duration::from_secs(35));
    }

    #[test]
    fn late_poll_freezes_score_at_expiry_instant() {
        let base = Instant::now();
        let mut session = session_with(fixed_challenge(30));
        session.start(base).expect("start");
        session.poll(base + Duration::from_secs(90));

        let disqualification = session.disqualification().expect("disqualified");
        assert_eq!(disqualification.elapsed, Duration::from_secs(35));
    }

    #[test]
    fn acknowledging_clears_and_reschedules_within_interval() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");
        let fire_at = session.next_deadline().expect("fire");
        session.poll(fire_at);
        assert!(session.open_challenge().is_some());

        let ack_at = fire_at + Duration::from_secs(3);
        session.handle_input(&InputEvent::KeyPressed(Key::Space), ack_at);
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.open_challenge().is_none());
        let next = session.next_deadline().expect("rescheduled");
        assert!(next >= ack_at + Duration::from_secs(30));
        assert!(next <= ack_at + Duration::from_secs(60));
        assert!(drained(&mut session).contains(&SessionEvent::ChallengeCleared));
    }

    #[test]
    fn pointer_press_acknowledges_challenge() {
        let base = Instant::now();
        let mut session = session_with(fixed_challenge(30));
        session.start(base).expect("start");
        session.poll(base + Duration::from_secs(30));

        session.handle_input(&InputEvent::PointerPressed, base + Duration::from_secs(31));
        assert!(session.open_challenge().is_none());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn expiry_before_input_wins_the_tie() {
        let base = Instant::now();
        let mut session = session_with(fixed_challenge(30));
        session.start(base).expect("start");
        session.poll(base + Duration::from_secs(30));

        session.handle_input(&InputEvent::Scrolled, base + Duration::from_secs(36));
        let disqualification = session.disqualification().expect("disqualified");
        assert_eq!(
            disqualification.reason,
            DisqualificationReason::ChallengeTimedOut
        );
    }

    #[test]
    fn pause_resume_excludes_paused_gap() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");

        session.pause(base + Duration::from_secs(10)).expect("pause");
        assert_eq!(session.state(), SessionState::Paused);
        assert!(!session.is_armed());
        assert!(session.frame(base + Duration::from_secs(20)).is_none());

        let resume_at = base + Duration::from_secs(500);
        session.resume(resume_at).expect("resume");
        assert!(session.is_armed());
        assert_eq!(
            session.elapsed(resume_at + Duration::from_secs(2)),
            Duration::from_secs(12)
        );
        assert!(session.disqualification().is_none());
    }

    #[test]
    fn pause_and_resume_reject_wrong_states() {
        let base = Instant::now();
        let mut session = session();
        assert_eq!(
            session.pause(base).map_err(|e| e.action),
            Err(SessionAction::Pause)
        );
        session.start(base).expect("start");
        assert_eq!(
            session.resume(base).map_err(|e| e.from),
            Err(SessionState::Active)
        );
    }

    #[test]
    fn paused_session_ignores_input_and_cannot_fail() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");
        session.pause(base + SECOND).expect("pause");

        session.handle_input(&InputEvent::Scrolled, base + SECOND * 2);
        assert!(!session.fail(DisqualificationReason::KeyPressed, base + SECOND * 2));
        assert_eq!(session.state(), SessionState::Paused);
    }

    #[test]
    fn restart_after_disqualification_clears_reason() {
        let base = Instant::now();
        let mut session = session();
        session.start(base).expect("start");
        session.fail(DisqualificationReason::Other("test".to_string()), base + SECOND);

        session.start(base + SECOND * 2).expect("restart");
        assert!(session.disqualification().is_none());
        assert_eq!(session.elapsed(base + SECOND * 3), SECOND);
    }

    #[test]
    fn reset_disarms_and_cancels_pending_challenge() {
        let base = Instant::now();
        let mut session = session_with(fixed_challenge(30));
        session.start(base).expect("start");
        session.poll(base + Duration::from_secs(30));
        session.reset();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_armed());
        assert!(session.open_challenge().is_none());
        assert!(session.next_deadline().is_none());
        session.poll(base + Duration::from_secs(600));
        assert!(session.disqualification().is_none());
    }

    #[test]
    fn frame_ticks_only_while_active() {
        let base = Instant::now();
        let mut session = session();
        assert!(session.frame(base).is_none());
        session.start(base).expect("start");
        assert_eq!(session.frame(base + SECOND), Some(SECOND));
        session.fail(DisqualificationReason::Scrolled, base + SECOND);
        assert!(session.frame(base + SECOND * 2).is_none());
    }

    #[test]
    fn events_are_drained_in_order() {
        let base = Instant::now();
        let mut session = session_with(fixed_challenge(30));
        session.start(base).expect("start");
        session.poll(base + Duration::from_secs(31));
        session.acknowledge(base + Duration::from_secs(31));
        session.reset();

        assert_eq!(
            drained(&mut session),
            vec![
                SessionEvent::Started,
                SessionEvent::ChallengeOpened {
                    remaining_seconds: 5
                },
                SessionEvent::ChallengeCountdown {
                    remaining_seconds: 4
                },
                SessionEvent::ChallengeCleared,
                SessionEvent::Reset,
            ]
        );
        assert!(drained(&mut session).is_empty());
    }
}
