use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::Rng;
use tracing::debug;

use super::timer::{Countdown, CountdownTick, Timer};

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Longest allowed gap between survival checks.
pub const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeConfig {
    pub min_interval: Duration,
    pub max_interval: Duration,
    pub response_seconds: u32,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(60),
            response_seconds: 5,
        }
    }
}

impl ChallengeConfig {
    /// Swaps an inverted interval range, caps both ends at
    /// [`MAX_CHECK_INTERVAL`] and lifts a zero response time to one.
    pub fn normalized(self) -> Self {
        let lower = self.min_interval.min(MAX_CHECK_INTERVAL);
        let upper = self.max_interval.min(MAX_CHECK_INTERVAL);
        let (min_interval, max_interval) = if lower > upper {
            (upper, lower)
        } else {
            (lower, upper)
        };
        Self {
            min_interval,
            max_interval,
            response_seconds: self.response_seconds.max(1),
        }
    }
}

/// Read-only view of the open survival check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub opened_at: Instant,
    pub remaining_seconds: u32,
    pub next_tick_at: Instant,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChallengeEvent {
    Opened { at: Instant, remaining_seconds: u32 },
    Countdown { at: Instant, remaining_seconds: u32 },
    Cleared { at: Instant, next_fire_at: Instant },
    Expired { at: Instant },
}

#[derive(Debug)]
struct OpenChallenge {
    opened_at: Instant,
    countdown: Countdown,
}

/// Timers held while armed. At most one of the two is set at a time.
#[derive(Debug, Default)]
struct ArmedSchedule {
    fire: Option<Timer>,
    open: Option<OpenChallenge>,
}

#[derive(Debug)]
pub(crate) struct ChallengeScheduler {
    config: ChallengeConfig,
    rng: SmallRng,
    armed: Option<ArmedSchedule>,
}

impl ChallengeScheduler {
    pub(crate) fn new(config: ChallengeConfig, rng: SmallRng) -> Self {
        Self {
            config: config.normalized(),
            rng,
            armed: None,
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub(crate) fn arm(&mut self, now: Instant) -> bool {
        if self.armed.is_some() {
            return false;
        }
        let fire = roll_fire_timer(&mut self.rng, &self.config, now);
        debug!(
            fire_in_ms = fire.deadline().saturating_duration_since(now).as_millis() as u64,
            "challenge_scheduled"
        );
        self.armed = Some(ArmedSchedule {
            fire: Some(fire),
            open: None,
        });
        true
    }

    /// Cancels both timers. An open challenge closes without an expiry.
    pub(crate) fn disarm(&mut self) -> bool {
        let Some(schedule) = self.armed.take() else {
            return false;
        };
        if let Some(open) = schedule.open {
            debug!(
                remaining_seconds = open.countdown.remaining(),
                "challenge_closed_on_disarm"
            );
        }
        true
    }

    pub(crate) fn open_challenge(&self) -> Option<Challenge> {
        let open = self.armed.as_ref()?.open.as_ref()?;
        let remaining = open.countdown.remaining();
        Some(Challenge {
            opened_at: open.opened_at,
            remaining_seconds: remaining,
            next_tick_at: open.countdown.next_tick(),
            deadline: open.countdown.next_tick() + COUNTDOWN_PERIOD * remaining.saturating_sub(1),
        })
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        let schedule = self.armed.as_ref()?;
        match (&schedule.open, &schedule.fire) {
            (Some(open), _) => Some(open.countdown.next_tick()),
            (None, Some(fire)) => Some(fire.deadline()),
            (None, None) => None,
        }
    }

    /// Closes the open challenge and re-rolls the fire timer from `now`.
    /// Returns `None` when nothing is open.
    pub(crate) fn acknowledge(&mut self, now: Instant) -> Option<ChallengeEvent> {
        let schedule = self.armed.as_mut()?;
        schedule.open.take()?;
        let fire = roll_fire_timer(&mut self.rng, &self.config, now);
        schedule.fire = Some(fire);
        Some(ChallengeEvent::Cleared {
            at: now,
            next_fire_at: fire.deadline(),
        })
    }

    /// Processes every timer due at `now` in deadline order. Stops after an
    /// expiry, leaving no timer set.
    pub(crate) fn poll(&mut self, now: Instant, out: &mut Vec<ChallengeEvent>) {
        let response_seconds = self.config.response_seconds;
        let Some(schedule) = self.armed.as_mut() else {
            return;
        };

        loop {
            if let Some(open) = schedule.open.as_mut() {
                match open.countdown.tick(now) {
                    None => return,
                    Some((at, CountdownTick::Remaining(remaining_seconds))) => {
                        out.push(ChallengeEvent::Countdown {
                            at,
                            remaining_seconds,
                        });
                    }
                    Some((at, CountdownTick::Expired)) => {
                        schedule.open = None;
                        schedule.fire = None;
                        out.push(ChallengeEvent::Expired { at });
                        return;
                    }
                }
                continue;
            }

            let Some(fire) = schedule.fire else {
                return;
            };
            if !fire.is_due(now) {
                return;
            }
            let at = fire.deadline();
            schedule.fire = None;
            schedule.open = Some(OpenChallenge {
                opened_at: at,
                countdown: Countdown::start(at, response_seconds, COUNTDOWN_PERIOD),
            });
            out.push(ChallengeEvent::Opened {
                at,
                remaining_seconds: response_seconds,
            });
        }
    }
}

fn roll_fire_timer(rng: &mut SmallRng, config: &ChallengeConfig, now: Instant) -> Timer {
    let min_ms = u64::try_from(config.min_interval.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(config.max_interval.as_millis()).unwrap_or(u64::MAX);
    let delay_ms = rng.gen_range(min_ms.min(max_ms)..=max_ms);
    Timer::after(now, Duration::from_millis(delay_ms))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    fn scheduler(config: ChallengeConfig) -> ChallengeScheduler {
        ChallengeScheduler::new(config, SmallRng::seed_from_u64(7))
    }

    fn fixed_interval(seconds: u64, response_seconds: u32) -> ChallengeConfig {
        ChallengeConfig {
            min_interval: Duration::from_secs(seconds),
            max_interval: Duration::from_secs(seconds),
            response_seconds,
        }
    }

    #[test]
    fn normalized_swaps_inverted_range_and_lifts_zero_response() {
        let config = ChallengeConfig {
            min_interval: Duration::from_secs(60),
            max_interval: Duration::from_secs(30),
            response_seconds: 0,
        }
        .normalized();
        assert_eq!(config.min_interval, Duration::from_secs(30));
        assert_eq!(config.max_interval, Duration::from_secs(60));
        assert_eq!(config.response_seconds, 1);
    }

    #[test]
    fn normalized_caps_huge_intervals() {
        let config = ChallengeConfig {
            min_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(18_446_744_073_709_552),
            response_seconds: 5,
        }
        .normalized();
        assert_eq!(config.min_interval, Duration::from_secs(30));
        assert_eq!(config.max_interval, MAX_CHECK_INTERVAL);
    }

    #[test]
    fn arming_with_huge_interval_schedules_within_cap() {
        let base = Instant::now();
        let mut scheduler = scheduler(ChallengeConfig {
            min_interval: Duration::from_secs(30),
            max_interval: Duration::MAX,
            response_seconds: 5,
        });
        scheduler.arm(base);
        let deadline = scheduler.next_deadline().expect("fire timer");
        assert!(deadline >= base + Duration::from_secs(30));
        assert!(deadline <= base + MAX_CHECK_INTERVAL);
    }

    #[test]
    fn arming_schedules_fire_within_interval() {
        let base = Instant::now();
        for seed in 0..50 {
            let mut scheduler =
                ChallengeScheduler::new(ChallengeConfig::default(), SmallRng::seed_from_u64(seed));
            scheduler.arm(base);
            let deadline = scheduler.next_deadline().expect("fire timer");
            assert!(deadline >= base + Duration::from_secs(30));
            assert!(deadline <= base + Duration::from_secs(60));
        }
    }

    #[test]
    fn fire_opens_challenge_anchored_at_deadline() {
        let base = Instant::now();
        let mut scheduler = scheduler(fixed_interval(30, 5));
        scheduler.arm(base);
        let mut events = Vec::new();

        scheduler.poll(base + Duration::from_secs(29), &mut events);
        assert!(events.is_empty());
        assert!(scheduler.open_challenge().is_none());

        scheduler.poll(base + Duration::from_millis(30_200), &mut events);
        let fire_at = base + Duration::from_secs(30);
        assert_eq!(
            events,
            vec![ChallengeEvent::Opened {
                at: fire_at,
                remaining_seconds: 5
            }]
        );
        let open = scheduler.open_challenge().expect("open challenge");
        assert_eq!(open.remaining_seconds, 5);
        assert_eq!(open.next_tick_at, fire_at + SECOND);
        assert_eq!(open.deadline, fire_at + SECOND * 5);
    }

    #[test]
    fn unanswered_challenge_expires_on_fifth_tick() {
        let base = Instant::now();
        let mut scheduler = scheduler(fixed_interval(30, 5));
        scheduler.arm(base);
        let fire_at = base + Duration::from_secs(30);
        let mut events = Vec::new();
        scheduler.poll(fire_at, &mut events);
        events.clear();

        for tick in 1..=4u32 {
            scheduler.poll(fire_at + SECOND * tick, &mut events);
        }
        assert_eq!(events.len(), 4);
        assert!(scheduler.open_challenge().is_some());

        scheduler.poll(fire_at + SECOND * 5, &mut events);
        assert_eq!(
            events.last(),
            Some(&ChallengeEvent::Expired {
                at: fire_at + SECOND * 5
            })
        );
        assert!(scheduler.open_challenge().is_none());
        assert!(scheduler.next_deadline().is_none());
    }

    #[test]
    fn late_poll_catches_up_and_stops_at_expiry() {
        let base = Instant::now();
        let mut scheduler = scheduler(fixed_interval(30, 5));
        scheduler.arm(base);
        let mut events = Vec::new();

        scheduler.poll(base + Duration::from_secs(600), &mut events);
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], ChallengeEvent::Opened { .. }));
        assert_eq!(
            events[5],
            ChallengeEvent::Expired {
                at: base + Duration::from_secs(35)
            }
        );
    }

    #[test]
    fn acknowledge_closes_and_rerolls_from_now() {
        let base = Instant::now();
        let mut scheduler = scheduler(ChallengeConfig {
            min_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(60),
            response_seconds: 5,
        });
        scheduler.arm(base);
        let mut events = Vec::new();
        let fire_at = scheduler.next_deadline().expect("fire");
        scheduler.poll(fire_at, &mut events);

        let ack_at = fire_at + Duration::from_millis(2_500);
        scheduler.poll(ack_at, &mut events);
        let cleared = scheduler.acknowledge(ack_at).expect("cleared");
        let ChallengeEvent::Cleared { next_fire_at, .. } = cleared else {
            panic!("expected cleared event, got {cleared:?}");
        };
        assert!(next_fire_at >= ack_at + Duration::from_secs(30));
        assert!(next_fire_at <= ack_at + Duration::from_secs(60));
        assert!(scheduler.open_challenge().is_none());
        assert_eq!(scheduler.next_deadline(), Some(next_fire_at));

        events.clear();
        scheduler.poll(ack_at + SECOND * 10, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn acknowledge_without_open_challenge_is_ignored() {
        let base = Instant::now();
        let mut scheduler = scheduler(fixed_interval(30, 5));
        scheduler.arm(base);
        let before = scheduler.next_deadline();

        assert_eq!(scheduler.acknowledge(base + SECOND), None);
        assert_eq!(scheduler.next_deadline(), before);
        assert!(scheduler.open_challenge().is_none());
    }

    #[test]
    fn disarm_cancels_timers_silently() {
        let base = Instant::now();
        let mut scheduler = scheduler(fixed_interval(30, 5));
        scheduler.arm(base);
        let mut events = Vec::new();
        scheduler.poll(base + Duration::from_secs(30), &mut events);
        events.clear();

        assert!(scheduler.disarm());
        assert!(!scheduler.disarm());
        scheduler.poll(base + Duration::from_secs(600), &mut events);
        assert!(events.is_empty());
        assert!(scheduler.next_deadline().is_none());
    }
}
