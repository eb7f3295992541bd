//! Rhythm clock for "Beat Tap".
//!
//! Every beat boundary opens one cycle. The ideal hit lands half an interval
//! after the boundary; the first hit in a cycle is judged and the rest are
//! ignored. A cycle nobody hits resolves as a miss when its timer expires.

use party_shared::config::BeatTuning;
use party_shared::protocol::{BeatPhase, BeatWire, Feedback, Modifier};

use crate::timer::{TimerToken, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BeatTimer {
    Beat,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Judgment {
    pub feedback: Feedback,
    pub points: i64,
    pub offset_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatEvent {
    /// The cycle starting at `beat_ms` ended without a hit.
    Missed { beat_ms: u64 },
}

/// Grade a hit by its distance from the ideal instant.
pub fn judge(offset_ms: u64, tuning: &BeatTuning) -> Judgment {
    let (feedback, points) = if offset_ms <= tuning.perfect_window_ms as u64 {
        (Feedback::Perfect, tuning.perfect_points)
    } else if offset_ms <= tuning.good_window_ms as u64 {
        (Feedback::Good, tuning.good_points)
    } else {
        (Feedback::Miss, 0)
    };
    Judgment {
        feedback,
        points,
        offset_ms,
    }
}

pub struct BeatScheduler {
    tuning: BeatTuning,
    interval_ms: u64,
    last_beat_ms: u64,
    hit_this_beat: bool,
    missed_this_beat: bool,
    timers: Timers<BeatTimer>,
    miss_timer: Option<TimerToken>,
}

impl BeatScheduler {
    /// The match start is the first beat boundary.
    pub fn new(tuning: BeatTuning, modifier: Modifier, start_ms: u64) -> Self {
        let interval_ms = match modifier {
            Modifier::SpeedUp => tuning.speed_up_interval_ms,
            Modifier::None => tuning.interval_ms,
        } as u64;
        let mut scheduler = Self {
            tuning,
            interval_ms,
            last_beat_ms: start_ms,
            hit_this_beat: false,
            missed_this_beat: false,
            timers: Timers::new(),
            miss_timer: None,
        };
        scheduler.start_beat(start_ms);
        scheduler
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_beat_ms(&self) -> u64 {
        self.last_beat_ms
    }

    pub fn hit_this_beat(&self) -> bool {
        self.hit_this_beat
    }

    /// Open a new cycle. Any miss timer left from the previous cycle is cancelled first.
    fn start_beat(&mut self, at_ms: u64) {
        if let Some(token) = self.miss_timer.take() {
            self.timers.cancel(token);
        }
        self.last_beat_ms = at_ms;
        self.hit_this_beat = false;
        self.missed_this_beat = false;
        let deadline = at_ms + self.interval_ms;
        // Armed before the next beat so a shared deadline reports this cycle's miss first.
        self.miss_timer = Some(self.timers.schedule(deadline, BeatTimer::Miss));
        self.timers.schedule(deadline, BeatTimer::Beat);
    }

    /// Run every timer due at or before `now_ms`.
    pub fn fire_timers(&mut self, now_ms: u64) -> Vec<BeatEvent> {
        let mut events = Vec::new();
        while let Some((deadline, timer)) = self.timers.poll(now_ms) {
            match timer {
                BeatTimer::Miss => {
                    self.miss_timer = None;
                    if !self.hit_this_beat {
                        self.missed_this_beat = true;
                        events.push(BeatEvent::Missed {
                            beat_ms: self.last_beat_ms,
                        });
                    }
                }
                BeatTimer::Beat => self.start_beat(deadline),
            }
        }
        events
    }

    /// Judge a hit made at `at_ms`. Only the first hit of a cycle counts.
    pub fn hit(&mut self, at_ms: u64) -> Option<Judgment> {
        if !self.timers.is_live() || self.hit_this_beat || self.missed_this_beat {
            return None;
        }
        self.hit_this_beat = true;
        if let Some(token) = self.miss_timer.take() {
            self.timers.cancel(token);
        }
        let ideal = self.last_beat_ms + self.interval_ms / 2;
        Some(judge(at_ms.abs_diff(ideal), &self.tuning))
    }

    pub fn phase(&self, now_ms: u64) -> BeatPhase {
        if self.hit_this_beat || self.missed_this_beat {
            return BeatPhase::Resolved;
        }
        let ideal = self.last_beat_ms + self.interval_ms / 2;
        if now_ms.abs_diff(ideal) <= self.tuning.good_window_ms as u64 {
            BeatPhase::WindowOpen
        } else {
            BeatPhase::AwaitingBeat
        }
    }

    pub fn to_wire(&self, now_ms: u64) -> BeatWire {
        BeatWire {
            phase: self.phase(now_ms),
            last_beat_ms: self.last_beat_ms,
            interval_ms: self.interval_ms as u32,
            hit_this_beat: self.hit_this_beat,
        }
    }

    pub fn shutdown(&mut self) {
        self.timers.shutdown();
        self.miss_timer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> BeatScheduler {
        BeatScheduler::new(BeatTuning::default(), Modifier::None, 0)
    }

    #[test]
    fn judgment_bands() {
        let t = BeatTuning::default();
        assert_eq!(judge(0, &t).feedback, Feedback::Perfect);
        assert_eq!(judge(0, &t).points, 2);
        assert_eq!(judge(100, &t).feedback, Feedback::Perfect);
        assert_eq!(judge(150, &t).feedback, Feedback::Good);
        assert_eq!(judge(150, &t).points, 1);
        assert_eq!(judge(200, &t).feedback, Feedback::Good);
        assert_eq!(judge(500, &t).feedback, Feedback::Miss);
        assert_eq!(judge(500, &t).points, 0);
    }

    #[test]
    fn speed_up_shortens_interval() {
        let s = BeatScheduler::new(BeatTuning::default(), Modifier::SpeedUp, 0);
        assert_eq!(s.interval_ms(), 2000);
        assert_eq!(setup().interval_ms(), 3000);
    }

    #[test]
    fn hit_at_half_interval_is_perfect() {
        let mut s = setup();
        assert!(s.fire_timers(1500).is_empty());
        let j = s.hit(1500).unwrap();
        assert_eq!(j.feedback, Feedback::Perfect);
        assert_eq!(j.offset_ms, 0);
    }

    #[test]
    fn only_first_hit_per_cycle_counts() {
        let mut s = setup();
        assert!(s.hit(1450).is_some());
        assert!(s.hit(1500).is_none());
        // The judged hit cancelled the miss timer.
        assert!(s.fire_timers(3000).is_empty());
        // New cycle, new chance.
        let j = s.hit(4650).unwrap();
        assert_eq!(j.feedback, Feedback::Good);
    }

    #[test]
    fn unhit_cycle_reports_miss_then_restarts() {
        let mut s = setup();
        let events = s.fire_timers(3000);
        assert_eq!(events, vec![BeatEvent::Missed { beat_ms: 0 }]);
        assert_eq!(s.last_beat_ms(), 3000);
        assert!(!s.hit_this_beat());
        assert_eq!(s.phase(3000), BeatPhase::AwaitingBeat);
    }

    #[test]
    fn several_missed_cycles_in_one_poll() {
        let mut s = setup();
        let events = s.fire_timers(9000);
        assert_eq!(
            events,
            vec![
                BeatEvent::Missed { beat_ms: 0 },
                BeatEvent::Missed { beat_ms: 3000 },
                BeatEvent::Missed { beat_ms: 6000 },
            ]
        );
        assert_eq!(s.last_beat_ms(), 9000);
    }

    #[test]
    fn phase_tracks_window() {
        let mut s = setup();
        assert_eq!(s.phase(0), BeatPhase::AwaitingBeat);
        assert_eq!(s.phase(1300), BeatPhase::WindowOpen);
        assert_eq!(s.phase(1700), BeatPhase::WindowOpen);
        assert_eq!(s.phase(1701), BeatPhase::AwaitingBeat);
        s.hit(1500);
        assert_eq!(s.phase(1600), BeatPhase::Resolved);
    }

    #[test]
    fn shutdown_silences_everything() {
        let mut s = setup();
        s.shutdown();
        assert!(s.fire_timers(100_000).is_empty());
        assert!(s.hit(1500).is_none());
    }
}
