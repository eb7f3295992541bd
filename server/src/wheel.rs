use party_shared::config::WheelTuning;
use party_shared::protocol::{GameMode, Modifier, WheelPhase, WheelStateMsg};

/// Wheel faces, clockwise from 0 degrees.
pub const SEGMENTS: [Modifier; 9] = [
    Modifier::SpeedUp,
    Modifier::None,
    Modifier::None,
    Modifier::None,
    Modifier::SpeedUp,
    Modifier::None,
    Modifier::None,
    Modifier::None,
    Modifier::None,
];

pub const SEGMENT_WIDTH_DEG: f64 = 360.0 / SEGMENTS.len() as f64;

/// Segment under the pointer for a wheel resting at `angle_deg`.
pub fn segment_index(angle_deg: f64, pointer_deg: f64) -> usize {
    let relative = (pointer_deg - angle_deg).rem_euclid(360.0);
    ((relative / SEGMENT_WIDTH_DEG).floor() as usize).min(SEGMENTS.len() - 1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WheelState {
    Idle,
    Spinning { stopping: bool },
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelOutcome {
    Started,
    StopRequested,
    Committed(Modifier),
    Ignored,
}

/// Press-driven modifier selector: Idle -> Spinning -> Settled -> Idle.
#[derive(Debug, Clone)]
pub struct ModifierWheel {
    tuning: WheelTuning,
    state: WheelState,
    angle: f64,
    velocity: f64,
    selected: Option<Modifier>,
    presses: u32,
}

impl ModifierWheel {
    pub fn new(tuning: WheelTuning) -> Self {
        Self {
            tuning,
            state: WheelState::Idle,
            angle: 0.0,
            velocity: 0.0,
            selected: None,
            presses: 0,
        }
    }

    /// One controller press. The counter grows until the cycle completes.
    pub fn press(&mut self) -> WheelOutcome {
        self.presses += 1;
        match self.state {
            WheelState::Idle if self.selected.is_none() => {
                self.velocity = self.tuning.spin_velocity;
                self.state = WheelState::Spinning { stopping: false };
                WheelOutcome::Started
            }
            WheelState::Idle => WheelOutcome::Ignored,
            WheelState::Spinning { stopping: false } => {
                self.state = WheelState::Spinning { stopping: true };
                WheelOutcome::StopRequested
            }
            WheelState::Spinning { stopping: true } => WheelOutcome::Ignored,
            WheelState::Settled => match self.selected.take() {
                Some(modifier) => {
                    self.presses = 0;
                    self.state = WheelState::Idle;
                    WheelOutcome::Committed(modifier)
                }
                None => WheelOutcome::Ignored,
            },
        }
    }

    /// Keyboard fallback: only brakes a spinning wheel.
    pub fn request_stop(&mut self) -> WheelOutcome {
        match self.state {
            WheelState::Spinning { stopping: false } => {
                self.state = WheelState::Spinning { stopping: true };
                WheelOutcome::StopRequested
            }
            _ => WheelOutcome::Ignored,
        }
    }

    /// One animation tick. Returns the modifier on the tick the wheel settles.
    pub fn tick(&mut self) -> Option<Modifier> {
        let WheelState::Spinning { stopping } = self.state else {
            return None;
        };
        self.angle = (self.angle + self.velocity).rem_euclid(360.0);
        if stopping {
            self.velocity *= self.tuning.decay;
            if self.velocity < self.tuning.settle_below {
                self.velocity = 0.0;
                self.state = WheelState::Settled;
                let modifier = SEGMENTS[segment_index(self.angle, self.tuning.pointer_deg)];
                self.selected = Some(modifier);
                return Some(modifier);
            }
        }
        None
    }

    pub fn phase(&self) -> WheelPhase {
        match self.state {
            WheelState::Idle => WheelPhase::Idle,
            WheelState::Spinning { .. } => WheelPhase::Spinning,
            WheelState::Settled => WheelPhase::Settled,
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn selected(&self) -> Option<Modifier> {
        self.selected
    }

    pub fn presses(&self) -> u32 {
        self.presses
    }

    pub fn to_wire(&self, mode: GameMode) -> WheelStateMsg {
        WheelStateMsg {
            mode,
            state: self.phase(),
            angle: party_shared::protocol::round4(self.angle),
            selected: self.selected,
            presses: self.presses,
        }
    }
}
