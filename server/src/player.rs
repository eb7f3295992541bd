use party_shared::config::AvatarTuning;
use party_shared::protocol::{InitMsg, Pose, MAX_PLAYERS};
use party_shared::vec3::{add, vec3, Vec3};

use crate::input::{IntentKind, PlayerIndex};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RosterError {
    #[error("roster needs at least one player")]
    Empty,
    #[error("roster of {0} exceeds the two supported slots")]
    TooMany(usize),
}

fn placeholder_name(slot: usize) -> String {
    format!("Player {}", slot + 1)
}

/// Players taking part in the next match, injected from the lobby.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new(names: Vec<String>) -> Result<Self, RosterError> {
        if names.is_empty() {
            return Err(RosterError::Empty);
        }
        if names.len() > MAX_PLAYERS {
            return Err(RosterError::TooMany(names.len()));
        }
        Ok(Self { names })
    }

    /// Missing names are filled with "Player N"; extra names are dropped.
    pub fn from_init(msg: &InitMsg) -> Result<Self, RosterError> {
        let count = msg.num_players as usize;
        if count == 0 {
            return Err(RosterError::Empty);
        }
        if count > MAX_PLAYERS {
            return Err(RosterError::TooMany(count));
        }
        let names = (0..count)
            .map(|i| match msg.names.get(i).map(|n| n.trim()) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => placeholder_name(i),
            })
            .collect();
        Self::new(names)
    }

    /// A full roster of "Player N" names.
    pub fn placeholder() -> Self {
        Self {
            names: (0..MAX_PLAYERS).map(placeholder_name).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Character model family. Decides which poses exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Hero,
    /// Ships without a right-facing pose; the left pose is mirrored instead.
    Rival,
}

impl Archetype {
    pub fn for_slot(index: PlayerIndex) -> Self {
        if index.get() == 0 {
            Archetype::Hero
        } else {
            Archetype::Rival
        }
    }

    /// Map a logical pose onto one this archetype can draw, plus a mirror flag.
    pub fn resolve(self, pose: Pose) -> (Pose, bool) {
        match (self, pose) {
            (Archetype::Rival, Pose::Right) => (Pose::Left, true),
            (_, pose) => (pose, false),
        }
    }
}

/// How much freedom an avatar has in the current minigame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementMode {
    Free,
    JumpOnly,
    /// Stands still; intents only change the pose.
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub feet: Vec3,
    pub pose: Pose,
    pub mirrored: bool,
}

/// Anything the match can drive and draw.
pub trait Avatar {
    fn apply_intent(&mut self, kind: IntentKind);
    fn advance(&mut self, dt: f64);
    fn render_state(&self) -> RenderState;
    /// Point used for collisions and collection.
    fn tracked_position(&self) -> Vec3;
}

/// Initial feet position of a slot: players are spread evenly across the stage.
pub fn slot_position(index: PlayerIndex, roster_size: usize, floor_y: f64) -> Vec3 {
    let spacing = 10.0 / roster_size.max(1) as f64;
    let x = (-3.0 + index.get() as f64 * spacing) * 0.3;
    vec3(x, floor_y, 0.0)
}

#[derive(Debug, Clone)]
pub struct PlayerAvatar {
    archetype: Archetype,
    mode: MovementMode,
    tuning: AvatarTuning,
    feet: Vec3,
    direction: f64,
    vy: f64,
    airborne: bool,
    held_pose: Pose,
}

impl PlayerAvatar {
    pub fn new(
        index: PlayerIndex,
        roster_size: usize,
        mode: MovementMode,
        tuning: AvatarTuning,
    ) -> Self {
        Self {
            archetype: Archetype::for_slot(index),
            mode,
            tuning,
            feet: slot_position(index, roster_size, tuning.floor_y),
            direction: 0.0,
            vy: 0.0,
            airborne: false,
            held_pose: Pose::Idle,
        }
    }

    #[cfg(test)]
    pub fn is_airborne(&self) -> bool {
        self.airborne
    }

    fn jump(&mut self) {
        if !self.airborne {
            self.airborne = true;
            self.vy = self.tuning.jump_speed;
        }
    }

    fn pose(&self) -> Pose {
        if self.mode == MovementMode::Fixed {
            return self.held_pose;
        }
        if self.airborne {
            Pose::Jump
        } else if self.direction < 0.0 {
            Pose::Left
        } else if self.direction > 0.0 {
            Pose::Right
        } else {
            Pose::Idle
        }
    }
}

impl Avatar for PlayerAvatar {
    fn apply_intent(&mut self, kind: IntentKind) {
        match self.mode {
            MovementMode::Fixed => {
                self.held_pose = match kind {
                    IntentKind::Left => Pose::Left,
                    IntentKind::Right => Pose::Right,
                    IntentKind::Jump | IntentKind::Hit => Pose::Jump,
                    IntentKind::Still | IntentKind::None => Pose::Idle,
                };
            }
            MovementMode::JumpOnly => {
                if kind == IntentKind::Jump {
                    self.jump();
                }
            }
            MovementMode::Free => match kind {
                IntentKind::Left => self.direction = -1.0,
                IntentKind::Right => self.direction = 1.0,
                IntentKind::Still | IntentKind::None => self.direction = 0.0,
                IntentKind::Jump => self.jump(),
                IntentKind::Hit => {}
            },
        }
    }

    fn advance(&mut self, dt: f64) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        let t = &self.tuning;
        if self.direction != 0.0 {
            let x = self.feet.x + self.direction * t.move_speed * dt;
            self.feet.x = x.clamp(t.stage_min_x, t.stage_max_x);
        }
        if self.airborne {
            self.vy -= t.gravity * dt;
            self.feet.y += self.vy * dt;
            if self.feet.y <= t.floor_y {
                self.feet.y = t.floor_y;
                self.vy = 0.0;
                self.airborne = false;
            }
        }
    }

    fn render_state(&self) -> RenderState {
        let (pose, mirrored) = self.archetype.resolve(self.pose());
        RenderState {
            feet: self.feet,
            pose,
            mirrored,
        }
    }

    fn tracked_position(&self) -> Vec3 {
        add(self.feet, vec3(0.0, self.tuning.body_offset_y, 0.0))
    }
}
