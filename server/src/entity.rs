use std::collections::BTreeSet;

use party_shared::protocol::{round4, ArrowKind, EntityKind, EntityWire};
use party_shared::vec3::Vec3;

use crate::input::PlayerIndex;

/// Monotonic within a match, never reused.
pub type EntityId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum EntityBody {
    Coin {
        /// Sampled once at spawn
        gravity: f64,
        /// Vertical velocity, negative while falling
        velocity: f64,
    },
    Spike {
        speed: f64,
        scored: BTreeSet<PlayerIndex>,
    },
    Arrow {
        kind: ArrowKind,
        speed: f64,
        origin_x: f64,
        /// Set once when the arrow leaves the hit window unplayed, never cleared
        missed: bool,
        hit_by: BTreeSet<PlayerIndex>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec3,
    pub spawn_time_ms: u64,
    pub body: EntityBody,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self.body {
            EntityBody::Coin { .. } => EntityKind::Coin,
            EntityBody::Spike { .. } => EntityKind::Spike,
            EntityBody::Arrow { .. } => EntityKind::Arrow,
        }
    }

    /// Arrow x evaluated at an arbitrary instant. Arrows move at constant speed,
    /// so this agrees with per-frame integration.
    pub fn arrow_x_at(&self, at_ms: u64) -> Option<f64> {
        match self.body {
            EntityBody::Arrow {
                speed, origin_x, ..
            } => {
                let elapsed = at_ms.saturating_sub(self.spawn_time_ms) as f64 / 1000.0;
                Some(origin_x - speed * elapsed)
            }
            _ => None,
        }
    }

    pub fn to_wire(&self) -> EntityWire {
        let (arrow, missed) = match &self.body {
            EntityBody::Arrow { kind, missed, .. } => (Some(*kind), *missed),
            _ => (None, false),
        };
        EntityWire {
            id: self.id,
            kind: self.kind(),
            pos: [
                round4(self.position.x),
                round4(self.position.y),
                round4(self.position.z),
            ],
            arrow,
            missed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use party_shared::vec3::vec3;

    fn arrow(spawn_time_ms: u64) -> Entity {
        Entity {
            id: 9,
            position: vec3(1280.0, 0.0, 0.0),
            spawn_time_ms,
            body: EntityBody::Arrow {
                kind: ArrowKind::Button,
                speed: 150.0,
                origin_x: 1280.0,
                missed: false,
                hit_by: BTreeSet::new(),
            },
        }
    }

    #[test]
    fn arrow_position_is_analytic() {
        let a = arrow(1000);
        assert_eq!(a.arrow_x_at(1000), Some(1280.0));
        assert_eq!(a.arrow_x_at(3000), Some(980.0));
        // Before spawn the arrow sits at its origin.
        assert_eq!(a.arrow_x_at(0), Some(1280.0));
    }

    #[test]
    fn coin_has_no_arrow_position() {
        let coin = Entity {
            id: 1,
            position: vec3(0.0, 1.0, 0.0),
            spawn_time_ms: 0,
            body: EntityBody::Coin {
                gravity: 0.5,
                velocity: 0.0,
            },
        };
        assert_eq!(coin.arrow_x_at(500), None);
        assert_eq!(coin.kind(), EntityKind::Coin);
    }

    #[test]
    fn wire_form_carries_arrow_fields() {
        let wire = arrow(0).to_wire();
        assert_eq!(wire.id, 9);
        assert_eq!(wire.kind, EntityKind::Arrow);
        assert_eq!(wire.arrow, Some(ArrowKind::Button));
        assert!(!wire.missed);
    }
}
