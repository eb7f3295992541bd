//! Spawn, advance and retire the entities of one minigame.

use std::collections::{BTreeMap, BTreeSet};

use party_shared::config::MatchTuning;
use party_shared::protocol::{ArrowKind, Feedback, GameMode};
use party_shared::vec3::{add, distance, planar_distance, vec3, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::entity::{Entity, EntityBody, EntityId};
use crate::input::PlayerIndex;
use crate::timer::Timers;

/// Anchors used when a roster cannot provide two.
const FALLBACK_ANCHORS: [Vec3; 2] = [
    Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    },
    Vec3 {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimVariant {
    Coins,
    Spikes,
    Arrows,
}

impl SimVariant {
    pub fn for_mode(mode: GameMode) -> Option<Self> {
        match mode {
            GameMode::CoinCascade => Some(SimVariant::Coins),
            GameMode::BulletBarrage => Some(SimVariant::Spikes),
            GameMode::DiscoDash => Some(SimVariant::Arrows),
            GameMode::BeatTap => None,
        }
    }
}

/// A score/life change for one player, caused by one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEvent {
    pub player: PlayerIndex,
    pub score_delta: i64,
    pub life_delta: i64,
    pub feedback: Feedback,
    pub entity: Option<EntityId>,
}

/// Strictly alternating spawn anchors.
#[derive(Debug, Clone)]
struct AnchorCycle {
    anchors: Vec<Vec3>,
    next: usize,
}

impl AnchorCycle {
    fn new(anchors: &[Vec3]) -> Self {
        let anchors = if anchors.len() < 2 {
            FALLBACK_ANCHORS.to_vec()
        } else {
            anchors.to_vec()
        };
        Self { anchors, next: 0 }
    }

    /// An unusable anchor skips the spawn without advancing the cycle.
    fn take(&mut self) -> Option<Vec3> {
        let anchor = *self.anchors.get(self.next)?;
        if !anchor.is_finite() {
            return None;
        }
        self.next = (self.next + 1) % self.anchors.len();
        Some(anchor)
    }
}

#[derive(Debug, Clone, Copy)]
enum SimTimer {
    Spawn,
}

pub struct EntitySimulator {
    variant: SimVariant,
    tuning: MatchTuning,
    rng: ChaCha8Rng,
    entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
    timers: Timers<SimTimer>,
    anchors: AnchorCycle,
    roster_size: usize,
}

impl EntitySimulator {
    pub fn new(
        variant: SimVariant,
        tuning: MatchTuning,
        anchors: &[Vec3],
        roster_size: usize,
        seed: u64,
        start_ms: u64,
    ) -> Self {
        let period = match variant {
            SimVariant::Coins => tuning.coins.spawn_period_ms,
            SimVariant::Spikes => tuning.spikes.spawn_period_ms,
            SimVariant::Arrows => tuning.arrows.spawn_period_ms,
        } as u64;
        let mut timers = Timers::new();
        timers.schedule_every(start_ms + period, period, SimTimer::Spawn);

        Self {
            variant,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            entities: BTreeMap::new(),
            next_id: 1,
            timers,
            anchors: AnchorCycle::new(anchors),
            roster_size,
        }
    }

    /// Run every spawn due at or before `now_ms`, each at its own deadline.
    pub fn fire_timers(&mut self, now_ms: u64) {
        while let Some((deadline, timer)) = self.timers.poll(now_ms) {
            match timer {
                SimTimer::Spawn => {
                    self.spawn(deadline);
                }
            }
        }
    }

    /// Create one entity for the current variant. Returns None when the anchor is unusable.
    pub fn spawn(&mut self, at_ms: u64) -> Option<EntityId> {
        let (position, body) = match self.variant {
            SimVariant::Coins => {
                let c = self.tuning.coins;
                let anchor = self.anchors.take()?;
                let jitter = self.rng.gen_range(-c.spawn_jitter..=c.spawn_jitter);
                let gravity = self.rng.gen_range(c.gravity_min..=c.gravity_max);
                (
                    vec3(anchor.x + jitter, anchor.y + c.spawn_height, anchor.z),
                    EntityBody::Coin {
                        gravity,
                        velocity: 0.0,
                    },
                )
            }
            SimVariant::Spikes => {
                let s = self.tuning.spikes;
                let speed = self.rng.gen_range(s.speed_min..=s.speed_max);
                (
                    vec3(s.spawn_x, s.lane_y, 0.0),
                    EntityBody::Spike {
                        speed,
                        scored: BTreeSet::new(),
                    },
                )
            }
            SimVariant::Arrows => {
                let a = self.tuning.arrows;
                let kind = ArrowKind::ALL[self.rng.gen_range(0..ArrowKind::ALL.len())];
                (
                    vec3(a.spawn_x, 0.0, 0.0),
                    EntityBody::Arrow {
                        kind,
                        speed: a.speed,
                        origin_x: a.spawn_x,
                        missed: false,
                        hit_by: BTreeSet::new(),
                    },
                )
            }
        };

        let id = self.next_id;
        self.next_id += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                position,
                spawn_time_ms: at_ms,
                body,
            },
        );
        Some(id)
    }

    /// Advance every entity to `now_ms`. `players` are tracked positions indexed by slot.
    ///
    /// An entity spawned inside this frame only moves for the time since its spawn.
    pub fn advance(&mut self, now_ms: u64, dt: f64, players: &[Vec3]) -> Vec<ScoreEvent> {
        let mut events = Vec::new();
        let mut retired = Vec::new();

        let coins = self.tuning.coins;
        let spikes = self.tuning.spikes;
        let arrows = self.tuning.arrows;
        let roster_size = self.roster_size;

        for entity in self.entities.values_mut() {
            let since_spawn = now_ms.saturating_sub(entity.spawn_time_ms) as f64 / 1000.0;
            let step = dt.min(since_spawn).max(0.0);
            let id = entity.id;

            match &mut entity.body {
                EntityBody::Coin { gravity, velocity } => {
                    *velocity -= *gravity * step;
                    entity.position.y += *velocity * step;

                    let collector = players
                        .iter()
                        .position(|p| distance(entity.position, *p) < coins.collect_radius);
                    if let Some(i) = collector {
                        events.push(ScoreEvent {
                            player: PlayerIndex::new(i),
                            score_delta: 1,
                            life_delta: 0,
                            feedback: Feedback::Collected,
                            entity: Some(id),
                        });
                        retired.push(id);
                    } else if entity.position.y <= coins.ground_y {
                        retired.push(id);
                    }
                }
                EntityBody::Spike { speed, scored } => {
                    entity.position.x -= *speed * step;
                    let hit_point = add(entity.position, vec3(0.0, spikes.hit_offset_y, 0.0));

                    for (i, p) in players.iter().enumerate() {
                        let player = PlayerIndex::new(i);
                        if scored.contains(&player) {
                            continue;
                        }
                        if planar_distance(hit_point, *p) < spikes.hit_radius {
                            scored.insert(player);
                            events.push(ScoreEvent {
                                player,
                                score_delta: -spikes.collision_penalty,
                                life_delta: -1,
                                feedback: Feedback::Hit,
                                entity: Some(id),
                            });
                        } else if entity.position.x < p.x - spikes.pass_margin {
                            scored.insert(player);
                            events.push(ScoreEvent {
                                player,
                                score_delta: spikes.dodge_reward,
                                life_delta: 0,
                                feedback: Feedback::Dodged,
                                entity: Some(id),
                            });
                        }
                    }
                    if entity.position.x < spikes.offscreen_x {
                        retired.push(id);
                    }
                }
                EntityBody::Arrow {
                    speed,
                    origin_x,
                    missed,
                    hit_by,
                    ..
                } => {
                    entity.position.x = *origin_x - *speed * since_spawn;

                    if !*missed && entity.position.x < arrows.target_x - arrows.hit_window {
                        *missed = true;
                        for i in 0..roster_size {
                            let player = PlayerIndex::new(i);
                            if !hit_by.contains(&player) {
                                events.push(ScoreEvent {
                                    player,
                                    score_delta: -arrows.miss_penalty,
                                    life_delta: 0,
                                    feedback: Feedback::Miss,
                                    entity: Some(id),
                                });
                            }
                        }
                    }
                    if entity.position.x <= arrows.despawn_x {
                        retired.push(id);
                    }
                }
            }
        }

        for id in retired {
            self.entities.remove(&id);
        }
        events
    }

    /// Judge an arrow press made at `at_ms`. Picks the closest live candidate
    /// of the pressed kind; equal distances go to the older arrow.
    pub fn try_hit(&mut self, player: PlayerIndex, kind: ArrowKind, at_ms: u64) -> Option<ScoreEvent> {
        let a = self.tuning.arrows;
        let mut best: Option<(EntityId, f64)> = None;

        for entity in self.entities.values() {
            let EntityBody::Arrow {
                kind: arrow_kind,
                missed,
                hit_by,
                ..
            } = &entity.body
            else {
                continue;
            };
            if *arrow_kind != kind || *missed || hit_by.contains(&player) {
                continue;
            }
            let Some(x) = entity.arrow_x_at(at_ms) else {
                continue;
            };
            let offset = (x - a.target_x).abs();
            if offset >= a.hit_window {
                continue;
            }
            if best.map_or(true, |(_, d)| offset < d) {
                best = Some((entity.id, offset));
            }
        }

        let (id, offset) = best?;
        let (feedback, points) = if offset <= a.perfect_window {
            (Feedback::Perfect, a.perfect_points)
        } else {
            (Feedback::Good, a.good_points)
        };

        let done = match self.entities.get_mut(&id).map(|e| &mut e.body) {
            Some(EntityBody::Arrow { hit_by, .. }) => {
                hit_by.insert(player);
                hit_by.len() >= self.roster_size
            }
            _ => false,
        };
        if done {
            self.entities.remove(&id);
        }

        Some(ScoreEvent {
            player,
            score_delta: points,
            life_delta: 0,
            feedback,
            entity: Some(id),
        })
    }

    /// Like [`try_hit`](Self::try_hit), but a press with no candidate costs the
    /// presser the miss penalty.
    pub fn judge_press(&mut self, player: PlayerIndex, kind: ArrowKind, at_ms: u64) -> ScoreEvent {
        self.try_hit(player, kind, at_ms).unwrap_or(ScoreEvent {
            player,
            score_delta: -self.tuning.arrows.miss_penalty,
            life_delta: 0,
            feedback: Feedback::Miss,
            entity: None,
        })
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Stop spawning and drop every entity.
    pub fn shutdown(&mut self) {
        self.timers.shutdown();
        self.entities.clear();
    }
}
