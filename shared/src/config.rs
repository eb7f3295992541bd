/// Falling-coin tuning ("Coin Cascade")
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct CoinTuning {
    pub spawn_period_ms: u32,
    /// Height above the anchor at which coins appear
    pub spawn_height: f64,
    /// Coins spawn within +-jitter of the anchor x
    pub spawn_jitter: f64,
    pub gravity_min: f64,
    pub gravity_max: f64,
    pub ground_y: f64,
    pub collect_radius: f64,
}

impl Default for CoinTuning {
    fn default() -> Self {
        Self {
            spawn_period_ms: 1000,
            spawn_height: 1.5,
            spawn_jitter: 0.4,
            gravity_min: 0.05,
            gravity_max: 1.0,
            ground_y: -0.65,
            collect_radius: 0.2,
        }
    }
}

/// Moving-spike tuning ("Bullet Barrage")
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct SpikeTuning {
    pub spawn_period_ms: u32,
    pub spawn_x: f64,
    /// Height the spikes roll along (the stage floor)
    pub lane_y: f64,
    pub speed_min: f64,
    pub speed_max: f64,
    /// Vertical offset from the spike origin to its hit point. Low enough that a
    /// standing body is inside the hit circle only by a hair, so a jump clears it.
    pub hit_offset_y: f64,
    pub hit_radius: f64,
    /// How far past a player the spike must travel before the dodge counts
    pub pass_margin: f64,
    pub offscreen_x: f64,
    pub lives: u32,
    #[ts(type = "number")]
    pub collision_penalty: i64,
    #[ts(type = "number")]
    pub dodge_reward: i64,
}

impl Default for SpikeTuning {
    fn default() -> Self {
        Self {
            spawn_period_ms: 2000,
            spawn_x: 2.5,
            lane_y: -0.7,
            speed_min: 0.4,
            speed_max: 1.0,
            hit_offset_y: 0.06,
            hit_radius: 0.3,
            pass_margin: 0.5,
            offscreen_x: -2.8,
            lives: 3,
            collision_penalty: 1,
            dodge_reward: 1,
        }
    }
}

/// Timed-arrow tuning ("Disco Dash"). Units are screen pixels.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ArrowTuning {
    pub spawn_period_ms: u32,
    pub spawn_x: f64,
    /// Pixels per second
    pub speed: f64,
    pub target_x: f64,
    pub hit_window: f64,
    pub perfect_window: f64,
    pub despawn_x: f64,
    #[ts(type = "number")]
    pub perfect_points: i64,
    #[ts(type = "number")]
    pub good_points: i64,
    #[ts(type = "number")]
    pub miss_penalty: i64,
}

impl Default for ArrowTuning {
    fn default() -> Self {
        Self {
            spawn_period_ms: 1000,
            spawn_x: 1280.0,
            speed: 150.0,
            target_x: 80.0,
            hit_window: 50.0,
            perfect_window: 20.0,
            despawn_x: -100.0,
            perfect_points: 2,
            good_points: 1,
            miss_penalty: 1,
        }
    }
}

/// Rhythm tuning ("Beat Tap")
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct BeatTuning {
    pub interval_ms: u32,
    pub speed_up_interval_ms: u32,
    pub perfect_window_ms: u32,
    pub good_window_ms: u32,
    #[ts(type = "number")]
    pub perfect_points: i64,
    #[ts(type = "number")]
    pub good_points: i64,
}

impl Default for BeatTuning {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            speed_up_interval_ms: 2000,
            perfect_window_ms: 100,
            good_window_ms: 200,
            perfect_points: 2,
            good_points: 1,
        }
    }
}

/// Avatar kinematics, converted from the per-frame values of a 60 fps client.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct AvatarTuning {
    pub move_speed: f64,
    pub jump_speed: f64,
    pub gravity: f64,
    pub floor_y: f64,
    /// Feet to body centre
    pub body_offset_y: f64,
    pub stage_min_x: f64,
    pub stage_max_x: f64,
}

impl Default for AvatarTuning {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            jump_speed: 4.2,
            gravity: 14.4,
            floor_y: -0.7,
            body_offset_y: 0.35,
            stage_min_x: -2.0,
            stage_max_x: 2.0,
        }
    }
}

/// Modifier wheel animation, in degrees per animation tick.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WheelTuning {
    pub spin_velocity: f64,
    pub decay: f64,
    pub settle_below: f64,
    /// Where the pointer sits on the wheel
    pub pointer_deg: f64,
}

impl Default for WheelTuning {
    fn default() -> Self {
        Self {
            spin_velocity: 10.0,
            decay: 0.95,
            settle_below: 0.5,
            pointer_deg: 270.0,
        }
    }
}

/// Gameplay tuning for every minigame.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct MatchTuning {
    pub coins: CoinTuning,
    pub spikes: SpikeTuning,
    pub arrows: ArrowTuning,
    pub beat: BeatTuning,
    pub avatar: AvatarTuning,
    pub wheel: WheelTuning,
}

fn positive(value: f64, name: &str) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be finite and > 0", name));
    }
    Ok(())
}

fn ordered_range(min: f64, max: f64, name: &str) -> Result<(), String> {
    if !min.is_finite() || min <= 0.0 {
        return Err(format!("{}_min must be finite and > 0", name));
    }
    if !max.is_finite() || max < min {
        return Err(format!("{}_max must be finite and >= {}_min", name, name));
    }
    Ok(())
}

impl MatchTuning {
    pub fn validate(&self) -> Result<(), String> {
        let c = &self.coins;
        if c.spawn_period_ms == 0 {
            return Err("coins.spawn_period_ms must be > 0".to_string());
        }
        ordered_range(c.gravity_min, c.gravity_max, "coins.gravity")?;
        positive(c.collect_radius, "coins.collect_radius")?;
        if !c.ground_y.is_finite() || !c.spawn_jitter.is_finite() || c.spawn_jitter < 0.0 {
            return Err("coins.ground_y and coins.spawn_jitter must be finite".to_string());
        }

        let s = &self.spikes;
        if s.spawn_period_ms == 0 {
            return Err("spikes.spawn_period_ms must be > 0".to_string());
        }
        ordered_range(s.speed_min, s.speed_max, "spikes.speed")?;
        positive(s.hit_radius, "spikes.hit_radius")?;
        if s.offscreen_x >= s.spawn_x {
            return Err("spikes.offscreen_x must be left of spikes.spawn_x".to_string());
        }
        if s.lives == 0 {
            return Err("spikes.lives must be > 0".to_string());
        }

        let a = &self.arrows;
        if a.spawn_period_ms == 0 {
            return Err("arrows.spawn_period_ms must be > 0".to_string());
        }
        positive(a.speed, "arrows.speed")?;
        positive(a.hit_window, "arrows.hit_window")?;
        if a.perfect_window > a.hit_window {
            return Err("arrows.perfect_window must be <= arrows.hit_window".to_string());
        }
        if a.despawn_x >= a.target_x - a.hit_window {
            return Err("arrows.despawn_x must be past the hit window".to_string());
        }

        let b = &self.beat;
        if b.interval_ms == 0 || b.speed_up_interval_ms == 0 {
            return Err("beat intervals must be > 0".to_string());
        }
        if b.perfect_window_ms > b.good_window_ms {
            return Err("beat.perfect_window_ms must be <= beat.good_window_ms".to_string());
        }

        positive(self.avatar.move_speed, "avatar.move_speed")?;
        positive(self.avatar.gravity, "avatar.gravity")?;
        if self.avatar.stage_min_x >= self.avatar.stage_max_x {
            return Err("avatar.stage_min_x must be < avatar.stage_max_x".to_string());
        }

        let w = &self.wheel;
        positive(w.spin_velocity, "wheel.spin_velocity")?;
        if !(w.decay > 0.0 && w.decay < 1.0) {
            return Err("wheel.decay must be in (0, 1)".to_string());
        }
        if !(w.settle_below > 0.0 && w.settle_below < w.spin_velocity) {
            return Err("wheel.settle_below must be in (0, spin_velocity)".to_string());
        }
        Ok(())
    }
}
