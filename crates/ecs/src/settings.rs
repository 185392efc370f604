//! Per-kind tuning loaded from YAML.
//!
//! Settings are shared by every entity of a kind through an `Arc` and are never persisted
//! with the entity; a loaded entity is re-attached to whatever settings the host supplies.

use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use mobsim_common::Profile;
use mobsim_kernel::SimConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no settings configured for {0}")]
    Missing(&'static str),

    #[error("invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Inclusive range of seconds, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondsRange {
    pub min: f32,
    pub max: f32,
}

impl SecondsRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), SettingsError> {
        if !(self.min >= 0.0 && self.max >= self.min) {
            return Err(SettingsError::Invalid {
                field,
                reason: "range must satisfy 0 <= min <= max",
            });
        }
        Ok(())
    }
}

/// Locomotion limits shared by every movable kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Motion {
    /// Max horizontal speed on land, blocks per second.
    pub land_speed: f32,
    /// Max horizontal speed while submerged.
    pub liquid_speed: f32,
    /// Horizontal acceleration toward the aim vector.
    pub acceleration: f32,
    /// Horizontal deceleration on the ground when not steering.
    pub friction: f32,
    /// Linear damping per second in liquid.
    pub liquid_drag: f32,
    /// Distance above ground within which the body tilts to the surface normal.
    pub ground_stick: f32,
    /// Yaw rate in radians per second.
    pub turn_rate: f32,
    /// Climb single-block ledges instead of stopping.
    pub step_up: bool,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            land_speed: 4.0,
            liquid_speed: 2.0,
            acceleration: 20.0,
            friction: 12.0,
            liquid_drag: 2.0,
            ground_stick: 0.3,
            turn_rate: std::f32::consts::TAU,
            step_up: true,
        }
    }
}

impl Motion {
    /// Motion for bodies that never steer (dropped items).
    pub fn passive() -> Self {
        Self {
            land_speed: 0.0,
            liquid_speed: 0.0,
            acceleration: 0.0,
            step_up: false,
            turn_rate: 0.0,
            ..Self::default()
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), SettingsError> {
        let values = [
            self.land_speed,
            self.liquid_speed,
            self.acceleration,
            self.friction,
            self.liquid_drag,
            self.ground_stick,
            self.turn_rate,
        ];
        if values.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(SettingsError::Invalid {
                field,
                reason: "speeds and rates must be finite and non-negative",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureSettings {
    pub profile: Profile,
    pub motion: Motion,
    /// How long a creature waits before planning its next walk.
    pub idle: SecondsRange,
    /// Max horizontal distance, in cells, of a planned destination.
    pub wander_radius: i32,
    /// Cell expansions the pathfinder may spend per plan.
    pub path_budget: usize,
    pub max_health: f32,
}

impl Default for CreatureSettings {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            motion: Motion::default(),
            idle: SecondsRange::new(2.0, 6.0),
            wander_radius: 8,
            path_budget: 256,
            max_health: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSettings {
    pub profile: Profile,
    pub motion: Motion,
    /// Seconds a dropped stack survives before it despawns.
    pub decay_seconds: f32,
    /// Seconds between neighbor scans for merge candidates.
    pub merge_interval: f32,
    /// How far around its bounds a stack looks for merge partners.
    pub merge_radius: f32,
    /// Capacity of a stackable item stack.
    pub max_stack: u32,
}

impl Default for ItemSettings {
    fn default() -> Self {
        Self {
            profile: Profile {
                half_extents: Vec3::splat(0.125),
                max_drift: 0.0,
                requires_ground: false,
            },
            motion: Motion::passive(),
            decay_seconds: 300.0,
            merge_interval: 1.0,
            merge_radius: 1.0,
            max_stack: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSettings {
    /// Half edge of the projectile's cube bounds.
    pub radius: f32,
    /// Seconds of flight before the projectile expires.
    pub lifetime: f32,
    pub damage: f32,
    /// Linear air drag per second.
    pub drag: f32,
}

impl Default for ProjectileSettings {
    fn default() -> Self {
        Self {
            radius: 0.1,
            lifetime: 5.0,
            damage: 4.0,
            drag: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSettings {
    pub profile: Profile,
    pub motion: Motion,
    /// Height of the seat above the vehicle's foot point.
    pub seat_height: f32,
    pub max_health: f32,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            profile: Profile {
                half_extents: Vec3::new(0.7, 0.35, 0.7),
                max_drift: 2.0,
                requires_ground: false,
            },
            motion: Motion {
                land_speed: 8.0,
                liquid_speed: 5.0,
                acceleration: 6.0,
                friction: 3.0,
                turn_rate: std::f32::consts::PI,
                ..Motion::default()
            },
            seat_height: 0.6,
            max_health: 40.0,
        }
    }
}

/// Scheduler configuration plus settings for every entity kind.
///
/// A kind left out of the file gets its defaults; a kind set to `null` is unconfigured and
/// cannot be spawned or loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sim: SimConfig,
    pub creature: Option<Arc<CreatureSettings>>,
    pub item: Option<Arc<ItemSettings>>,
    pub projectile: Option<Arc<ProjectileSettings>>,
    pub vehicle: Option<Arc<VehicleSettings>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            creature: Some(Arc::default()),
            item: Some(Arc::default()),
            projectile: Some(Arc::default()),
            vehicle: Some(Arc::default()),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_yaml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, SettingsError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.sim.delta_time > 0.0 && self.sim.delta_time.is_finite()) {
            return Err(SettingsError::Invalid {
                field: "sim.delta_time",
                reason: "must be positive",
            });
        }
        if self.sim.arena_capacity == 0 {
            return Err(SettingsError::Invalid {
                field: "sim.arena_capacity",
                reason: "must be positive",
            });
        }
        if let Some(c) = &self.creature {
            c.idle.validate("creature.idle")?;
            c.motion.validate("creature.motion")?;
            validate_profile(&c.profile, "creature.profile")?;
            if c.wander_radius < 1 {
                return Err(SettingsError::Invalid {
                    field: "creature.wander_radius",
                    reason: "must be at least 1",
                });
            }
            if c.max_health <= 0.0 {
                return Err(SettingsError::Invalid {
                    field: "creature.max_health",
                    reason: "must be positive",
                });
            }
        }
        if let Some(i) = &self.item {
            i.motion.validate("item.motion")?;
            validate_profile(&i.profile, "item.profile")?;
            if i.max_stack == 0 {
                return Err(SettingsError::Invalid {
                    field: "item.max_stack",
                    reason: "must be positive",
                });
            }
            if i.decay_seconds <= 0.0 || i.merge_interval <= 0.0 {
                return Err(SettingsError::Invalid {
                    field: "item",
                    reason: "decay and merge interval must be positive",
                });
            }
            if !(i.merge_radius.is_finite() && i.merge_radius >= 0.0) {
                return Err(SettingsError::Invalid {
                    field: "item.merge_radius",
                    reason: "must be finite and non-negative",
                });
            }
        }
        if let Some(p) = &self.projectile {
            if p.lifetime <= 0.0 || p.radius <= 0.0 {
                return Err(SettingsError::Invalid {
                    field: "projectile",
                    reason: "lifetime and radius must be positive",
                });
            }
            if !(p.damage.is_finite() && p.damage >= 0.0 && p.drag.is_finite() && p.drag >= 0.0) {
                return Err(SettingsError::Invalid {
                    field: "projectile",
                    reason: "damage and drag must be finite and non-negative",
                });
            }
        }
        if let Some(v) = &self.vehicle {
            v.motion.validate("vehicle.motion")?;
            validate_profile(&v.profile, "vehicle.profile")?;
            if v.max_health <= 0.0 {
                return Err(SettingsError::Invalid {
                    field: "vehicle.max_health",
                    reason: "must be positive",
                });
            }
        }
        Ok(())
    }

    pub fn creature(&self) -> Result<&Arc<CreatureSettings>, SettingsError> {
        self.creature.as_ref().ok_or(SettingsError::Missing("creature"))
    }

    pub fn item(&self) -> Result<&Arc<ItemSettings>, SettingsError> {
        self.item.as_ref().ok_or(SettingsError::Missing("item"))
    }

    pub fn projectile(&self) -> Result<&Arc<ProjectileSettings>, SettingsError> {
        self.projectile
            .as_ref()
            .ok_or(SettingsError::Missing("projectile"))
    }

    pub fn vehicle(&self) -> Result<&Arc<VehicleSettings>, SettingsError> {
        self.vehicle.as_ref().ok_or(SettingsError::Missing("vehicle"))
    }
}

fn validate_profile(profile: &Profile, field: &'static str) -> Result<(), SettingsError> {
    if !(profile.max_drift.is_finite() && profile.max_drift >= 0.0) {
        return Err(SettingsError::Invalid {
            field,
            reason: "max_drift must be finite and non-negative",
        });
    }
    if !profile.half_extents.is_finite() || profile.half_extents.min_element() <= 0.0 {
        return Err(SettingsError::Invalid {
            field,
            reason: "half extents must be positive",
        });
    }
    Ok(())
}
