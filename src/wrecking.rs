//! Wrecking Ball — character-driven area destruction on hard contacts
//!
//! While armed, a qualifying character hit (relative velocity along the
//! contact normal above a threshold) detonates a radial burst just off the
//! contact point, waking and shoving every destructible in range. The ball
//! disarms after a qualifying burst; the motion state machine re-arms it on
//! state entry.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, ReadDefaultRapierContext};
use tracing::debug;

use crate::config::FractureLinkConfig;
use crate::forces::{ForceRequest, RadialParams};
use crate::hit::FractureRegistry;
use crate::impact::collect_impact_targets;
use crate::motion::MotionAddon;
use crate::physics::destructible_filter;
use crate::rigid::{FractureRigid, MeshShape, SimState};

// ============================================================================
// Components & Events
// ============================================================================

/// Wrecking-ball state carried by a character.
#[derive(Component, Debug, Clone, Copy)]
pub struct WreckingBall {
    pub armed: bool,
    /// Minimum relative speed along the contact normal for a burst
    pub relative_speed_threshold: f32,
    /// Impulse magnitude at the burst center
    pub max_force: f32,
    /// Burst radius
    pub radius: f32,
    /// Burst center offset from the contact point along the normal
    /// (negative values pull objects towards the character)
    pub offset: f32,
}

impl Default for WreckingBall {
    fn default() -> Self {
        Self {
            armed: false,
            relative_speed_threshold: 10.0,
            max_force: 10.0,
            radius: 4.0,
            offset: 0.1,
        }
    }
}

impl WreckingBall {
    pub fn arm(&mut self, relative_speed_threshold: f32, max_force: f32, radius: f32, offset: f32) {
        self.armed = true;
        self.relative_speed_threshold = relative_speed_threshold;
        self.max_force = max_force;
        self.radius = radius;
        self.offset = offset;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

/// Per-hit callback from the character controller: the character's capsule
/// pushed against something this frame.
#[derive(Event, Debug, Clone, Copy)]
pub struct CharacterHitEvent {
    pub character: Entity,
    pub point: Vec3,
    pub normal: Vec3,
    pub collider: Entity,
    pub body: Option<Entity>,
    pub character_velocity: Vec3,
    /// Velocity of the struck body (zero when none is attached)
    pub body_velocity: Vec3,
}

// ============================================================================
// Qualification
// ============================================================================

/// Relative contact speed: character and body velocities projected onto the
/// contact normal, summed. Compared squared against the squared threshold.
pub fn relative_normal_speed_sq(character_velocity: Vec3, body_velocity: Vec3, normal: Vec3) -> f32 {
    let relative = character_velocity.project_onto_normalized(normal)
        + body_velocity.project_onto_normalized(normal);
    relative.length_squared()
}

/// Does this contact trigger a burst?
pub fn qualifies(hit: &CharacterHitEvent, threshold: f32) -> bool {
    let normal = hit.normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return false;
    }
    relative_normal_speed_sq(hit.character_velocity, hit.body_velocity, normal)
        > threshold * threshold
}

// ============================================================================
// System
// ============================================================================

/// Detonate bursts for qualifying character hits while armed.
#[allow(clippy::too_many_arguments)]
pub fn process_wrecking_hits(
    mut hits: EventReader<CharacterHitEvent>,
    rapier: ReadDefaultRapierContext,
    registry: Res<FractureRegistry>,
    link: Res<FractureLinkConfig>,
    mut characters: Query<(&mut WreckingBall, Option<&MotionAddon>)>,
    mut rigids: Query<(&mut FractureRigid, Option<&mut MeshShape>)>,
    mut forces: EventWriter<ForceRequest>,
) {
    for hit in hits.read() {
        let Ok((mut ball, addon)) = characters.get_mut(hit.character) else { continue };
        if !ball.armed || !qualifies(hit, ball.relative_speed_threshold) {
            continue;
        }

        let center = hit.point + hit.normal * ball.offset;
        let ctx = rapier.single();
        let mut overlaps: Vec<Entity> = Vec::new();
        ctx.intersections_with_shape(
            center,
            Quat::IDENTITY,
            &Collider::ball(ball.radius),
            destructible_filter(),
            |entity| {
                overlaps.push(entity);
                overlaps.len() < link.max_overlap_hits
            },
        );
        if overlaps.is_empty() {
            continue;
        }

        let targets = collect_impact_targets(&registry, &overlaps, true);
        for &entity in &targets.rigids {
            let Ok((mut rigid, mut shape)) = rigids.get_mut(entity) else { continue };
            if rigid.activation.by_impact {
                rigid.activate();
            }
            // The wrecking ball always shoves kinematics into the simulation
            if rigid.sim_state == SimState::Kinematic {
                if let Some(shape) = shape.as_deref_mut() {
                    rigid.promote_kinematic(shape);
                }
            }
        }

        let mut force_targets = targets.rigids.clone();
        force_targets.extend(&targets.plain_bodies);

        let params = RadialParams {
            center,
            radius: ball.radius,
            max_force: ball.max_force,
            lift: 0.0,
        };
        let chaos = addon.map(|a| a.chaos).unwrap_or(link.default_chaos);
        debug!(character = ?hit.character, targets = force_targets.len(), "wrecking-ball burst");
        forces.send(ForceRequest::Radial { targets: force_targets, params, chaos });
        ball.disarm();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(character_velocity: Vec3, body_velocity: Vec3, normal: Vec3) -> CharacterHitEvent {
        CharacterHitEvent {
            character: Entity::from_raw(1),
            point: Vec3::ZERO,
            normal,
            collider: Entity::from_raw(2),
            body: None,
            character_velocity,
            body_velocity,
        }
    }

    #[test]
    fn test_normal_projection_ignores_tangential_speed() {
        // Fast along the wall, barely into it: tangential motion must not qualify
        let h = hit(Vec3::new(20.0, 0.0, 0.5), Vec3::ZERO, Vec3::Z);
        assert!(!qualifies(&h, 10.0));
    }

    #[test]
    fn test_head_on_qualifies() {
        let h = hit(Vec3::new(0.0, 0.0, 12.0), Vec3::ZERO, Vec3::Z);
        assert!(qualifies(&h, 10.0));
    }

    #[test]
    fn test_body_velocity_contributes() {
        // Character at 6 and body closing at 6 along the normal: 12 combined
        let h = hit(Vec3::new(0.0, 0.0, 6.0), Vec3::new(0.0, 0.0, 6.0), Vec3::Z);
        assert!(qualifies(&h, 10.0));
        let slow = hit(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Z);
        assert!(!qualifies(&slow, 10.0));
    }

    #[test]
    fn test_degenerate_normal_never_qualifies() {
        let h = hit(Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO, Vec3::ZERO);
        assert!(!qualifies(&h, 1.0));
    }

    #[test]
    fn test_arm_overwrites_parameters() {
        let mut ball = WreckingBall::default();
        ball.arm(5.0, 20.0, 2.0, -0.5);
        assert!(ball.armed);
        assert_eq!(ball.relative_speed_threshold, 5.0);
        assert_eq!(ball.max_force, 20.0);
        assert_eq!(ball.radius, 2.0);
        assert_eq!(ball.offset, -0.5);

        ball.disarm();
        assert!(!ball.armed);
        // Parameters survive disarm; re-arming restores the last burst shape
        assert_eq!(ball.max_force, 20.0);
    }
}
