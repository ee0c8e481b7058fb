//! Explosion Effect — radial damage, activation and force over an area
//!
//! Event-driven: gameplay raises an `ExplosionEvent`, this module overlaps the
//! blast sphere, wakes and damages every unique destructible in range, and
//! hands the survivors to the force distributor with falloff, lift and chaos.
//! Plain rigid bodies caught in the blast get the force path only.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, ReadDefaultRapierContext};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FractureLinkConfig;
use crate::forces::{ForceRequest, RadialParams};
use crate::hit::FractureRegistry;
use crate::impact::collect_impact_targets;
use crate::physics::destructible_filter;
use crate::rigid::{DamageOutcome, DemolitionEvent, FractureRigid, MeshShape, SimState};

/// Vertical lift bias bounds (negative values pull targets downward).
pub const LIFT_RANGE: (f32, f32) = (-10.0, 10.0);

// ============================================================================
// Configuration
// ============================================================================

/// Explosion shape and behavior. Clamped by [`ExplosionConfig::validate`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExplosionConfig {
    /// Blast radius
    pub radius: f32,
    /// Vertical lift bias applied to outgoing impulses
    pub lift: f32,
    /// Random rotation intensity in [0, 1]
    pub chaos: f32,
    /// Promote kinematic destructibles to dynamic before pushing them
    pub affect_kinematic: bool,
}

impl Default for ExplosionConfig {
    fn default() -> Self {
        Self { radius: 5.0, lift: 2.0, chaos: 0.5, affect_kinematic: false }
    }
}

impl ExplosionConfig {
    /// Clamp every numeric field into its valid range. Idempotent.
    pub fn validate(&mut self) {
        self.radius = self.radius.max(0.0);
        self.lift = self.lift.clamp(LIFT_RANGE.0, LIFT_RANGE.1);
        self.chaos = self.chaos.clamp(0.0, 1.0);
    }
}

/// One explosion going off.
#[derive(Event, Debug, Clone, Copy)]
pub struct ExplosionEvent {
    pub center: Vec3,
    pub max_damage: f32,
    pub max_force: f32,
    pub config: ExplosionConfig,
}

// ============================================================================
// Per-target transition
// ============================================================================

/// Wake and promote one destructible caught in a blast: impact-activatable
/// objects activate; kinematic objects promote (with the convex side effect)
/// only when the explosion is configured to affect them.
pub fn apply_explosion_transition(
    rigid: &mut FractureRigid,
    shape: Option<&mut MeshShape>,
    affect_kinematic: bool,
) {
    if rigid.activation.by_impact {
        rigid.activate();
    }
    if affect_kinematic && rigid.sim_state == SimState::Kinematic {
        if let Some(shape) = shape {
            rigid.promote_kinematic(shape);
        }
    }
}

// ============================================================================
// System
// ============================================================================

/// Process every explosion raised this frame.
#[allow(clippy::too_many_arguments)]
pub fn process_explosions(
    mut commands: Commands,
    mut events: EventReader<ExplosionEvent>,
    rapier: ReadDefaultRapierContext,
    registry: Res<FractureRegistry>,
    link: Res<FractureLinkConfig>,
    mut rigids: Query<(&mut FractureRigid, Option<&mut MeshShape>)>,
    transforms: Query<&Transform>,
    mut demolitions: EventWriter<DemolitionEvent>,
    mut forces: EventWriter<ForceRequest>,
) {
    for event in events.read() {
        let mut config = event.config;
        config.validate();

        let ctx = rapier.single();
        let mut overlaps: Vec<Entity> = Vec::new();
        ctx.intersections_with_shape(
            event.center,
            Quat::IDENTITY,
            &Collider::ball(config.radius),
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
        let mut force_targets = Vec::with_capacity(targets.rigids.len() + targets.plain_bodies.len());

        for &entity in &targets.rigids {
            let Ok((mut rigid, mut shape)) = rigids.get_mut(entity) else { continue };

            apply_explosion_transition(&mut rigid, shape.as_deref_mut(), config.affect_kinematic);

            if rigid.damage.enabled {
                let falloff = transforms
                    .get(entity)
                    .map(|t| crate::forces::explosion_falloff(t.translation.distance(event.center), config.radius))
                    .unwrap_or(1.0);
                if rigid.apply_damage(event.max_damage * falloff, 1.0) == DamageOutcome::Demolished {
                    demolitions.send(DemolitionEvent { entity, point: event.center });
                    commands.entity(entity).despawn();
                    // Reference no longer valid; fragments take the force next frame
                    continue;
                }
            }
            force_targets.push(entity);
        }
        force_targets.extend(&targets.plain_bodies);

        let params = RadialParams {
            center: event.center,
            radius: config.radius,
            max_force: event.max_force,
            lift: config.lift,
        };
        debug!(center = ?event.center, targets = force_targets.len(), "explosion processed");
        forces.send(ForceRequest::Radial { targets: force_targets, params, chaos: config.chaos });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rigid::{ActivationFlags, ObjectKind};

    #[test]
    fn test_config_validate_clamps_and_is_idempotent() {
        let mut config = ExplosionConfig { radius: -1.0, lift: 25.0, chaos: 2.0, affect_kinematic: true };
        config.validate();
        assert_eq!(config.radius, 0.0);
        assert_eq!(config.lift, LIFT_RANGE.1);
        assert_eq!(config.chaos, 1.0);

        let once = config;
        config.validate();
        assert_eq!(config.lift, once.lift);
        assert_eq!(config.chaos, once.chaos);
    }

    #[test]
    fn test_transition_activates_by_impact() {
        let mut rigid = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive)
            .with_activation(ActivationFlags { by_impact: true, by_activator: false });
        apply_explosion_transition(&mut rigid, None, false);
        assert_eq!(rigid.sim_state, SimState::Dynamic);
    }

    #[test]
    fn test_transition_kinematic_gate() {
        let mut rigid = FractureRigid::new(ObjectKind::Mesh, SimState::Kinematic);
        let mut shape = MeshShape::default();

        apply_explosion_transition(&mut rigid, Some(&mut shape), false);
        assert_eq!(rigid.sim_state, SimState::Kinematic);
        assert!(!shape.convex);

        apply_explosion_transition(&mut rigid, Some(&mut shape), true);
        assert_eq!(rigid.sim_state, SimState::Dynamic);
        assert!(shape.convex);
    }

    #[test]
    fn test_transition_ignores_inactive_without_flag() {
        let mut rigid = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive);
        apply_explosion_transition(&mut rigid, None, true);
        assert_eq!(rigid.sim_state, SimState::Inactive);
    }
}
