//! Bullet Impact Pipeline — hit resolution, aggregation, activation, force
//!
//! The full per-hit decision procedure for hitscan weapons:
//! ```text
//! SurfaceHit → resolve wrapper → debris/dust bursts
//!       ↓
//! damage (may demolish → re-resolve along the shot ray)
//!       ↓
//! aggregate targets (point contact, or overlap sphere when radius > 0)
//!       ↓
//! state transitions (activate / promote kinematic / detach cluster shards)
//!       ↓
//! velocity-change impulse along the shot direction
//! ```
//! Hits with no destructible wrapper fall back to the generic damage-handler
//! and point-impact-handler path.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, ReadDefaultRapierContext};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::FractureLinkConfig;
use crate::effects::{emit_impact_bursts, EffectEmitters, ParticleBurst};
use crate::forces::ForceRequest;
use crate::hit::{FractureRegistry, SurfaceHit};
use crate::physics::destructible_filter;
use crate::rigid::{
    detach_cluster_shards, DamageOutcome, DemolitionEvent, FractureRigid, MeshShape, ObjectKind,
    ShardDetached, SimState,
};

/// Bullet impact radii above this are clamped off; larger areas belong to
/// explosions, not bullets.
pub const MAX_BULLET_IMPACT_RADIUS: f32 = 0.5;

// ============================================================================
// Configuration
// ============================================================================

/// Per-weapon bullet effect configuration. Out-of-range values are clamped by
/// [`BulletImpactConfig::validate`], never rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BulletImpactConfig {
    /// Damage the bullet does
    pub damage: f32,
    /// Size of the bullet, used to scale decals and damage
    pub decal_size: f32,
    /// Radius of the area in which bullets wake destructibles (0 = point contact)
    pub impact_radius: f32,
    /// Impulse imparted onto hit objects
    pub impact_force: f32,
    /// Force-process objects that stayed Inactive
    pub affect_inactive: bool,
    /// Promote Kinematic objects to Dynamic on hit
    pub affect_kinematic: bool,
    /// Detach struck shards from connected clusters
    pub demolish_cluster: bool,
    /// Also push plain rigid bodies found in the impact area
    pub affect_plain_bodies: bool,
    /// Emit debris bursts
    pub debris: bool,
    /// Emit dust bursts
    pub dust: bool,
}

impl Default for BulletImpactConfig {
    fn default() -> Self {
        Self {
            damage: 25.0,
            decal_size: 1.0,
            impact_radius: 0.1,
            impact_force: 15.0,
            affect_inactive: true,
            affect_kinematic: true,
            demolish_cluster: true,
            affect_plain_bodies: true,
            debris: true,
            dust: true,
        }
    }
}

impl BulletImpactConfig {
    /// Clamp every numeric field into its valid range. Idempotent.
    pub fn validate(&mut self) {
        self.damage = self.damage.max(0.0);
        self.decal_size = self.decal_size.max(0.1);
        self.impact_radius = self.impact_radius.clamp(0.0, MAX_BULLET_IMPACT_RADIUS);
        self.impact_force = self.impact_force.max(0.0);
    }
}

/// Weapon-side component carrying the bullet effect configuration.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct BulletImpactEffect(pub BulletImpactConfig);

/// One bullet landed. `effect` is the weapon entity holding the configuration.
#[derive(Event, Debug, Clone, Copy)]
pub struct BulletImpactEvent {
    pub effect: Entity,
    pub hit: SurfaceHit,
}

// ============================================================================
// Generic damage / impact handlers (non-destructible fallback)
// ============================================================================

/// Generic damage sink for objects outside the destruction model.
#[derive(Component, Debug, Clone, Copy)]
pub struct DamageHandler {
    pub health: f32,
}

impl DamageHandler {
    pub fn add_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }
}

/// Generic point-impact sink: accumulates impulses for the owner's own
/// movement layer to consume (e.g. physics props with bespoke responses).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PointImpactHandler {
    pub accumulated: Vec3,
    pub last_point: Vec3,
}

impl PointImpactHandler {
    pub fn handle_point_impact(&mut self, point: Vec3, impulse: Vec3) {
        self.accumulated += impulse;
        self.last_point = point;
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Disjoint target sets of one impact: destructible wrappers, and simulated
/// bodies with no wrapper. Both identity-deduped, first-seen order.
#[derive(Debug, Default, Clone)]
pub struct ImpactTargets {
    pub rigids: Vec<Entity>,
    pub plain_bodies: Vec<Entity>,
}

impl ImpactTargets {
    pub fn is_empty(&self) -> bool {
        self.rigids.is_empty() && self.plain_bodies.is_empty()
    }
}

/// Split overlap-query colliders into unique destructible wrappers and unique
/// plain bodies. An object represented by several colliders is counted once.
/// An empty `overlaps` slice yields two empty sets — a legitimate no-op.
pub fn collect_impact_targets(
    registry: &FractureRegistry,
    overlaps: &[Entity],
    affect_plain_bodies: bool,
) -> ImpactTargets {
    let mut targets = ImpactTargets::default();
    let mut seen_rigids = HashSet::new();
    let mut seen_bodies = HashSet::new();

    for &collider in overlaps {
        match registry.resolve(collider) {
            Some(rigid) => {
                if seen_rigids.insert(rigid) {
                    targets.rigids.push(rigid);
                }
            }
            None => {
                if !affect_plain_bodies {
                    continue;
                }
                if let Some(body) = registry.attached_body(collider) {
                    if seen_bodies.insert(body) {
                        targets.plain_bodies.push(body);
                    }
                }
            }
        }
    }
    targets
}

// ============================================================================
// State transitions
// ============================================================================

/// Point-contact (radius 0) transition for the struck rigid itself.
/// Mesh objects still Inactive/Kinematic get promoted/activated per config.
pub fn apply_point_transition(
    rigid: &mut FractureRigid,
    shape: Option<&mut MeshShape>,
    config: &BulletImpactConfig,
) {
    if rigid.kind != ObjectKind::Mesh {
        return;
    }
    if !matches!(rigid.sim_state, SimState::Inactive | SimState::Kinematic) {
        return;
    }
    if config.affect_kinematic && rigid.sim_state == SimState::Kinematic {
        if let Some(shape) = shape {
            rigid.promote_kinematic(shape);
        }
    }
    if rigid.activation.by_impact {
        rigid.activate();
    }
}

/// Area-contact eligibility and promotion for one aggregated rigid.
/// Returns whether the rigid should be collected for force application.
pub fn apply_area_transition(
    rigid: &mut FractureRigid,
    shape: Option<&mut MeshShape>,
    config: &BulletImpactConfig,
) -> bool {
    if rigid.sim_state == SimState::Inactive && !config.affect_inactive {
        return false;
    }
    if config.affect_kinematic && rigid.sim_state == SimState::Kinematic {
        if let Some(shape) = shape {
            rigid.promote_kinematic(shape);
        }
    }
    true
}

// ============================================================================
// Pipeline system
// ============================================================================

type RigidQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static mut FractureRigid,
        Option<&'static mut MeshShape>,
        Option<&'static EffectEmitters>,
    ),
>;

/// Process every bullet impact raised this frame.
#[allow(clippy::too_many_arguments)]
pub fn process_bullet_impacts(
    mut commands: Commands,
    mut events: EventReader<BulletImpactEvent>,
    rapier: ReadDefaultRapierContext,
    effects: Query<&BulletImpactEffect>,
    mut registry: ResMut<FractureRegistry>,
    link: Res<FractureLinkConfig>,
    mut rigids: RigidQuery,
    mut damage_handlers: Query<&mut DamageHandler>,
    mut impact_handlers: Query<&mut PointImpactHandler>,
    mut bursts: EventWriter<ParticleBurst>,
    mut demolitions: EventWriter<DemolitionEvent>,
    mut detached: EventWriter<ShardDetached>,
    mut forces: EventWriter<ForceRequest>,
) {
    for event in events.read() {
        let Ok(effect) = effects.get(event.effect) else {
            warn!(effect = ?event.effect, "bullet impact from unknown effect entity");
            continue;
        };
        let config = effect.0;
        let hit = event.hit;

        match registry.resolve(hit.collider) {
            Some(target) => {
                let Some(target) = resolve_damage_target(
                    target,
                    &hit,
                    &config,
                    &rapier,
                    &registry,
                    &mut rigids,
                    &mut commands,
                    &mut bursts,
                    &mut demolitions,
                ) else {
                    // Demolished with no surviving fragment on the shot ray
                    continue;
                };

                let force_targets = if config.impact_radius == 0.0 {
                    point_contact(target, &hit, &config, &mut rigids, &mut registry, &mut commands, &mut detached)
                } else {
                    area_contact(
                        target,
                        &hit,
                        &config,
                        &rapier,
                        link.max_overlap_hits,
                        &mut rigids,
                        &mut registry,
                        &mut commands,
                        &mut detached,
                    )
                };

                if !force_targets.is_empty() && config.impact_force > 0.0 {
                    debug!(?target, targets = force_targets.len(), "bullet impulse requested");
                    forces.send(ForceRequest::Point {
                        targets: force_targets,
                        direction: hit.direction,
                        magnitude: config.impact_force,
                    });
                }
            }
            None => {
                fallback_hit(&hit, &config, &mut damage_handlers, &mut impact_handlers, &mut forces);
            }
        }
    }
}

/// Apply damage to the struck rigid. A demolition invalidates the reference:
/// re-resolve along the shot ray for the freshly spawned fragment, or give up
/// silently when nothing is there anymore.
#[allow(clippy::too_many_arguments)]
fn resolve_damage_target(
    target: Entity,
    hit: &SurfaceHit,
    config: &BulletImpactConfig,
    rapier: &ReadDefaultRapierContext,
    registry: &FractureRegistry,
    rigids: &mut RigidQuery,
    commands: &mut Commands,
    bursts: &mut EventWriter<ParticleBurst>,
    demolitions: &mut EventWriter<DemolitionEvent>,
) -> Option<Entity> {
    let Ok((mut rigid, _, emitters)) = rigids.get_mut(target) else {
        return None;
    };

    emit_impact_bursts(target, emitters, hit.point, hit.normal, config.debris, config.dust, bursts);

    match rigid.apply_damage(config.damage, config.decal_size) {
        DamageOutcome::Ignored | DamageOutcome::Damaged => Some(target),
        DamageOutcome::Demolished => {
            demolitions.send(DemolitionEvent { entity: target, point: hit.point });
            commands.entity(target).despawn();
            debug!(?target, "bullet demolition, re-resolving along shot ray");

            // Walk the original shot ray again with a small tail to catch the
            // fragment that replaced the demolished object.
            let ctx = rapier.single();
            let origin = hit.point - hit.direction * hit.distance;
            ctx.cast_ray(origin, hit.direction, hit.distance + 0.05, true, destructible_filter())
                .and_then(|(collider, _toi)| registry.resolve(collider))
                .filter(|&fresh| fresh != target)
        }
    }
}

/// Radius-zero contact: only the struck object is considered.
fn point_contact(
    target: Entity,
    hit: &SurfaceHit,
    config: &BulletImpactConfig,
    rigids: &mut RigidQuery,
    registry: &mut FractureRegistry,
    commands: &mut Commands,
    detached: &mut EventWriter<ShardDetached>,
) -> Vec<Entity> {
    let Ok((mut rigid, mut shape, _)) = rigids.get_mut(target) else {
        return Vec::new();
    };

    apply_point_transition(&mut rigid, shape.as_deref_mut(), config);

    if rigid.kind == ObjectKind::ConnectedCluster && config.demolish_cluster {
        detach_cluster_shards(target, &mut rigid, &[hit.collider], commands, registry, detached);
    }

    match registry.attached_body(hit.collider).or(hit.body) {
        Some(body) => vec![body],
        None => Vec::new(),
    }
}

/// Positive-radius contact: overlap the impact sphere, detach struck cluster
/// shards, then activate and promote everything unique in range.
#[allow(clippy::too_many_arguments)]
fn area_contact(
    target: Entity,
    hit: &SurfaceHit,
    config: &BulletImpactConfig,
    rapier: &ReadDefaultRapierContext,
    max_hits: usize,
    rigids: &mut RigidQuery,
    registry: &mut FractureRegistry,
    commands: &mut Commands,
    detached: &mut EventWriter<ShardDetached>,
) -> Vec<Entity> {
    let ctx = rapier.single();
    let mut overlaps: Vec<Entity> = Vec::new();
    ctx.intersections_with_shape(
        hit.point,
        Quat::IDENTITY,
        &Collider::ball(config.impact_radius),
        destructible_filter(),
        |entity| {
            overlaps.push(entity);
            overlaps.len() < max_hits
        },
    );

    // Empty overlap is a legitimate no-op, not an error
    if overlaps.is_empty() {
        return Vec::new();
    }

    // Cluster shard detach first, while the struck colliders are still bound
    if config.demolish_cluster {
        if let Ok((mut rigid, _, _)) = rigids.get_mut(target) {
            if rigid.kind == ObjectKind::ConnectedCluster {
                detach_cluster_shards(target, &mut rigid, &overlaps, commands, registry, detached);
            }
        }
    }

    let targets = collect_impact_targets(registry, &overlaps, config.affect_plain_bodies);

    // Group activation before promotion: impact-activatable objects wake first
    for &entity in &targets.rigids {
        if let Ok((mut rigid, _, _)) = rigids.get_mut(entity) {
            if rigid.activation.by_impact
                && matches!(rigid.sim_state, SimState::Inactive | SimState::Kinematic)
            {
                rigid.activate();
            }
        }
    }

    let mut force_targets = Vec::new();
    for &entity in &targets.rigids {
        if let Ok((mut rigid, mut shape, _)) = rigids.get_mut(entity) {
            if apply_area_transition(&mut rigid, shape.as_deref_mut(), config) {
                force_targets.push(entity);
            }
        }
    }
    force_targets.extend(&targets.plain_bodies);
    force_targets
}

/// No destructible wrapper: generic damage handlers, then the point-impact
/// handler or a plain-body velocity impulse.
fn fallback_hit(
    hit: &SurfaceHit,
    config: &BulletImpactConfig,
    damage_handlers: &mut Query<&mut DamageHandler>,
    impact_handlers: &mut Query<&mut PointImpactHandler>,
    forces: &mut EventWriter<ForceRequest>,
) {
    if config.damage > 0.0 {
        if let Ok(mut handler) = damage_handlers.get_mut(hit.collider) {
            handler.add_damage(config.damage);
        }
    }

    if config.impact_force > 0.0 {
        let impulse = hit.direction * config.impact_force;
        if let Ok(mut handler) = impact_handlers.get_mut(hit.collider) {
            handler.handle_point_impact(hit.point, impulse);
        } else if let Some(body) = hit.body {
            forces.send(ForceRequest::Point {
                targets: vec![body],
                direction: hit.direction,
                magnitude: config.impact_force,
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rigid::ActivationFlags;

    fn e(n: u32) -> Entity {
        Entity::from_raw(n)
    }

    #[test]
    fn test_config_validate_clamps() {
        let mut config = BulletImpactConfig {
            damage: -5.0,
            decal_size: 0.0,
            impact_radius: 3.0,
            impact_force: -1.0,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.damage, 0.0);
        assert_eq!(config.decal_size, 0.1);
        assert_eq!(config.impact_radius, MAX_BULLET_IMPACT_RADIUS);
        assert_eq!(config.impact_force, 0.0);
    }

    #[test]
    fn test_config_validate_idempotent() {
        let mut config = BulletImpactConfig { impact_radius: 0.3, decal_size: 0.5, ..Default::default() };
        config.validate();
        let once = config;
        config.validate();
        assert_eq!(config.impact_radius, once.impact_radius);
        assert_eq!(config.decal_size, once.decal_size);
    }

    #[test]
    fn test_collect_targets_dedups_by_identity() {
        let mut reg = FractureRegistry::default();
        // Two colliders on one body owning one wrapper
        reg.register_body_collider(e(1), e(10));
        reg.register_body_collider(e(2), e(10));
        reg.register_body_rigid(e(10), e(10));

        let targets = collect_impact_targets(&reg, &[e(1), e(2), e(1)], true);
        assert_eq!(targets.rigids, vec![e(10)]);
        assert!(targets.plain_bodies.is_empty());
    }

    #[test]
    fn test_collect_targets_splits_plain_bodies() {
        let mut reg = FractureRegistry::default();
        reg.register_body_collider(e(1), e(10));
        reg.register_body_rigid(e(10), e(10));
        // Body 11 has no wrapper
        reg.register_body_collider(e(2), e(11));
        reg.register_body_collider(e(3), e(11));

        let targets = collect_impact_targets(&reg, &[e(1), e(2), e(3)], true);
        assert_eq!(targets.rigids, vec![e(10)]);
        assert_eq!(targets.plain_bodies, vec![e(11)]);
    }

    #[test]
    fn test_collect_targets_respects_plain_body_gate() {
        let mut reg = FractureRegistry::default();
        reg.register_body_collider(e(2), e(11));
        let targets = collect_impact_targets(&reg, &[e(2)], false);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_collect_targets_empty_overlap_is_noop() {
        let reg = FractureRegistry::default();
        let targets = collect_impact_targets(&reg, &[], true);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_point_transition_promotes_and_activates_kinematic_mesh() {
        let mut rigid = FractureRigid::new(ObjectKind::Mesh, SimState::Kinematic)
            .with_activation(ActivationFlags { by_impact: true, by_activator: false });
        let mut shape = MeshShape::default();
        let config = BulletImpactConfig::default();

        apply_point_transition(&mut rigid, Some(&mut shape), &config);
        assert_eq!(rigid.sim_state, SimState::Dynamic);
        assert!(shape.convex);
    }

    #[test]
    fn test_point_transition_respects_affect_kinematic() {
        let mut rigid = FractureRigid::new(ObjectKind::Mesh, SimState::Kinematic);
        let mut shape = MeshShape::default();
        let config = BulletImpactConfig { affect_kinematic: false, ..Default::default() };

        apply_point_transition(&mut rigid, Some(&mut shape), &config);
        // Not impact-activatable and kinematic promotion disabled: untouched
        assert_eq!(rigid.sim_state, SimState::Kinematic);
        assert!(!shape.convex);
    }

    #[test]
    fn test_area_transition_skips_inactive_when_configured() {
        let mut rigid = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive);
        let config = BulletImpactConfig { affect_inactive: false, ..Default::default() };
        assert!(!apply_area_transition(&mut rigid, None, &config));

        let config = BulletImpactConfig { affect_inactive: true, ..Default::default() };
        assert!(apply_area_transition(&mut rigid, None, &config));
    }

    #[test]
    fn test_damage_handler_floors_at_zero() {
        let mut handler = DamageHandler { health: 10.0 };
        handler.add_damage(25.0);
        assert_eq!(handler.health, 0.0);
    }

    #[test]
    fn test_point_impact_handler_accumulates() {
        let mut handler = PointImpactHandler::default();
        handler.handle_point_impact(Vec3::X, Vec3::Y * 5.0);
        handler.handle_point_impact(Vec3::X, Vec3::Y * 3.0);
        assert_eq!(handler.accumulated, Vec3::Y * 8.0);
        assert_eq!(handler.last_point, Vec3::X);
    }
}
