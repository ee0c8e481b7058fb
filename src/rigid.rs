//! Destructible Rigid Model — simulation state, activation and damage
//!
//! `FractureRigid` is the crate's view of one destructible object owned by the
//! host's destruction library: its simulation state, object kind, activation
//! flags and damage budget. Mesh fracturing itself stays on the library side;
//! this module implements the state transitions the interaction layer drives:
//!
//! ```text
//! Inactive ──activate()──────────────▶ Dynamic
//! Kinematic ─activate()/promote()────▶ Dynamic (+ convex collision shape)
//! ```
//!
//! Promotion is one-way: nothing in this crate ever demotes a Dynamic object.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// Components
// ============================================================================

/// Simulation state of a destructible object.
/// Governs whether physics forces affect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimState {
    /// Excluded from simulation until activated
    Inactive,
    /// Animated externally; forces are no-ops until promoted
    Kinematic,
    /// Fully simulated
    Dynamic,
}

/// Object category: a single fractured mesh, or a cluster of physically
/// linked shards that detach under impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Mesh,
    ConnectedCluster,
}

/// Which events may wake this object out of Inactive/Kinematic.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ActivationFlags {
    /// Woken by bullet/explosion/wrecking-ball impacts
    pub by_impact: bool,
    /// Woken by a character activation field
    pub by_activator: bool,
}

/// Accumulating damage budget. When `current` reaches `max` the object is
/// demolished and the destruction library replaces it with fragments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DamageModel {
    pub enabled: bool,
    pub max: f32,
    pub current: f32,
}

impl Default for DamageModel {
    fn default() -> Self {
        Self { enabled: false, max: 100.0, current: 0.0 }
    }
}

/// Outcome of one damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Damage model disabled — nothing recorded
    Ignored,
    /// Damage recorded, threshold not reached
    Damaged,
    /// Threshold crossed by this application
    Demolished,
}

/// Collision geometry authoring state for a mesh-shaped destructible.
/// Rapier only accepts convex shapes on dynamic bodies, so promotion out of
/// Kinematic must set `convex` before the body simulates.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MeshShape {
    pub convex: bool,
}

/// One destructible object tracked by the fracture layer.
#[derive(Component, Debug, Clone)]
pub struct FractureRigid {
    pub sim_state: SimState,
    pub kind: ObjectKind,
    pub activation: ActivationFlags,
    pub damage: DamageModel,
    /// Shard collider entities still attached (ConnectedCluster only)
    pub shards: Vec<Entity>,
    /// Set once demolition fired; the entity is on its way out
    pub demolished: bool,
}

impl FractureRigid {
    pub fn new(kind: ObjectKind, sim_state: SimState) -> Self {
        Self {
            sim_state,
            kind,
            activation: ActivationFlags::default(),
            damage: DamageModel::default(),
            shards: Vec::new(),
            demolished: false,
        }
    }

    pub fn with_activation(mut self, activation: ActivationFlags) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_damage(mut self, max: f32) -> Self {
        self.damage = DamageModel { enabled: true, max, current: 0.0 };
        self
    }

    pub fn with_shards(mut self, shards: Vec<Entity>) -> Self {
        self.shards = shards;
        self
    }

    /// Wake the object into the simulation. Returns true if the state changed.
    pub fn activate(&mut self) -> bool {
        match self.sim_state {
            SimState::Inactive | SimState::Kinematic => {
                self.sim_state = SimState::Dynamic;
                true
            }
            SimState::Dynamic => false,
        }
    }

    /// Promote a kinematic object to dynamic, marking its collision shape
    /// convex. Rapier's response to a non-convex dynamic mesh is undefined, so
    /// the convex flag is a required side effect of this transition.
    pub fn promote_kinematic(&mut self, shape: &mut MeshShape) -> bool {
        if self.sim_state != SimState::Kinematic {
            return false;
        }
        self.sim_state = SimState::Dynamic;
        shape.convex = true;
        true
    }

    /// Apply damage scaled by the impact decal size.
    pub fn apply_damage(&mut self, amount: f32, decal_size: f32) -> DamageOutcome {
        if !self.damage.enabled || self.demolished {
            return DamageOutcome::Ignored;
        }
        self.damage.current += amount * decal_size.max(0.0);
        if self.damage.current >= self.damage.max {
            self.demolished = true;
            DamageOutcome::Demolished
        } else {
            DamageOutcome::Damaged
        }
    }

    /// Detach the struck shards from a connected cluster. Shards not part of
    /// this cluster are ignored; each shard detaches at most once.
    pub fn detach_shards(&mut self, struck: &[Entity]) -> Vec<Entity> {
        if self.kind != ObjectKind::ConnectedCluster {
            return Vec::new();
        }
        let mut detached = Vec::new();
        for &collider in struck {
            if let Some(idx) = self.shards.iter().position(|&s| s == collider) {
                self.shards.swap_remove(idx);
                detached.push(collider);
            }
        }
        detached
    }
}

// ============================================================================
// Events
// ============================================================================

/// A destructible crossed its damage threshold and is being demolished.
/// The destruction library responds by fracturing the mesh into fragments.
#[derive(Event, Debug, Clone)]
pub struct DemolitionEvent {
    pub entity: Entity,
    pub point: Vec3,
}

/// A shard was separated from a connected cluster and now simulates on its own.
#[derive(Event, Debug, Clone)]
pub struct ShardDetached {
    pub cluster: Entity,
    pub shard: Entity,
}

// ============================================================================
// Cluster demolition
// ============================================================================

/// Detach the struck shards from a connected cluster and set each one up as a
/// standalone dynamic destructible: its own wrapper, a convex shape, a dynamic
/// body, and fresh registry bindings. Returns the number of shards detached.
pub fn detach_cluster_shards(
    cluster: Entity,
    rigid: &mut FractureRigid,
    struck: &[Entity],
    commands: &mut Commands,
    registry: &mut crate::hit::FractureRegistry,
    events: &mut EventWriter<ShardDetached>,
) -> usize {
    use bevy_rapier3d::prelude::{RigidBody, Velocity};

    let detached = rigid.detach_shards(struck);
    for &shard in &detached {
        commands.entity(shard).insert((
            FractureRigid::new(ObjectKind::Mesh, SimState::Dynamic),
            MeshShape { convex: true },
            RigidBody::Dynamic,
            Velocity::zero(),
        ));
        registry.register_body_collider(shard, shard);
        registry.register_body_rigid(shard, shard);
        // Replace the collider-level association too, or the shard would be
        // pruned along with the cluster when the cluster despawns
        registry.register_collider_rigid(shard, shard);
        events.send(ShardDetached { cluster, shard });
    }
    detached.len()
}

// ============================================================================
// Systems
// ============================================================================

/// Mirror `FractureRigid.sim_state` into the rapier body type whenever it
/// changes. Newly dynamic bodies get a zeroed velocity so the force
/// distributor has something to write into.
pub fn sync_sim_state(
    mut commands: Commands,
    changed: Query<(Entity, &FractureRigid), Changed<FractureRigid>>,
) {
    use bevy_rapier3d::prelude::{RigidBody, Velocity};

    for (entity, rigid) in &changed {
        let body = crate::physics::rigid_body_for(rigid.sim_state);
        let mut cmd = commands.entity(entity);
        cmd.insert(body);
        if rigid.sim_state == SimState::Dynamic {
            cmd.insert_if_new(Velocity::zero());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_promotes_inactive_and_kinematic() {
        let mut r = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive);
        assert!(r.activate());
        assert_eq!(r.sim_state, SimState::Dynamic);

        let mut r = FractureRigid::new(ObjectKind::Mesh, SimState::Kinematic);
        assert!(r.activate());
        assert_eq!(r.sim_state, SimState::Dynamic);
    }

    #[test]
    fn test_activate_is_one_way() {
        let mut r = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive);
        assert!(r.activate());
        // Second activation is a no-op; state never regresses
        assert!(!r.activate());
        assert_eq!(r.sim_state, SimState::Dynamic);
    }

    #[test]
    fn test_promote_kinematic_sets_convex() {
        let mut r = FractureRigid::new(ObjectKind::Mesh, SimState::Kinematic);
        let mut shape = MeshShape::default();
        assert!(r.promote_kinematic(&mut shape));
        assert_eq!(r.sim_state, SimState::Dynamic);
        assert!(shape.convex);
    }

    #[test]
    fn test_promote_ignores_non_kinematic() {
        let mut shape = MeshShape::default();

        let mut inactive = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive);
        assert!(!inactive.promote_kinematic(&mut shape));
        assert_eq!(inactive.sim_state, SimState::Inactive);
        assert!(!shape.convex);

        let mut dynamic = FractureRigid::new(ObjectKind::Mesh, SimState::Dynamic);
        assert!(!dynamic.promote_kinematic(&mut shape));
        assert!(!shape.convex);
    }

    #[test]
    fn test_damage_disabled_is_ignored() {
        let mut r = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive);
        assert_eq!(r.apply_damage(1000.0, 1.0), DamageOutcome::Ignored);
        assert_eq!(r.damage.current, 0.0);
    }

    #[test]
    fn test_damage_accumulates_to_demolition() {
        let mut r = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive).with_damage(100.0);
        assert_eq!(r.apply_damage(60.0, 1.0), DamageOutcome::Damaged);
        assert_eq!(r.apply_damage(60.0, 1.0), DamageOutcome::Demolished);
        assert!(r.demolished);
        // Further damage to a demolished object is ignored
        assert_eq!(r.apply_damage(60.0, 1.0), DamageOutcome::Ignored);
    }

    #[test]
    fn test_damage_scales_with_decal_size() {
        let mut r = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive).with_damage(100.0);
        r.apply_damage(25.0, 2.0);
        assert_eq!(r.damage.current, 50.0);
    }

    #[test]
    fn test_detach_shards_identity_matched() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let c = Entity::from_raw(3);
        let mut cluster = FractureRigid::new(ObjectKind::ConnectedCluster, SimState::Inactive)
            .with_shards(vec![a, b]);

        let detached = cluster.detach_shards(&[b, c]);
        assert_eq!(detached, vec![b]);
        assert_eq!(cluster.shards, vec![a]);

        // b already detached; a second strike does nothing
        assert!(cluster.detach_shards(&[b]).is_empty());
    }

    #[test]
    fn test_detach_shards_noop_for_mesh() {
        let a = Entity::from_raw(1);
        let mut mesh = FractureRigid::new(ObjectKind::Mesh, SimState::Inactive);
        assert!(mesh.detach_shards(&[a]).is_empty());
    }
}
