//! Hit Resolution — collider to destructible lookup
//!
//! Maps a struck collider back to the `FractureRigid` that owns it. The
//! associations are registered once at attachment time into an explicit
//! registry instead of being re-searched through the scene graph on every hit.
//!
//! Resolution policy: a collider's attached rigid body, when present, is the
//! authoritative owner of the destructible wrapper. The collider-level
//! association is only consulted when no body is attached.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::rigid::FractureRigid;

// ============================================================================
// Impact Events
// ============================================================================

/// One physical contact, produced per raycast or collision callback and
/// discarded after processing.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    /// World-space contact point
    pub point: Vec3,
    /// Surface normal at the contact
    pub normal: Vec3,
    /// Normalized incoming direction
    pub direction: Vec3,
    /// Distance travelled to the contact
    pub distance: f32,
    /// Relative speed at the contact
    pub speed: f32,
    /// The struck collider entity
    pub collider: Entity,
    /// The collider's attached rigid body, if any
    pub body: Option<Entity>,
}

// ============================================================================
// Registry
// ============================================================================

/// Per-collider attachment record.
#[derive(Debug, Clone, Copy, Default)]
struct ColliderBinding {
    /// Rigid body the collider is attached to, if any
    body: Option<Entity>,
    /// Destructible wrapper sitting directly on the collider, if any
    rigid: Option<Entity>,
}

/// Explicit attachment registry: collider → body/wrapper, body → wrapper.
/// Populated when destructibles spawn, pruned when they despawn.
#[derive(Resource, Debug, Default)]
pub struct FractureRegistry {
    bindings: HashMap<Entity, ColliderBinding>,
    by_body: HashMap<Entity, Entity>,
}

impl FractureRegistry {
    /// Register a collider that belongs to a rigid body. The destructible
    /// wrapper, when one exists, lives on the body entity.
    pub fn register_body_collider(&mut self, collider: Entity, body: Entity) {
        self.bindings.entry(collider).or_default().body = Some(body);
    }

    /// Register a destructible wrapper sitting directly on a body-less collider.
    pub fn register_collider_rigid(&mut self, collider: Entity, rigid: Entity) {
        self.bindings.entry(collider).or_default().rigid = Some(rigid);
    }

    /// Register the destructible wrapper owning a rigid body.
    pub fn register_body_rigid(&mut self, body: Entity, rigid: Entity) {
        self.by_body.insert(body, rigid);
    }

    /// Drop every association involving the given entity. Called when a
    /// destructible despawns (demolition, shard detach re-registration).
    pub fn unregister(&mut self, entity: Entity) {
        self.by_body.remove(&entity);
        self.bindings.remove(&entity);
        self.bindings.retain(|_, b| b.body != Some(entity) && b.rigid != Some(entity));
    }

    /// Resolve a struck collider to its destructible wrapper.
    /// Body-level association wins; collider-level only applies when no body
    /// is attached. Unknown colliders resolve to none.
    pub fn resolve(&self, collider: Entity) -> Option<Entity> {
        let binding = self.bindings.get(&collider)?;
        match binding.body {
            Some(body) => self.by_body.get(&body).copied(),
            None => binding.rigid,
        }
    }

    /// The rigid body a collider is attached to, if any.
    pub fn attached_body(&self, collider: Entity) -> Option<Entity> {
        self.bindings.get(&collider).and_then(|b| b.body)
    }

    /// Resolve a full hit: wrapper entity if one exists, else the plain body.
    pub fn resolve_hit(&self, hit: &SurfaceHit) -> ResolvedHit {
        match self.resolve(hit.collider) {
            Some(rigid) => ResolvedHit::Rigid(rigid),
            None => match hit.body.or_else(|| self.attached_body(hit.collider)) {
                Some(body) => ResolvedHit::PlainBody(body),
                None => ResolvedHit::None,
            },
        }
    }
}

/// What a struck collider turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedHit {
    /// A destructible wrapper
    Rigid(Entity),
    /// A simulated body with no destructible wrapper
    PlainBody(Entity),
    /// Nothing we track
    None,
}

// ============================================================================
// Systems
// ============================================================================

/// Register newly spawned destructibles. A `FractureRigid` entity registers
/// itself as both body and collider owner (rapier collider-on-body layout);
/// cluster shards register as body-less colliders owned by the cluster.
pub fn register_new_rigids(
    mut registry: ResMut<FractureRegistry>,
    added: Query<(Entity, &FractureRigid), Added<FractureRigid>>,
) {
    for (entity, rigid) in &added {
        registry.register_body_rigid(entity, entity);
        registry.register_body_collider(entity, entity);
        for &shard in &rigid.shards {
            registry.register_collider_rigid(shard, entity);
        }
        tracing::debug!(?entity, kind = ?rigid.kind, "registered destructible");
    }
}

/// Prune registry entries for despawned destructibles.
pub fn prune_registry(
    mut registry: ResMut<FractureRegistry>,
    mut removed: RemovedComponents<FractureRigid>,
) {
    for entity in removed.read() {
        registry.unregister(entity);
    }
}

// ============================================================================
// Tests
// ============================================================================
