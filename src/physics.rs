//! Physics Integration — bevy_rapier3d collision layers and spawn helpers
//!
//! Provides:
//! - Collision group constants (CHARACTER, DESTRUCTIBLE, DEBRIS, SENSOR)
//! - Helper functions for spawning destructible objects and character capsules
//! - Capsule sizing for character-attached activation fields
//!
//! The fracture layer never steps the physics pipeline itself — the host app
//! installs `RapierPhysicsPlugin`; this module only describes how our entities
//! participate in it.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::rigid::SimState;

// ============================================================================
// Collision Layers
// ============================================================================

/// Collision group constants for physics filtering.
/// Each entity type belongs to a membership group and filters which groups it interacts with.
pub struct PhysicsLayers;

impl PhysicsLayers {
    /// Player characters
    pub const CHARACTER: Group = Group::GROUP_1;
    /// Static level geometry
    pub const WORLD: Group = Group::GROUP_2;
    /// Destructible objects managed by the fracture layer
    pub const DESTRUCTIBLE: Group = Group::GROUP_3;
    /// Loose debris spawned by demolitions
    pub const DEBRIS: Group = Group::GROUP_4;
    /// Sensor volumes (activation fields, trigger zones)
    pub const SENSOR: Group = Group::GROUP_5;
}

/// Query filter matching only destructible-layer colliders.
/// Used by every overlap/ray query the fracture layer issues.
pub fn destructible_filter() -> QueryFilter<'static> {
    QueryFilter::new().groups(CollisionGroups::new(Group::ALL, PhysicsLayers::DESTRUCTIBLE))
}

// ============================================================================
// Physics Component Bundles
// ============================================================================

/// Rapier rigid-body type matching a fracture simulation state.
/// Inactive objects are fixed in place until activated; kinematic objects are
/// animated externally; dynamic objects are fully simulated.
pub fn rigid_body_for(state: SimState) -> RigidBody {
    match state {
        SimState::Inactive => RigidBody::Fixed,
        SimState::Kinematic => RigidBody::KinematicPositionBased,
        SimState::Dynamic => RigidBody::Dynamic,
    }
}

/// Physics components for a destructible object in the given simulation state.
/// Collision events are enabled so activation fields can observe contacts.
pub fn destructible_physics_bundle(
    state: SimState,
    collider: Collider,
) -> (RigidBody, Collider, CollisionGroups, ActiveEvents) {
    (
        rigid_body_for(state),
        collider,
        CollisionGroups::new(
            PhysicsLayers::DESTRUCTIBLE,
            PhysicsLayers::CHARACTER | PhysicsLayers::WORLD | PhysicsLayers::DESTRUCTIBLE
                | PhysicsLayers::DEBRIS | PhysicsLayers::SENSOR,
        ),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// Physics components for a player character capsule.
/// Kinematic (driven by the character controller), collides with world and
/// destructible layers by default.
pub fn character_physics_bundle(height: f32, radius: f32) -> (RigidBody, Collider, CollisionGroups) {
    (
        RigidBody::KinematicPositionBased,
        Collider::capsule_y((height * 0.5 - radius).max(0.0), radius),
        CollisionGroups::new(
            PhysicsLayers::CHARACTER,
            PhysicsLayers::WORLD | PhysicsLayers::DESTRUCTIBLE | PhysicsLayers::SENSOR,
        ),
    )
}

/// Sensor capsule for a character-attached activation field.
/// Overlaps destructible objects without a physical collision response.
pub fn activation_field_bundle(
    half_height: f32,
    radius: f32,
) -> (Collider, Sensor, CollisionGroups, ActiveEvents) {
    (
        Collider::capsule_y(half_height, radius),
        Sensor,
        CollisionGroups::new(PhysicsLayers::SENSOR, PhysicsLayers::DESTRUCTIBLE),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// Sensor cuboid for a world-space trigger zone. Detects characters only.
pub fn trigger_zone_bundle(half_extents: Vec3) -> (Collider, Sensor, CollisionGroups, ActiveEvents) {
    (
        Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
        Sensor,
        CollisionGroups::new(PhysicsLayers::SENSOR, PhysicsLayers::CHARACTER),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// Capsule dimensions (half_height, radius) for an activation field expanded
/// beyond the character capsule by `thickness` on every side.
pub fn activation_capsule_dimensions(
    character_height: f32,
    character_radius: f32,
    thickness: f32,
) -> (f32, f32) {
    let total_height = character_height + thickness * 2.0;
    let radius = character_radius + thickness;
    let half_height = (total_height * 0.5 - radius).max(0.0);
    (half_height, radius)
}

// ============================================================================
// Tests
// ============================================================================
