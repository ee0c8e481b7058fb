//! Motion Integration — collision toggle, chaos tuning, graph behaviours
//!
//! The motion addon is the character-side half of the fracture layer: it owns
//! the destructible-collision toggle and the chaos intensity the wrecking
//! ball uses. Motion-graph states carry behaviour nodes that enable/disable
//! capabilities on state enter/exit through an explicit tri-state action —
//! `Ignore` leaves the current state untouched.
//!
//! The collision toggle is an idempotent set/clear pair on the rapier filter
//! group. Toggling by XOR would silently re-enable a bit some other caller
//! already cleared.

use bevy::prelude::*;
use bevy_rapier3d::prelude::CollisionGroups;
use serde::{Deserialize, Serialize};

use crate::activator::{clamp_thickness, ActivatorCommand, FieldAction};
use crate::character::CharacterLinks;
use crate::physics::PhysicsLayers;
use crate::wrecking::WreckingBall;

// ============================================================================
// Tri-state action
// ============================================================================

/// What a zone or behaviour does with a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoneAction {
    Enable,
    Disable,
    /// Leave the capability exactly as it is
    #[default]
    Ignore,
}

// ============================================================================
// Motion addon
// ============================================================================

/// Character-side fracture tuning.
#[derive(Component, Debug, Clone, Copy)]
pub struct MotionAddon {
    /// Random rotation intensity handed to the wrecking ball, in [0, 1]
    pub chaos: f32,
}

impl Default for MotionAddon {
    fn default() -> Self {
        Self { chaos: 0.5 }
    }
}

/// Let the character's capsule collide with destructible objects. Idempotent.
pub fn enable_destructible_collisions(groups: &mut CollisionGroups) {
    groups.filters.insert(PhysicsLayers::DESTRUCTIBLE);
}

/// Stop the character's capsule from colliding with destructibles. Idempotent.
pub fn disable_destructible_collisions(groups: &mut CollisionGroups) {
    groups.filters.remove(PhysicsLayers::DESTRUCTIBLE);
}

pub fn destructible_collisions_enabled(groups: &CollisionGroups) -> bool {
    groups.filters.contains(PhysicsLayers::DESTRUCTIBLE)
}

// ============================================================================
// Graph behaviour nodes
// ============================================================================

/// Activation-field behaviour on a motion-graph state.
#[derive(Component, Debug, Clone, Copy)]
pub struct ActivatorBehaviour {
    pub on_enter: ZoneAction,
    pub on_exit: ZoneAction,
    pub thickness: f32,
    pub delay: f32,
}

impl Default for ActivatorBehaviour {
    fn default() -> Self {
        Self { on_enter: ZoneAction::Enable, on_exit: ZoneAction::Disable, thickness: 0.5, delay: 0.0 }
    }
}

impl ActivatorBehaviour {
    pub fn validate(&mut self) {
        self.thickness = clamp_thickness(self.thickness);
    }
}

/// Destructible-collision behaviour on a motion-graph state.
#[derive(Component, Debug, Clone, Copy)]
pub struct CollisionBehaviour {
    pub on_enter: ZoneAction,
    pub on_exit: ZoneAction,
}

impl Default for CollisionBehaviour {
    fn default() -> Self {
        Self { on_enter: ZoneAction::Enable, on_exit: ZoneAction::Disable }
    }
}

/// Wrecking-ball behaviour on a motion-graph state.
#[derive(Component, Debug, Clone, Copy)]
pub struct WreckingBallBehaviour {
    pub on_enter: ZoneAction,
    pub on_exit: ZoneAction,
    pub max_force: f32,
    pub radius: f32,
    pub offset: f32,
    pub relative_speed_threshold: f32,
}

impl Default for WreckingBallBehaviour {
    fn default() -> Self {
        Self {
            on_enter: ZoneAction::Enable,
            on_exit: ZoneAction::Disable,
            max_force: 10.0,
            radius: 2.0,
            offset: 0.1,
            relative_speed_threshold: 10.0,
        }
    }
}

/// A character entered or left a motion-graph state carrying behaviour nodes.
#[derive(Event, Debug, Clone, Copy)]
pub struct MotionStateEvent {
    pub state: Entity,
    pub character: Entity,
    pub transition: StateTransition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    Entered,
    Exited,
}

// ============================================================================
// Action application helpers (shared with trigger zones)
// ============================================================================

/// Route an activation-field action to the character's linked activator.
/// No activator attached means no-op, not an error.
pub fn apply_activator_action(
    action: ZoneAction,
    activator: Option<Entity>,
    thickness: f32,
    delay: f32,
    out: &mut EventWriter<ActivatorCommand>,
) {
    let Some(activator) = activator else { return };
    match action {
        ZoneAction::Enable => {
            out.send(ActivatorCommand { activator, action: FieldAction::Enable { thickness, delay } });
        }
        ZoneAction::Disable => {
            out.send(ActivatorCommand { activator, action: FieldAction::Disable });
        }
        ZoneAction::Ignore => {}
    }
}

/// Apply a collision toggle action to a character's filter groups.
pub fn apply_collision_action(action: ZoneAction, groups: &mut CollisionGroups) {
    match action {
        ZoneAction::Enable => enable_destructible_collisions(groups),
        ZoneAction::Disable => disable_destructible_collisions(groups),
        ZoneAction::Ignore => {}
    }
}

/// Apply a wrecking-ball action to a character's ball state.
pub fn apply_wrecking_action(
    action: ZoneAction,
    ball: &mut WreckingBall,
    relative_speed_threshold: f32,
    max_force: f32,
    radius: f32,
    offset: f32,
) {
    match action {
        ZoneAction::Enable => ball.arm(relative_speed_threshold, max_force, radius, offset),
        ZoneAction::Disable => ball.disarm(),
        ZoneAction::Ignore => {}
    }
}

// ============================================================================
// System
// ============================================================================

/// Apply behaviour nodes when characters enter or leave motion-graph states.
pub fn apply_motion_behaviours(
    mut events: EventReader<MotionStateEvent>,
    behaviours: Query<(
        Option<&ActivatorBehaviour>,
        Option<&CollisionBehaviour>,
        Option<&WreckingBallBehaviour>,
    )>,
    links: Query<&CharacterLinks>,
    mut groups: Query<&mut CollisionGroups>,
    mut balls: Query<&mut WreckingBall>,
    mut activator_out: EventWriter<ActivatorCommand>,
) {
    for event in events.read() {
        let Ok((activator_node, collision_node, wrecking_node)) = behaviours.get(event.state) else {
            continue;
        };

        if let Some(node) = activator_node {
            let action = match event.transition {
                StateTransition::Entered => node.on_enter,
                StateTransition::Exited => node.on_exit,
            };
            let activator = links.get(event.character).ok().and_then(|l| l.activator);
            apply_activator_action(action, activator, node.thickness, node.delay, &mut activator_out);
        }

        if let Some(node) = collision_node {
            let action = match event.transition {
                StateTransition::Entered => node.on_enter,
                StateTransition::Exited => node.on_exit,
            };
            if let Ok(mut groups) = groups.get_mut(event.character) {
                apply_collision_action(action, &mut groups);
            }
        }

        if let Some(node) = wrecking_node {
            let action = match event.transition {
                StateTransition::Entered => node.on_enter,
                StateTransition::Exited => node.on_exit,
            };
            if let Ok(mut ball) = balls.get_mut(event.character) {
                apply_wrecking_action(
                    action,
                    &mut ball,
                    node.relative_speed_threshold,
                    node.max_force,
                    node.radius,
                    node.offset,
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
