//! Character Activation Field — proximity capsule with delayed activation
//!
//! A sensor capsule wrapped around the character that wakes destructibles on
//! contact. State machine:
//! ```text
//! Disabled ──enable(thickness, delay)──▶ Enabled ──contact──▶ apply now
//!     ▲                                    │         (delay > 0) ──▶ pending,
//!     └───────────disable()───────────────┘                        fires after
//!                                                                  re-checking
//!                                                                  liveness
//! ```
//! Thickness and delay are configuration clamps, not errors. Pending entries
//! are plain data keyed by target identity, ticked by a system; a target
//! despawned mid-delay is dropped silently when the timer fires.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, ColliderDisabled, CollisionEvent};
use tracing::{debug, warn};

use crate::character::{CharacterCapsule, CharacterResized};
use crate::hit::FractureRegistry;
use crate::physics::{activation_capsule_dimensions, activation_field_bundle};
use crate::rigid::{detach_cluster_shards, FractureRigid, ObjectKind, ShardDetached, SimState};

/// Activation field thickness bounds, in world units.
pub const THICKNESS_RANGE: (f32, f32) = (0.05, 5.0);
/// Contact-to-activation delay bounds, in seconds.
pub const DELAY_RANGE: (f32, f32) = (0.0, 60.0);

pub fn clamp_thickness(value: f32) -> f32 {
    value.clamp(THICKNESS_RANGE.0, THICKNESS_RANGE.1)
}

pub fn clamp_delay(value: f32) -> f32 {
    value.clamp(DELAY_RANGE.0, DELAY_RANGE.1)
}

// ============================================================================
// Components & Events
// ============================================================================

/// Activation field attached to a character (as its own sensor entity).
#[derive(Component, Debug, Clone, Copy)]
pub struct CharacterActivator {
    pub enabled: bool,
    /// Radial expansion beyond the character capsule
    pub thickness: f32,
    /// Seconds between contact and activation
    pub delay: f32,
    /// Detach struck shards from connected clusters on contact
    pub demolish_cluster: bool,
    /// Enable the field as soon as it spawns
    pub enable_on_start: bool,
    /// Owning character, resolved at attachment time
    pub character: Entity,
}

impl CharacterActivator {
    pub fn new(character: Entity) -> Self {
        Self {
            enabled: false,
            thickness: 0.25,
            delay: 0.0,
            demolish_cluster: false,
            enable_on_start: false,
            character,
        }
    }

    pub fn set_thickness(&mut self, value: f32) {
        self.thickness = clamp_thickness(value);
    }

    pub fn set_delay(&mut self, value: f32) {
        self.delay = clamp_delay(value);
    }

    /// Enable with new, clamped parameters.
    pub fn enable_field(&mut self, thickness: f32, delay: f32) {
        self.set_thickness(thickness);
        self.set_delay(delay);
        self.enabled = true;
    }

    pub fn disable_field(&mut self) {
        self.enabled = false;
    }
}

/// Field control request, raised by trigger zones, motion behaviours and the
/// save layer.
#[derive(Event, Debug, Clone, Copy)]
pub struct ActivatorCommand {
    pub activator: Entity,
    pub action: FieldAction,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldAction {
    Enable { thickness: f32, delay: f32 },
    Disable,
}

// ============================================================================
// Pending activations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Wake the target
    Activate,
    /// Detach the contacted shard from the target cluster
    DetachShard,
}

#[derive(Debug, Clone, Copy)]
pub struct PendingEntry {
    pub target: Entity,
    /// Collider that made contact (the shard, for cluster detach)
    pub collider: Entity,
    pub action: PendingAction,
    pub remaining: f32,
}

/// Scheduled delayed activations. Entries hold no references to the target
/// beyond its identity; liveness is re-checked when a timer elapses.
#[derive(Resource, Debug, Default)]
pub struct PendingActivations {
    entries: Vec<PendingEntry>,
}

impl PendingActivations {
    /// Schedule an action. A duplicate (target, collider, action) key is
    /// ignored: the first contact owns the timer.
    pub fn schedule(&mut self, target: Entity, collider: Entity, action: PendingAction, delay: f32) {
        let duplicate = self
            .entries
            .iter()
            .any(|e| e.target == target && e.collider == collider && e.action == action);
        if !duplicate {
            self.entries.push(PendingEntry { target, collider, action, remaining: delay });
        }
    }

    /// Cancel everything scheduled against a target.
    pub fn cancel_for(&mut self, target: Entity) {
        self.entries.retain(|e| e.target != target);
    }

    /// Advance timers and drain the entries that are due.
    pub fn tick(&mut self, dt: f32) -> Vec<PendingEntry> {
        for entry in &mut self.entries {
            entry.remaining -= dt;
        }
        let (due, remaining): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.remaining <= 0.0);
        self.entries = remaining;
        due
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Set up newly spawned activators: attach the sensor capsule (disabled until
/// enabled), validate the character link, honor `enable_on_start`.
/// A missing character capsule disables the activator instead of failing.
pub fn setup_activators(
    mut commands: Commands,
    mut added: Query<(Entity, &mut CharacterActivator), Added<CharacterActivator>>,
    capsules: Query<&CharacterCapsule>,
    mut requests: EventWriter<ActivatorCommand>,
) {
    for (entity, mut activator) in &mut added {
        let Ok(capsule) = capsules.get(activator.character) else {
            warn!(?entity, "activator has no character capsule; disabling");
            activator.enabled = false;
            continue;
        };

        let (half_height, radius) =
            activation_capsule_dimensions(capsule.height, capsule.radius, activator.thickness);
        commands
            .entity(entity)
            .insert(activation_field_bundle(half_height, radius))
            .insert(ColliderDisabled);

        if activator.enable_on_start {
            requests.send(ActivatorCommand {
                activator: entity,
                action: FieldAction::Enable { thickness: activator.thickness, delay: activator.delay },
            });
        }
    }
}

/// Apply enable/disable requests: clamp parameters, resize the sensor from
/// the current character dimensions, toggle the collider.
pub fn apply_activator_commands(
    mut commands: Commands,
    mut requests: EventReader<ActivatorCommand>,
    mut activators: Query<&mut CharacterActivator>,
    capsules: Query<&CharacterCapsule>,
) {
    for request in requests.read() {
        let Ok(mut activator) = activators.get_mut(request.activator) else { continue };
        match request.action {
            FieldAction::Enable { thickness, delay } => {
                let Ok(capsule) = capsules.get(activator.character) else {
                    // No character to wrap; stay disabled
                    continue;
                };
                activator.enable_field(thickness, delay);
                let (half_height, radius) =
                    activation_capsule_dimensions(capsule.height, capsule.radius, activator.thickness);
                commands
                    .entity(request.activator)
                    .insert(Collider::capsule_y(half_height, radius))
                    .remove::<ColliderDisabled>();
                debug!(activator = ?request.activator, thickness = activator.thickness,
                       delay = activator.delay, "activation field enabled");
            }
            FieldAction::Disable => {
                activator.disable_field();
                commands.entity(request.activator).insert(ColliderDisabled);
                debug!(activator = ?request.activator, "activation field disabled");
            }
        }
    }
}

/// Track character geometry changes while enabled (crouch/stand).
pub fn track_character_resizes(
    mut commands: Commands,
    mut resizes: EventReader<CharacterResized>,
    activators: Query<(Entity, &CharacterActivator)>,
) {
    for resize in resizes.read() {
        for (entity, activator) in &activators {
            if !activator.enabled || activator.character != resize.character {
                continue;
            }
            let (half_height, radius) =
                activation_capsule_dimensions(resize.height, resize.radius, activator.thickness);
            commands.entity(entity).insert(Collider::capsule_y(half_height, radius));
        }
    }
}

/// React to destructibles entering an enabled field: wake them immediately or
/// schedule the wake after the configured delay.
pub fn handle_field_contacts(
    mut collisions: EventReader<CollisionEvent>,
    activators: Query<&CharacterActivator>,
    mut registry: ResMut<FractureRegistry>,
    mut rigids: Query<&mut FractureRigid>,
    mut pending: ResMut<PendingActivations>,
    mut commands: Commands,
    mut detached: EventWriter<ShardDetached>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(a, b, _) = event else { continue };

        let (activator_entity, other) = if activators.contains(*a) {
            (*a, *b)
        } else if activators.contains(*b) {
            (*b, *a)
        } else {
            continue;
        };

        let Ok(activator) = activators.get(activator_entity) else { continue };
        if !activator.enabled {
            continue;
        }

        let Some(target) = registry.resolve(other) else { continue };
        let Ok(mut rigid) = rigids.get_mut(target) else { continue };

        if rigid.activation.by_activator
            && matches!(rigid.sim_state, SimState::Inactive | SimState::Kinematic)
        {
            if activator.delay <= 0.0 {
                rigid.activate();
            } else {
                pending.schedule(target, other, PendingAction::Activate, activator.delay);
            }
        }

        if activator.demolish_cluster && rigid.kind == ObjectKind::ConnectedCluster {
            if activator.delay <= 0.0 {
                detach_cluster_shards(target, &mut rigid, &[other], &mut commands, &mut registry, &mut detached);
            } else {
                pending.schedule(target, other, PendingAction::DetachShard, activator.delay);
            }
        }
    }
}

/// Tick delayed activations. Every due entry re-validates that its target
/// still exists; a concurrently destroyed target is dropped silently.
pub fn tick_pending_activations(
    time: Res<Time>,
    mut pending: ResMut<PendingActivations>,
    mut rigids: Query<&mut FractureRigid>,
    mut registry: ResMut<FractureRegistry>,
    mut commands: Commands,
    mut detached: EventWriter<ShardDetached>,
) {
    let due = pending.tick(time.delta_secs());
    for entry in due {
        let Ok(mut rigid) = rigids.get_mut(entry.target) else {
            debug!(target = ?entry.target, "delayed activation target gone; dropped");
            continue;
        };
        match entry.action {
            PendingAction::Activate => {
                rigid.activate();
            }
            PendingAction::DetachShard => {
                detach_cluster_shards(
                    entry.target,
                    &mut rigid,
                    &[entry.collider],
                    &mut commands,
                    &mut registry,
                    &mut detached,
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn e(n: u32) -> Entity {
        Entity::from_raw(n)
    }

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_thickness(0.0), THICKNESS_RANGE.0);
        assert_eq!(clamp_thickness(9.0), THICKNESS_RANGE.1);
        assert_eq!(clamp_delay(-1.0), 0.0);
        assert_eq!(clamp_delay(120.0), DELAY_RANGE.1);
    }

    #[test]
    fn test_clamping_is_idempotent() {
        for value in [0.05, 0.25, 2.5, 5.0] {
            assert_eq!(clamp_thickness(clamp_thickness(value)), clamp_thickness(value));
        }
        for value in [0.0, 2.0, 60.0] {
            assert_eq!(clamp_delay(clamp_delay(value)), clamp_delay(value));
        }
    }

    #[test]
    fn test_enable_field_clamps_parameters() {
        let mut activator = CharacterActivator::new(e(1));
        activator.enable_field(10.0, -3.0);
        assert!(activator.enabled);
        assert_eq!(activator.thickness, THICKNESS_RANGE.1);
        assert_eq!(activator.delay, 0.0);
    }

    #[test]
    fn test_disable_keeps_parameters() {
        let mut activator = CharacterActivator::new(e(1));
        activator.enable_field(0.5, 2.0);
        activator.disable_field();
        assert!(!activator.enabled);
        assert_eq!(activator.thickness, 0.5);
        assert_eq!(activator.delay, 2.0);
    }

    #[test]
    fn test_schedule_dedups_first_contact() {
        let mut pending = PendingActivations::default();
        pending.schedule(e(1), e(2), PendingAction::Activate, 2.0);
        pending.schedule(e(1), e(2), PendingAction::Activate, 5.0);
        assert_eq!(pending.len(), 1);
        // Different action on the same pair is its own timer
        pending.schedule(e(1), e(2), PendingAction::DetachShard, 2.0);
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_tick_drains_due_entries() {
        let mut pending = PendingActivations::default();
        pending.schedule(e(1), e(2), PendingAction::Activate, 2.0);
        pending.schedule(e(3), e(4), PendingAction::Activate, 5.0);

        assert!(pending.tick(1.0).is_empty());
        let due = pending.tick(1.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].target, e(1));
        assert_eq!(pending.len(), 1);

        let due = pending.tick(10.0);
        assert_eq!(due.len(), 1);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_cancel_for_target() {
        let mut pending = PendingActivations::default();
        pending.schedule(e(1), e(2), PendingAction::Activate, 2.0);
        pending.schedule(e(1), e(9), PendingAction::DetachShard, 2.0);
        pending.schedule(e(3), e(4), PendingAction::Activate, 2.0);

        pending.cancel_for(e(1));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.tick(3.0)[0].target, e(3));
    }
}
