//! Trigger Zones — world volumes configuring character destruction behavior
//!
//! A level designer places sensor volumes that switch a character's fracture
//! capabilities on entry and optionally revert them on exit: the activation
//! field, the destructible-collision toggle, and the wrecking ball. Each
//! capability carries its own tri-state action; `Ignore` means the zone has
//! no opinion about it.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionEvent, CollisionGroups};
use tracing::debug;

use crate::activator::ActivatorCommand;
use crate::character::CharacterLinks;
use crate::motion::{
    apply_activator_action, apply_collision_action, apply_wrecking_action, ZoneAction,
};
use crate::wrecking::WreckingBall;

// ============================================================================
// Component
// ============================================================================

/// Zone configuration. Spawn together with [`crate::physics::trigger_zone_bundle`].
#[derive(Component, Debug, Clone, Copy)]
pub struct FractureTriggerZone {
    // Activation field
    pub activator_action: ZoneAction,
    pub activator_thickness: f32,
    pub activator_delay: f32,
    pub disable_activator_on_exit: bool,

    // Character collisions
    pub collisions_action: ZoneAction,
    pub flip_collisions_on_exit: bool,

    // Wrecking ball
    pub wrecking_action: ZoneAction,
    pub relative_speed_threshold: f32,
    pub wrecking_force: f32,
    pub wrecking_radius: f32,
    pub wrecking_offset: f32,
    pub disable_wrecking_on_exit: bool,
}

impl Default for FractureTriggerZone {
    fn default() -> Self {
        Self {
            activator_action: ZoneAction::Ignore,
            activator_thickness: 0.5,
            activator_delay: 0.0,
            disable_activator_on_exit: true,
            collisions_action: ZoneAction::Ignore,
            flip_collisions_on_exit: true,
            wrecking_action: ZoneAction::Ignore,
            relative_speed_threshold: 10.0,
            wrecking_force: 20.0,
            wrecking_radius: 4.0,
            wrecking_offset: 0.1,
            disable_wrecking_on_exit: true,
        }
    }
}

impl FractureTriggerZone {
    /// Action to apply to collisions when the character leaves the zone.
    /// Flipping reverts what entry did; a zone with no opinion stays silent.
    pub fn exit_collisions_action(&self) -> ZoneAction {
        if !self.flip_collisions_on_exit {
            return ZoneAction::Ignore;
        }
        match self.collisions_action {
            ZoneAction::Enable => ZoneAction::Disable,
            ZoneAction::Disable => ZoneAction::Enable,
            ZoneAction::Ignore => ZoneAction::Ignore,
        }
    }

    /// Action to apply to the activation field on exit.
    pub fn exit_activator_action(&self) -> ZoneAction {
        if self.activator_action == ZoneAction::Enable && self.disable_activator_on_exit {
            ZoneAction::Disable
        } else {
            ZoneAction::Ignore
        }
    }

    /// Action to apply to the wrecking ball on exit.
    pub fn exit_wrecking_action(&self) -> ZoneAction {
        if self.wrecking_action == ZoneAction::Enable && self.disable_wrecking_on_exit {
            ZoneAction::Disable
        } else {
            ZoneAction::Ignore
        }
    }
}

// ============================================================================
// System
// ============================================================================

/// Apply zone actions as characters cross zone boundaries.
pub fn handle_zone_transitions(
    mut collisions: EventReader<CollisionEvent>,
    zones: Query<&FractureTriggerZone>,
    characters: Query<&CharacterLinks>,
    mut groups: Query<&mut CollisionGroups>,
    mut balls: Query<&mut WreckingBall>,
    mut activator_out: EventWriter<ActivatorCommand>,
) {
    for event in collisions.read() {
        let (zone_entity, other, entered) = match event {
            CollisionEvent::Started(a, b, _) if zones.contains(*a) => (*a, *b, true),
            CollisionEvent::Started(a, b, _) if zones.contains(*b) => (*b, *a, true),
            CollisionEvent::Stopped(a, b, _) if zones.contains(*a) => (*a, *b, false),
            CollisionEvent::Stopped(a, b, _) if zones.contains(*b) => (*b, *a, false),
            _ => continue,
        };

        // Only characters drive zones
        let Ok(links) = characters.get(other) else { continue };
        let Ok(zone) = zones.get(zone_entity) else { continue };
        let character = other;

        let (activator_action, collisions_action, wrecking_action) = if entered {
            (zone.activator_action, zone.collisions_action, zone.wrecking_action)
        } else {
            (zone.exit_activator_action(), zone.exit_collisions_action(), zone.exit_wrecking_action())
        };

        apply_activator_action(
            activator_action,
            links.activator,
            zone.activator_thickness,
            zone.activator_delay,
            &mut activator_out,
        );

        if let Ok(mut groups) = groups.get_mut(character) {
            apply_collision_action(collisions_action, &mut groups);
        }

        if let Ok(mut ball) = balls.get_mut(character) {
            apply_wrecking_action(
                wrecking_action,
                &mut ball,
                zone.relative_speed_threshold,
                zone.wrecking_force,
                zone.wrecking_radius,
                zone.wrecking_offset,
            );
        }

        debug!(?zone_entity, ?character, entered, "trigger zone transition");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_collisions_flip() {
        let zone = FractureTriggerZone {
            collisions_action: ZoneAction::Enable,
            flip_collisions_on_exit: true,
            ..Default::default()
        };
        assert_eq!(zone.exit_collisions_action(), ZoneAction::Disable);

        let zone = FractureTriggerZone {
            collisions_action: ZoneAction::Disable,
            flip_collisions_on_exit: true,
            ..Default::default()
        };
        assert_eq!(zone.exit_collisions_action(), ZoneAction::Enable);
    }

    #[test]
    fn test_exit_collisions_no_flip() {
        let zone = FractureTriggerZone {
            collisions_action: ZoneAction::Enable,
            flip_collisions_on_exit: false,
            ..Default::default()
        };
        assert_eq!(zone.exit_collisions_action(), ZoneAction::Ignore);
    }

    #[test]
    fn test_exit_ignores_stay_ignored() {
        let zone = FractureTriggerZone::default();
        assert_eq!(zone.exit_activator_action(), ZoneAction::Ignore);
        assert_eq!(zone.exit_collisions_action(), ZoneAction::Ignore);
        assert_eq!(zone.exit_wrecking_action(), ZoneAction::Ignore);
    }

    #[test]
    fn test_exit_activator_and_wrecking_disable_after_enable() {
        let zone = FractureTriggerZone {
            activator_action: ZoneAction::Enable,
            wrecking_action: ZoneAction::Enable,
            ..Default::default()
        };
        assert_eq!(zone.exit_activator_action(), ZoneAction::Disable);
        assert_eq!(zone.exit_wrecking_action(), ZoneAction::Disable);

        let zone = FractureTriggerZone {
            activator_action: ZoneAction::Enable,
            disable_activator_on_exit: false,
            wrecking_action: ZoneAction::Enable,
            disable_wrecking_on_exit: false,
            ..Default::default()
        };
        assert_eq!(zone.exit_activator_action(), ZoneAction::Ignore);
        assert_eq!(zone.exit_wrecking_action(), ZoneAction::Ignore);
    }

    #[test]
    fn test_disable_zone_exit_does_not_reenable_activator() {
        // A zone that disables the field on entry must not enable it on exit
        let zone = FractureTriggerZone {
            activator_action: ZoneAction::Disable,
            disable_activator_on_exit: true,
            ..Default::default()
        };
        assert_eq!(zone.exit_activator_action(), ZoneAction::Ignore);
    }
}
