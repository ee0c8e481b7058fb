//! Character Abstraction — capsule dimensions, links and resize notifications
//!
//! The fracture layer never owns the character controller; it consumes a
//! minimal view of it: capsule dimensions for sizing activation fields, a
//! resize notification stream for crouch/stand tracking, and an explicit link
//! record to the character's attached fracture capabilities. Links are
//! resolved once at attachment time instead of searched every frame.

use bevy::prelude::*;

/// Capsule dimensions of a character controller.
#[derive(Component, Debug, Clone, Copy)]
pub struct CharacterCapsule {
    pub height: f32,
    pub radius: f32,
}

impl Default for CharacterCapsule {
    fn default() -> Self {
        Self { height: 1.8, radius: 0.4 }
    }
}

/// The character controller changed its capsule (crouch, stand, swim...).
#[derive(Event, Debug, Clone, Copy)]
pub struct CharacterResized {
    pub character: Entity,
    pub height: f32,
    pub radius: f32,
}

/// Fracture capabilities attached to a character, resolved at attachment
/// time. The motion addon and wrecking ball live on the character entity
/// itself; the activation field is a separate child entity.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct CharacterLinks {
    pub activator: Option<Entity>,
}

/// Keep `CharacterCapsule` current from resize notifications.
pub fn apply_character_resizes(
    mut resizes: EventReader<CharacterResized>,
    mut capsules: Query<&mut CharacterCapsule>,
) {
    for resize in resizes.read() {
        if let Ok(mut capsule) = capsules.get_mut(resize.character) {
            capsule.height = resize.height;
            capsule.radius = resize.radius;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capsule_is_humanoid() {
        let capsule = CharacterCapsule::default();
        assert!(capsule.height > capsule.radius * 2.0);
    }
}
