//! Fracture Link Library
//!
//! This library binds a first-person character controller to a rapier-driven
//! procedural destruction model:
//! - Hit resolution and impact aggregation for bullets and explosions
//! - Simulation-state promotion (Inactive/Kinematic → Dynamic) with the
//!   convex-shape side effect rapier requires
//! - Directional and radial force distribution with chaos rotation
//! - Character activation fields with delayed, liveness-checked activation
//! - Trigger zones and motion-graph behaviours gating the above per character
//! - Key-value save-game persistence for activation fields
//!
//! The host app installs `RapierPhysicsPlugin`; this crate only consumes the
//! scene it simulates.

pub mod activator; // Character activation field (capsule zone, delays)
pub mod character; // Character capsule view, resize events, capability links
pub mod config; // Shared tunables (RON loadable)
pub mod effects; // Debris/dust burst requests
pub mod explosion; // Radial explosion effect
pub mod forces; // Force distributor (impulses, falloff, chaos)
pub mod hit; // Hit resolution and the attachment registry
pub mod impact; // Bullet impact pipeline and aggregation
pub mod logging; // Tracing initialization
pub mod motion; // Motion addon, collision toggle, graph behaviours
pub mod physics; // Collision layers and rapier bundles
pub mod rigid; // Destructible rigid model (states, damage, clusters)
pub mod save; // Key-value save-game serialization
pub mod wrecking; // Character wrecking ball
pub mod zones; // World trigger zones

use bevy::prelude::*;
use bevy_rapier3d::prelude::CollisionEvent;

// Re-export commonly used types
pub use activator::{ActivatorCommand, CharacterActivator, FieldAction, PendingActivations};
pub use character::{CharacterCapsule, CharacterLinks, CharacterResized};
pub use config::FractureLinkConfig;
pub use effects::{BurstKind, EffectEmitters, ParticleBurst};
pub use explosion::{ExplosionConfig, ExplosionEvent};
pub use forces::{ChaosRng, ForceRequest};
pub use hit::{FractureRegistry, ResolvedHit, SurfaceHit};
pub use impact::{BulletImpactConfig, BulletImpactEffect, BulletImpactEvent};
pub use motion::{MotionAddon, MotionStateEvent, ZoneAction};
pub use physics::PhysicsLayers;
pub use rigid::{DemolitionEvent, FractureRigid, ObjectKind, ShardDetached, SimState};
pub use wrecking::{CharacterHitEvent, WreckingBall};
pub use zones::FractureTriggerZone;

/// Installs every fracture-layer resource, event and system.
#[derive(Default)]
pub struct FractureLinkPlugin {
    pub config: FractureLinkConfig,
}

impl Plugin for FractureLinkPlugin {
    fn build(&self, app: &mut App) {
        let mut config = self.config.clone();
        config.validate();

        let mut rng = ChaosRng::default();
        rng.reseed(config.chaos_seed);

        app.insert_resource(config)
            .insert_resource(rng)
            .init_resource::<FractureRegistry>()
            .init_resource::<PendingActivations>()
            .add_event::<BulletImpactEvent>()
            .add_event::<ExplosionEvent>()
            .add_event::<CharacterHitEvent>()
            .add_event::<CharacterResized>()
            .add_event::<MotionStateEvent>()
            .add_event::<ActivatorCommand>()
            .add_event::<ParticleBurst>()
            .add_event::<DemolitionEvent>()
            .add_event::<ShardDetached>()
            .add_event::<ForceRequest>()
            // Installed by the rapier plugin in a full app; registering here
            // keeps headless test apps valid too
            .add_event::<CollisionEvent>()
            .add_systems(
                Update,
                (
                    // Registry and character state first
                    (hit::register_new_rigids, character::apply_character_resizes),
                    // Gating layers decide what is enabled this frame
                    (
                        zones::handle_zone_transitions,
                        motion::apply_motion_behaviours,
                        activator::setup_activators,
                        activator::apply_activator_commands,
                        activator::track_character_resizes,
                    )
                        .chain(),
                    // Impact processing
                    (
                        activator::handle_field_contacts,
                        activator::tick_pending_activations,
                        impact::process_bullet_impacts,
                        explosion::process_explosions,
                        wrecking::process_wrecking_hits,
                    )
                        .chain(),
                    // Mirror state changes into rapier, apply forces against
                    // the fresh body types, then drop stale bindings
                    (rigid::sync_sim_state, forces::distribute_forces, hit::prune_registry).chain(),
                )
                    .chain(),
            );
    }
}
