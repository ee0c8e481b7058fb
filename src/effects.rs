//! Impact Particle Effects — debris and dust burst requests
//!
//! Destructibles declare emitter descriptors; qualifying impacts turn them
//! into `ParticleBurst` events for a downstream presentation layer.
//! Emission is fire-and-forget: nothing here waits on, or fails because of,
//! the consumer.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Particle burst category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstKind {
    Debris,
    Dust,
}

/// One declared emitter on a destructible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterSpec {
    pub kind: BurstKind,
    /// Fire this emitter on direct impacts
    pub on_impact: bool,
}

/// Emitter descriptor list attached alongside a `FractureRigid`.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectEmitters {
    pub emitters: Vec<EmitterSpec>,
}

impl EffectEmitters {
    pub fn has(&self, kind: BurstKind) -> bool {
        self.emitters.iter().any(|e| e.kind == kind)
    }
}

/// Request for a particle burst at an impact site.
#[derive(Event, Debug, Clone)]
pub struct ParticleBurst {
    pub source: Entity,
    pub kind: BurstKind,
    pub position: Vec3,
    pub normal: Vec3,
}

/// Emit impact bursts for every matching `on_impact` emitter on the struck
/// rigid. `debris`/`dust` are the weapon-side gates; a rigid with no emitters
/// of a kind emits nothing for it.
pub fn emit_impact_bursts(
    source: Entity,
    emitters: Option<&EffectEmitters>,
    position: Vec3,
    normal: Vec3,
    debris: bool,
    dust: bool,
    out: &mut EventWriter<ParticleBurst>,
) {
    let Some(emitters) = emitters else { return };
    for spec in &emitters.emitters {
        if !spec.on_impact {
            continue;
        }
        let gated = match spec.kind {
            BurstKind::Debris => debris,
            BurstKind::Dust => dust,
        };
        if gated {
            out.send(ParticleBurst { source, kind: spec.kind, position, normal });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_kind() {
        let emitters = EffectEmitters {
            emitters: vec![EmitterSpec { kind: BurstKind::Dust, on_impact: true }],
        };
        assert!(emitters.has(BurstKind::Dust));
        assert!(!emitters.has(BurstKind::Debris));
    }
}
