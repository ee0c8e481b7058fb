//! Force Distribution — directional and radial impulses with chaos rotation
//!
//! Impact handlers decide *who* gets pushed and emit a `ForceRequest`; this
//! module decides *how*. Requests are derived per impact and consumed the
//! same frame — nothing is persisted. Two force shapes exist:
//! - point: bullet hits, applied as a velocity change along the shot
//! - radial: explosions and wrecking-ball bursts, mass-dependent via rapier
//!   `ExternalImpulse`, with linear falloff and an upward lift bias
//!
//! The distributor runs after state transitions have been mirrored into the
//! rapier body type. Bodies that are absent or still kinematic at that point
//! are skipped; a force on a kinematic body is a no-op in rapier and is
//! treated as such here rather than as an error.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{ExternalImpulse, RigidBody, Velocity};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

/// Chaos rotation bound at full intensity and zero distance, in degrees/s.
pub const CHAOS_MAX_DEG: f32 = 90.0;

/// Chaos intensities below this are treated as off.
pub const CHAOS_EPSILON: f32 = 0.01;

// ============================================================================
// Chaos RNG
// ============================================================================

/// Deterministic RNG driving random chaos rotation. Seeded with a fixed value
/// by default so replays and tests are reproducible; hosts may reseed.
#[derive(Resource, Debug)]
pub struct ChaosRng(pub Xoshiro256PlusPlus);

impl Default for ChaosRng {
    fn default() -> Self {
        Self(Xoshiro256PlusPlus::seed_from_u64(0x5eed_f0c5))
    }
}

impl ChaosRng {
    pub fn reseed(&mut self, seed: u64) {
        self.0 = Xoshiro256PlusPlus::seed_from_u64(seed);
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Parameters of one radial force application.
#[derive(Debug, Clone, Copy)]
pub struct RadialParams {
    pub center: Vec3,
    pub radius: f32,
    pub max_force: f32,
    /// Vertical lift bias: the apparent push origin is shifted down by this
    /// amount, giving outward impulses an upward component.
    pub lift: f32,
}

/// One force application derived from an impact. The target list is already
/// deduplicated by the aggregation step; each body is pushed at most once.
#[derive(Event, Debug, Clone)]
pub enum ForceRequest {
    /// Velocity change along a shot direction
    Point { targets: Vec<Entity>, direction: Vec3, magnitude: f32 },
    /// Outward impulse from a blast center, with chaos rotation
    Radial { targets: Vec<Entity>, params: RadialParams, chaos: f32 },
}

// ============================================================================
// Pure force math
// ============================================================================

/// Linear falloff factor: 1.0 at the center, 0.0 at `radius` and beyond.
/// A non-positive radius means point-blank (no falloff).
pub fn explosion_falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 1.0;
    }
    (1.0 - distance / radius).clamp(0.0, 1.0)
}

/// Radial impulse on a body at `body_pos`: outward from the (lift-shifted)
/// center, scaled by the linear falloff from the true center.
pub fn radial_impulse(params: &RadialParams, body_pos: Vec3) -> Vec3 {
    let falloff = explosion_falloff(body_pos.distance(params.center), params.radius);
    if falloff <= 0.0 {
        return Vec3::ZERO;
    }
    let push_origin = params.center - Vec3::Y * params.lift;
    let dir = (body_pos - push_origin).normalize_or_zero();
    // Dead-center overlap has no direction; push straight up
    let dir = if dir == Vec3::ZERO { Vec3::Y } else { dir };
    dir * params.max_force * falloff
}

/// Random angular velocity for chaos rotation. Intensity in [0, 1] scaled by
/// the distance falloff maps to a ±(chaos·falloff·90)°/s range per axis.
pub fn chaos_angular_velocity(rng: &mut Xoshiro256PlusPlus, chaos: f32, falloff: f32) -> Vec3 {
    let chaos = chaos.clamp(0.0, 1.0);
    if chaos <= CHAOS_EPSILON || falloff <= 0.0 {
        return Vec3::ZERO;
    }
    let bound = (chaos * falloff * CHAOS_MAX_DEG).to_radians();
    Vec3::new(
        rng.gen_range(-bound..=bound),
        rng.gen_range(-bound..=bound),
        rng.gen_range(-bound..=bound),
    )
}

// ============================================================================
// System
// ============================================================================

/// Consume every `ForceRequest` raised this frame. Runs after the simulation
/// state sync so freshly promoted bodies are already dynamic.
pub fn distribute_forces(
    mut commands: Commands,
    mut requests: EventReader<ForceRequest>,
    mut bodies: Query<(&RigidBody, Option<&Transform>, &mut Velocity)>,
    mut rng: ResMut<ChaosRng>,
) {
    for request in requests.read() {
        match request {
            ForceRequest::Point { targets, direction, magnitude } => {
                let push = direction.normalize_or_zero() * *magnitude;
                if push == Vec3::ZERO {
                    continue;
                }
                let mut affected = 0;
                for &target in targets {
                    let Ok((body, _, mut velocity)) = bodies.get_mut(target) else { continue };
                    if *body != RigidBody::Dynamic {
                        continue;
                    }
                    velocity.linvel += push;
                    affected += 1;
                }
                debug!(affected, "point impulse distributed");
            }
            ForceRequest::Radial { targets, params, chaos } => {
                let mut affected = 0;
                for &target in targets {
                    let Ok((body, transform, mut velocity)) = bodies.get_mut(target) else {
                        continue;
                    };
                    if *body != RigidBody::Dynamic {
                        continue;
                    }
                    let Some(transform) = transform else { continue };

                    let impulse = radial_impulse(params, transform.translation);
                    if impulse != Vec3::ZERO {
                        commands
                            .entity(target)
                            .insert(ExternalImpulse { impulse, torque_impulse: Vec3::ZERO });
                    }
                    let falloff =
                        explosion_falloff(transform.translation.distance(params.center), params.radius);
                    let spin = chaos_angular_velocity(&mut rng.0, *chaos, falloff);
                    if spin != Vec3::ZERO {
                        velocity.angvel = spin;
                    }
                    affected += 1;
                }
                debug!(affected, "radial impulse distributed");
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

    #[test]
    fn test_falloff_bounds() {
        assert_eq!(explosion_falloff(0.0, 4.0), 1.0);
        assert_eq!(explosion_falloff(4.0, 4.0), 0.0);
        assert_eq!(explosion_falloff(10.0, 4.0), 0.0);
        let mid = explosion_falloff(2.0, 4.0);
        assert!((mid - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_falloff_point_blank_radius() {
        assert_eq!(explosion_falloff(3.0, 0.0), 1.0);
    }

    #[test]
    fn test_radial_impulse_points_outward() {
        let params = RadialParams { center: Vec3::ZERO, radius: 4.0, max_force: 10.0, lift: 0.0 };
        let impulse = radial_impulse(&params, Vec3::new(2.0, 0.0, 0.0));
        assert!(impulse.x > 0.0);
        assert_eq!(impulse.y, 0.0);
        // falloff at half radius
        assert!((impulse.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_radial_impulse_outside_radius_is_zero() {
        let params = RadialParams { center: Vec3::ZERO, radius: 4.0, max_force: 10.0, lift: 0.0 };
        assert_eq!(radial_impulse(&params, Vec3::new(5.0, 0.0, 0.0)), Vec3::ZERO);
    }

    #[test]
    fn test_lift_biases_upward() {
        let params = RadialParams { center: Vec3::ZERO, radius: 4.0, max_force: 10.0, lift: 2.0 };
        let impulse = radial_impulse(&params, Vec3::new(2.0, 0.0, 0.0));
        assert!(impulse.y > 0.0, "lift should add an upward component");
    }

    #[test]
    fn test_dead_center_pushes_up() {
        let params = RadialParams { center: Vec3::ZERO, radius: 4.0, max_force: 10.0, lift: 0.0 };
        let impulse = radial_impulse(&params, Vec3::ZERO);
        assert!(impulse.y > 0.0);
        assert_eq!(impulse.x, 0.0);
    }

    #[test]
    fn test_chaos_off_below_epsilon() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert_eq!(chaos_angular_velocity(&mut rng, 0.0, 1.0), Vec3::ZERO);
        assert_eq!(chaos_angular_velocity(&mut rng, 0.005, 1.0), Vec3::ZERO);
    }

    #[test]
    fn test_chaos_within_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let bound = (0.5 * 1.0 * CHAOS_MAX_DEG).to_radians();
        for _ in 0..100 {
            let spin = chaos_angular_velocity(&mut rng, 0.5, 1.0);
            assert!(spin.x.abs() <= bound && spin.y.abs() <= bound && spin.z.abs() <= bound);
        }
    }

    #[test]
    fn test_chaos_deterministic_per_seed() {
        let mut a = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut b = Xoshiro256PlusPlus::seed_from_u64(7);
        assert_eq!(
            chaos_angular_velocity(&mut a, 0.8, 0.6),
            chaos_angular_velocity(&mut b, 0.8, 0.6)
        );
    }

    #[test]
    fn test_chaos_scales_with_falloff() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let tight = (1.0f32 * 0.1 * CHAOS_MAX_DEG).to_radians();
        for _ in 0..100 {
            let spin = chaos_angular_velocity(&mut rng, 1.0, 0.1);
            assert!(spin.length() <= tight * 3f32.sqrt() + 1e-6);
        }
    }
}
