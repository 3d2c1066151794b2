// Sphere tracing over a flat list of SDF surfaces.

use crate::sdf::SdfObject;

use mmath::vector::{Vec3, Vec3d};

/// Sentinel index for rays that left the scene without hitting anything.
pub const NO_HIT: usize = usize::MAX;

#[derive(Clone, Copy, Debug)]
pub struct RaymarchResult {
    pub point: Vec3d,
    pub ray_depth: f64,
    pub ray_steps: usize,
    pub hit_index: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct RaymarchOptions {
    pub max_ray_steps: usize,
    pub max_ray_depth: f64,
    pub surface_epsilon: f64,
}

impl Default for RaymarchOptions {
    fn default() -> Self {
        RaymarchOptions {
            max_ray_steps: 1_000,
            max_ray_depth: 100.0,
            surface_epsilon: 1e-3,
        }
    }
}

/// Returns the smallest absolute distance over all surfaces along with the
/// index of the surface producing it. Ties go to the earlier surface.
///
/// The absolute value is intentional: it makes the march direction-agnostic,
/// which the refraction code relies on when tracing through a solid.
pub fn evaluate_distance_field(surfaces: &[SdfObject], point: Vec3d) -> (f64, usize) {
    let mut min_distance = 1e9;
    let mut hit_index = NO_HIT;
    for (i, surface) in surfaces.iter().enumerate() {
        let surface_distance = surface.evaluate(point).abs();
        if surface_distance < min_distance {
            hit_index = i;
            min_distance = surface_distance;
        }
    }
    (min_distance, hit_index)
}

/// Marches from `origin` along `direction` (normalized) using the distance
/// field as the safe step size. Returns the hit surface, or `NO_HIT` once the
/// step or depth budget runs out.
pub fn raymarch(
    origin: Vec3d,
    direction: Vec3d,
    surfaces: &[SdfObject],
    options: RaymarchOptions,
) -> RaymarchResult {
    let mut current_point = origin;
    let mut depth = 0.0;
    let mut step = 0;

    while step != options.max_ray_steps && depth < options.max_ray_depth {
        let (max_distance, hit_index) = evaluate_distance_field(surfaces, current_point);
        if max_distance < options.surface_epsilon {
            return RaymarchResult {
                point: current_point,
                ray_depth: depth,
                ray_steps: step,
                hit_index,
            };
        }
        current_point = current_point + direction.scale(max_distance);
        depth += max_distance;
        step += 1;
    }

    RaymarchResult {
        point: current_point,
        ray_depth: depth,
        ray_steps: step,
        hit_index: NO_HIT,
    }
}

/// The surface normal at `point`. Surfaces with an analytic normal use it;
/// everything else gets the tetrahedron sampling technique from
/// https://iquilezles.org/articles/normalsSDF/
pub fn get_normal(point: Vec3d, surface: &SdfObject, normal_offset: f64) -> Vec3d {
    if let Some(normal) = surface.analytic_normal(point) {
        return normal;
    }

    let xyy = Vec3::new(1.0, -1.0, -1.0);
    let yyx = Vec3::new(-1.0, -1.0, 1.0);
    let yxy = Vec3::new(-1.0, 1.0, -1.0);
    let xxx = Vec3::new(1.0, 1.0, 1.0);

    (xyy.scale(surface.evaluate(point + xyy.scale(normal_offset)))
        + yyx.scale(surface.evaluate(point + yyx.scale(normal_offset)))
        + yxy.scale(surface.evaluate(point + yxy.scale(normal_offset)))
        + xxx.scale(surface.evaluate(point + xxx.scale(normal_offset))))
    .normalize()
}
