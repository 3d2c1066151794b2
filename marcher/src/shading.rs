// Recursive Monte-Carlo shading: background evaluation, diffuse hemisphere
// sampling, and the Fresnel-weighted refraction path.

use crate::material::{Material, ShadingData};
use crate::raymarch::{self, RaymarchOptions, NO_HIT};
use crate::renderer::RenderOptions;
use crate::sdf::SdfObject;
use crate::spectrum::Color;
use crate::ziggurat;

use mmath::vector::{reflect, Vec3, Vec3d};

use num_traits::clamp;

/// Radiance supplied for rays that leave the scene.
pub type BackgroundFunction = Box<dyn Fn(&RenderData) -> Color + Send + Sync>;

/// Everything the shading recursion reads. Borrowed from the scene for the
/// duration of a render.
pub struct RenderState<'a> {
    pub surfaces: &'a [SdfObject],
    pub materials: &'a [Material],
    pub background: Option<&'a BackgroundFunction>,
    pub options: &'a RenderOptions,
}

pub struct RenderData<'a> {
    pub origin: Vec3d,
    pub direction: Vec3d,
    pub state: &'a RenderState<'a>,
    pub recursion_depth: usize,
}

pub struct RefractionData<'a> {
    pub surface_point: Vec3d,
    pub incoming_direction: Vec3d,
    pub normal: Vec3d,
    pub material_ior: f64,
    pub ior_variation: f64,
    pub state: &'a RenderState<'a>,
    pub recursion_depth: usize,
}

fn raymarch_options(options: &RenderOptions) -> RaymarchOptions {
    RaymarchOptions {
        max_ray_steps: options.max_ray_steps,
        max_ray_depth: options.max_ray_depth,
        surface_epsilon: options.surface_epsilon,
    }
}

/// Traces one ray and evaluates the material it hits. This is the entry
/// point of the shading recursion; materials call back into it for their
/// secondary rays.
pub fn get_shaded_color(data: &RenderData) -> Color {
    let get_background_color = || {
        if let Some(background) = data.state.background {
            return background(data);
        }
        // Debug fallback: color rays by their direction.
        Color::new(data.direction.x, data.direction.y, data.direction.z)
    };

    if data.recursion_depth >= data.state.options.max_recursion_depth {
        return get_background_color();
    }

    let state = data.state;
    let result = raymarch::raymarch(
        data.origin,
        data.direction,
        state.surfaces,
        raymarch_options(state.options),
    );

    if result.hit_index == NO_HIT {
        return get_background_color();
    }

    let surface_normal = raymarch::get_normal(
        result.point,
        &state.surfaces[result.hit_index],
        state.options.normal_epsilon,
    );

    state.materials[result.hit_index].surface_color(&ShadingData {
        position: result.point + surface_normal.scale(state.options.shading_epsilon),
        normal: surface_normal,
        incoming_direction: data.direction,
        state,
        recursion_depth: data.recursion_depth + 1,
    })
}

/// Cosine-weighted hemisphere sampling by rejection: a normal-distributed
/// offset added to the normal lands on the unit sphere around its tip.
fn random_direction_on_weighted_hemisphere(normal: Vec3d) -> Vec3d {
    for _ in 0..16 {
        let candidate = normal
            + Vec3::new(
                ziggurat::ziggurat_normal(),
                ziggurat::ziggurat_normal(),
                ziggurat::ziggurat_normal(),
            );
        if candidate == Vec3::zero() {
            continue;
        }
        let candidate = candidate.normalize();
        return if candidate.dot(normal) < 0.0 {
            -candidate
        } else {
            candidate
        };
    }
    panic!("hemisphere sampling did not terminate");
}

/// One bounce of indirect lighting for a diffuse surface.
///
/// The child ray starts at `max_recursion_depth - max_lighting_bounces`
/// instead of the current depth, which caps indirect lighting at
/// `max_lighting_bounces` bounces while leaving the full budget available to
/// reflection and refraction chains.
pub fn get_diffuse_lighting(data: &ShadingData) -> Color {
    let direction = random_direction_on_weighted_hemisphere(data.normal);
    let options = data.state.options;

    let lighting_depth = options
        .max_recursion_depth
        .saturating_sub(options.max_lighting_bounces)
        .max(data.recursion_depth);

    get_shaded_color(&RenderData {
        origin: data.position,
        direction,
        state: data.state,
        recursion_depth: lighting_depth,
    })
    .scale(direction.dot(data.normal))
}

/// Full dielectric Fresnel reflectance. `1.0` signals total internal
/// reflection.
fn fresnel(direction: Vec3d, normal: Vec3d, interior_ior: f64, exterior_ior: f64) -> f64 {
    let mut interior_ior = interior_ior;
    let mut exterior_ior = exterior_ior;

    let mut cosi = direction.dot(normal);
    if cosi > 0.0 {
        std::mem::swap(&mut interior_ior, &mut exterior_ior);
    } else {
        cosi = -cosi;
    }

    let etai = exterior_ior;
    let etat = interior_ior;

    let sint = (exterior_ior / interior_ior) * (1.0 - cosi * cosi).max(0.0).sqrt();
    if sint >= 1.0 {
        return 1.0; // TIR
    }

    let cost = (1.0 - sint * sint).sqrt();
    let rs = ((etat * cosi) - (etai * cost)) / ((etat * cosi) + (etai * cost));
    let rp = ((etai * cosi) - (etat * cost)) / ((etai * cosi) + (etat * cost));

    clamp((rs * rs + rp * rp) * 0.5, 0.0, 1.0)
}

/// Snell refraction. Returns the zero vector on total internal reflection.
fn refract(direction: Vec3d, normal: Vec3d, interior_ior: f64, exterior_ior: f64) -> Vec3d {
    let mut interior_ior = interior_ior;
    let mut exterior_ior = exterior_ior;
    let mut normal = normal;

    let mut cosi = direction.dot(normal);
    if cosi > 0.0 {
        std::mem::swap(&mut interior_ior, &mut exterior_ior);
        normal = -normal;
    } else {
        cosi = -cosi;
    }

    let eta = exterior_ior / interior_ior;

    let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
    if k < 0.0 {
        return Vec3::zero(); // TIR
    }
    (direction.scale(eta) + normal.scale(eta * cosi - k.sqrt())).normalize()
}

/// The object whose interior contains `point`: negative signed distance,
/// closest to zero. `NO_HIT` if the point is in free space.
fn get_surrounding_object(surfaces: &[SdfObject], point: Vec3d) -> usize {
    let mut hit_index = NO_HIT;
    let mut min_distance = -1e9;
    for (i, surface) in surfaces.iter().enumerate() {
        let object_distance = surface.evaluate(point);
        if object_distance < 0.0 && object_distance > min_distance {
            min_distance = object_distance;
            hit_index = i;
        }
    }
    hit_index
}

fn get_surrounding_ior(surface_point: Vec3d, surfaces: &[SdfObject], materials: &[Material]) -> f64 {
    let closest_object_index = get_surrounding_object(surfaces, surface_point);
    if closest_object_index == NO_HIT {
        return 1.0;
    }
    materials[closest_object_index].ior()
}

fn get_reflective_component(data: &RefractionData, reflection_factor: f64) -> Color {
    if reflection_factor < 0.01 {
        return Color::black();
    }
    get_shaded_color(&RenderData {
        origin: data.surface_point,
        direction: reflect(data.incoming_direction, data.normal),
        state: data.state,
        recursion_depth: data.recursion_depth,
    })
    .scale(reflection_factor)
}

/// Traces the transmitted ray through the solid and out the far side.
fn get_refractive_component_at_ior(
    data: &RefractionData,
    ior_factor: f64,
    outer_ior: f64,
) -> Color {
    let trace_direction = refract(
        data.incoming_direction,
        data.normal,
        data.material_ior * ior_factor,
        outer_ior,
    );
    // Start just inside the surface so the interior march doesn't
    // immediately terminate on the entry point.
    let trace_origin =
        data.surface_point - data.normal.scale(2.0 * data.state.options.shading_epsilon);

    if trace_direction == Vec3::zero() {
        // Entry TIR should have been caught by the Fresnel factor.
        log::warn!("refraction entered a surface but found no transmission direction");
        return Color::black();
    }

    let options = data.state.options;
    let result = raymarch::raymarch(
        trace_origin,
        trace_direction,
        data.state.surfaces,
        raymarch_options(options),
    );

    if result.hit_index == NO_HIT {
        log::warn!("refracted ray did not find an exit surface");
        return Color::black();
    }

    let opposite_normal = raymarch::get_normal(
        result.point,
        &data.state.surfaces[result.hit_index],
        options.normal_epsilon,
    );
    let opposite_shading_point = result.point + opposite_normal.scale(options.shading_epsilon);
    let out_direction = refract(
        trace_direction,
        opposite_normal,
        data.material_ior,
        get_surrounding_ior(data.surface_point, data.state.surfaces, data.state.materials),
    );

    // Total internal reflection at the exit: continue inside the solid.
    if out_direction == Vec3::zero() {
        return get_shaded_color(&RenderData {
            origin: opposite_shading_point,
            direction: reflect(trace_direction, opposite_normal),
            state: data.state,
            recursion_depth: data.recursion_depth,
        });
    }

    get_shaded_color(&RenderData {
        origin: opposite_shading_point,
        direction: out_direction,
        state: data.state,
        recursion_depth: data.recursion_depth,
    })
}

fn get_refractive_component(data: &RefractionData, refraction_factor: f64) -> Color {
    if refraction_factor < 0.01 {
        return Color::black();
    }

    let outer_ior =
        get_surrounding_ior(data.surface_point, data.state.surfaces, data.state.materials);

    if data.ior_variation == 0.0 {
        return get_refractive_component_at_ior(data, 1.0, outer_ior).scale(refraction_factor);
    }

    // Chromatic dispersion: spread the channels over the ior variation.
    Color::new(
        get_refractive_component_at_ior(data, 1.0 - data.ior_variation, outer_ior).r,
        get_refractive_component_at_ior(data, 1.0, outer_ior).g,
        get_refractive_component_at_ior(data, 1.0 + data.ior_variation, outer_ior).b,
    )
    .scale(refraction_factor)
}

/// The combined reflective and refractive response of a transparent surface.
pub fn get_refraction(data: &RefractionData) -> Color {
    let outer_ior =
        get_surrounding_ior(data.surface_point, data.state.surfaces, data.state.materials);

    let reflection_factor = fresnel(
        data.incoming_direction,
        data.normal,
        data.material_ior,
        outer_ior,
    );

    get_reflective_component(data, reflection_factor)
        + get_refractive_component(data, 1.0 - reflection_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderOptions;
    use approx::assert_relative_eq;

    #[test]
    fn fresnel_at_normal_incidence_is_small() {
        let direction = Vec3::new(0.0, 0.0, 1.0);
        let normal = Vec3::new(0.0, 0.0, -1.0);
        let factor = fresnel(direction, normal, 1.5, 1.0);
        // ((1.5 - 1) / (1.5 + 1))^2 = 0.04
        assert_relative_eq!(factor, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn fresnel_at_grazing_incidence_is_total() {
        let direction = Vec3::new(1.0, -1e-9, 0.0).normalize();
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let factor = fresnel(direction, normal, 1.5, 1.0);
        assert!(factor > 0.99);
    }

    #[test]
    fn fresnel_reports_tir_from_inside() {
        // Leaving glass at well past the critical angle (~41.8 degrees).
        let direction = Vec3::new(1.0, 1e-3, 0.0).normalize();
        let normal = Vec3::new(0.0, 1.0, 0.0);
        let factor = fresnel(direction, normal, 1.5, 1.0);
        assert_eq!(factor, 1.0);
    }

    #[test]
    fn refract_at_normal_incidence_goes_straight_through() {
        let direction = Vec3::new(0.0, 0.0, 1.0);
        let normal = Vec3::new(0.0, 0.0, -1.0);
        let refracted = refract(direction, normal, 1.5, 1.0);
        assert_relative_eq!(refracted.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(refracted.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(refracted.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn refract_reports_tir_as_zero() {
        let direction = Vec3::new(1.0, 1e-3, 0.0).normalize();
        let normal = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(refract(direction, normal, 1.5, 1.0), Vec3::zero());
    }

    #[test]
    fn missed_rays_fall_back_to_direction_coloring() {
        let options = RenderOptions::default();
        let state = RenderState {
            surfaces: &[],
            materials: &[],
            background: None,
            options: &options,
        };
        let direction = Vec3::new(0.0, 0.0, 1.0);
        let color = get_shaded_color(&RenderData {
            origin: Vec3::zero(),
            direction,
            state: &state,
            recursion_depth: 0,
        });
        assert_eq!(color, Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn surrounding_object_sees_through_nesting() {
        let surfaces = vec![
            SdfObject::sphere(2.0),
            SdfObject::sphere(1.0),
            SdfObject::translate(SdfObject::sphere(1.0), Vec3::new(10.0, 0.0, 0.0)),
        ];
        // Inside both concentric spheres the inner one is closest to zero.
        assert_eq!(
            get_surrounding_object(&surfaces, Vec3::new(0.5, 0.0, 0.0)),
            1
        );
        // Between the shells only the outer sphere contains the point.
        assert_eq!(
            get_surrounding_object(&surfaces, Vec3::new(1.5, 0.0, 0.0)),
            0
        );
        // Free space:
        assert_eq!(get_surrounding_object(&surfaces, Vec3::new(5.0, 0.0, 0.0)), NO_HIT);
    }
}
