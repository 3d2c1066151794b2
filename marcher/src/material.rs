// Surface materials. Like the SDF nodes these form a closed enum; the
// shading module supplies the recursive lighting evaluators the variants
// dispatch into.

use crate::shading::{self, RefractionData, RenderData, RenderState};
use crate::spectrum::Color;

use mmath::vector::{reflect, Vec3d};

/// Everything a material needs to know about the point being shaded. The
/// position is already offset along the normal by the shading epsilon.
pub struct ShadingData<'a> {
    pub position: Vec3d,
    pub normal: Vec3d,
    pub incoming_direction: Vec3d,
    pub state: &'a RenderState<'a>,
    pub recursion_depth: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    /// Emits its color unconditionally. Doubles as a light source.
    Flat(Color),
    /// A perfect mirror tinted by its color.
    Reflective(Color),
    /// Lambertian surface lit by cosine-weighted hemisphere sampling.
    Diffuse(Color),
    /// A dielectric with Fresnel-weighted reflection and refraction. A
    /// nonzero `ior_variation` spreads the refracted channels for chromatic
    /// dispersion.
    Transparent {
        color: Color,
        ior: f64,
        ior_variation: f64,
    },
    /// Visualizes the surface normal.
    Debug,
    /// Stands in for a material line the deserializer could not parse.
    DeserializationError,
}

impl Material {
    pub fn surface_color(&self, data: &ShadingData) -> Color {
        match self {
            Material::Flat(color) => *color,
            Material::Reflective(reflectivity) => {
                shading::get_shaded_color(&RenderData {
                    origin: data.position,
                    direction: reflect(data.incoming_direction, data.normal),
                    state: data.state,
                    recursion_depth: data.recursion_depth,
                }) * *reflectivity
            }
            Material::Diffuse(color) => shading::get_diffuse_lighting(data) * *color,
            Material::Transparent {
                color,
                ior,
                ior_variation,
            } => {
                shading::get_refraction(&RefractionData {
                    surface_point: data.position,
                    incoming_direction: data.incoming_direction,
                    normal: data.normal,
                    material_ior: *ior,
                    ior_variation: *ior_variation,
                    state: data.state,
                    recursion_depth: data.recursion_depth,
                }) * *color
            }
            Material::Debug => Color::new(
                data.normal.x.abs(),
                data.normal.y.abs(),
                data.normal.z.abs(),
            ),
            Material::DeserializationError => Color::new(1.0, 0.0, 1.0),
        }
    }

    /// The index of refraction seen by rays passing through the surface.
    pub fn ior(&self) -> f64 {
        match self {
            Material::Transparent { ior, .. } => *ior,
            _ => 1.0,
        }
    }
}
