// A CPU path tracer over signed distance fields, with ray-histogram-fusion
// denoising on top.

pub mod camera;
pub mod denoise;
pub mod deserialize;
pub mod film;
pub mod histogram;
pub mod material;
pub mod raymarch;
pub mod renderer;
pub mod rng;
pub mod scene;
pub mod sdf;
pub mod serialize;
pub mod shading;
pub mod spectrum;
pub mod ziggurat;

pub use camera::Camera;
pub use denoise::{denoise_multiscale, denoise_single_scale, DenoisingOptions};
pub use deserialize::deserialize_scene;
pub use film::{FatFramebuffer, FatPixel, Framebuffer, Size2D};
pub use histogram::{Histogram, RayHistogram, NUM_BINS};
pub use material::Material;
pub use renderer::{render_scene, RenderOptions};
pub use scene::Scene;
pub use sdf::SdfObject;
pub use serialize::serialize_scene;
pub use spectrum::Color;
