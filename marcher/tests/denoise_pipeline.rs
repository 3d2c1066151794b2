// Rendering into fat pixels and fusing the result back down to colors.

use marcher::camera::Camera;
use marcher::denoise::{denoise_single_scale, DenoisingOptions};
use marcher::material::Material;
use marcher::renderer::{render_scene, RenderOptions};
use marcher::scene::Scene;
use marcher::sdf::SdfObject;
use marcher::spectrum::Color;

use mmath::transform::Transfd;
use mmath::vector::{Vec2, Vec3};

#[test]
fn denoising_preserves_a_clean_flat_region() {
    let mut scene = Scene::new();
    scene.add_object(
        SdfObject::sphere(1.0),
        Material::Flat(Color::new(1.0, 0.0, 0.0)),
    );

    let options = RenderOptions {
        output_size: Vec2 { x: 64, y: 64 },
        samples_per_pixel: 1,
        do_aa: false,
        thread_count: 1,
        sample_seed: 1,
        ..Default::default()
    };
    let camera = Camera {
        transform: Transfd::new_translate(Vec3::new(0.0, 0.0, -5.0)),
        zoom: 1.0,
    };

    let fat = render_scene(&scene, &camera, &options);
    let denoised = denoise_single_scale(
        &fat,
        &DenoisingOptions {
            half_patch_size: 1,
            half_search_window_size: 3,
            // Tight threshold: only histogram-identical pixels fuse, so the
            // flat sphere interior stays exactly red.
            distance_threshold: 0.05,
            num_scales: 1,
        },
    );

    assert_eq!(denoised.size(), fat.size());
    let center = denoised.at(32, 32);
    assert!((center.r - 1.0).abs() < 1e-9);
    assert!(center.g.abs() < 1e-9);
    assert!(center.b.abs() < 1e-9);
}
