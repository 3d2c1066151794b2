// End-to-end render scenarios: small deterministic images rendered with one
// thread and a fixed seed.

use marcher::camera::Camera;
use marcher::material::Material;
use marcher::renderer::{render_scene, RenderOptions};
use marcher::scene::Scene;
use marcher::sdf::SdfObject;
use marcher::spectrum::Color;

use mmath::transform::Transfd;
use mmath::vector::Vec2;
use mmath::vector::Vec3;

fn test_options() -> RenderOptions {
    RenderOptions {
        output_size: Vec2 { x: 64, y: 64 },
        samples_per_pixel: 1,
        do_aa: false,
        thread_count: 1,
        sample_seed: 1,
        ..Default::default()
    }
}

fn looking_forward_from(offset: Vec3<f64>) -> Camera {
    Camera {
        transform: Transfd::new_translate(offset),
        zoom: 1.0,
    }
}

#[test]
fn empty_scene_shows_direction_colored_background() {
    let scene = Scene::new();
    let camera = Camera::default();
    let framebuffer = render_scene(&scene, &camera, &test_options());

    // The center ray points straight down the z axis.
    let center = framebuffer.at(32, 32).noisy_color;
    assert!((center.r).abs() < 1e-12);
    assert!((center.g).abs() < 1e-12);
    assert!((center.b - 1.0).abs() < 1e-12);
}

#[test]
fn flat_sphere_covers_the_center_of_the_image() {
    let mut scene = Scene::new();
    scene.add_object(
        SdfObject::sphere(1.0),
        Material::Flat(Color::new(1.0, 0.0, 0.0)),
    );
    let camera = looking_forward_from(Vec3::new(0.0, 0.0, -5.0));
    let framebuffer = render_scene(&scene, &camera, &test_options());

    let center = framebuffer.at(32, 32).noisy_color;
    assert_eq!(center, Color::new(1.0, 0.0, 0.0));

    // The corner ray misses and falls back to direction coloring.
    let corner = framebuffer.at(0, 0).noisy_color;
    let expected = Vec3::new(-0.5, 0.5, 1.0).normalize();
    assert!((corner.r - expected.x).abs() < 1e-12);
    assert!((corner.g - expected.y).abs() < 1e-12);
    assert!((corner.b - expected.z).abs() < 1e-12);
}

#[test]
fn diffuse_floor_gathers_light_from_the_sky() {
    let mut scene = Scene::new();
    scene.add_object(
        SdfObject::translate(SdfObject::plane(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(0.0, -1.0, 0.0)),
        Material::Diffuse(Color::from_scalar(0.5)),
    );

    let options = RenderOptions {
        samples_per_pixel: 16,
        max_recursion_depth: 3,
        max_lighting_bounces: 1,
        ..test_options()
    };
    let camera = Camera::default();
    let framebuffer = render_scene(&scene, &camera, &options);

    // A pixel below the horizon sees the floor. The bounce directions all
    // leave the floor upward, so the green channel (the sky's y component)
    // accumulates something positive.
    let below_horizon = framebuffer.at(32, 48).noisy_color;
    assert!(below_horizon.g > 0.0);

    let mean_channel = (below_horizon.r + below_horizon.g + below_horizon.b) / 3.0;
    assert!(
        (0.05..=0.25).contains(&mean_channel),
        "mean channel out of bounds: {mean_channel}"
    );
}

#[test]
fn transparent_sphere_against_an_empty_background_is_black() {
    let mut scene = Scene::new();
    scene.add_object(
        SdfObject::sphere(1.0),
        Material::Transparent {
            color: Color::white(),
            ior: 1.5,
            ior_variation: 0.0,
        },
    );
    scene.set_background_function(|_| Color::black());

    let camera = looking_forward_from(Vec3::new(0.0, 0.0, -5.0));
    let framebuffer = render_scene(&scene, &camera, &test_options());

    let center = framebuffer.at(32, 32).noisy_color;
    assert!(center.r.abs() < 1e-9);
    assert!(center.g.abs() < 1e-9);
    assert!(center.b.abs() < 1e-9);
}

#[test]
fn chromatic_dispersion_does_not_crash() {
    let mut scene = Scene::new();
    scene.add_object(
        SdfObject::sphere(1.0),
        Material::Transparent {
            color: Color::white(),
            ior: 1.5,
            ior_variation: 0.05,
        },
    );
    scene.set_background_function(|data| {
        Color::new(
            data.direction.x.abs(),
            data.direction.y.abs(),
            data.direction.z.abs(),
        )
    });

    let camera = looking_forward_from(Vec3::new(0.0, 0.0, -5.0));
    let framebuffer = render_scene(&scene, &camera, &test_options());
    for pixel in framebuffer.pixels() {
        assert!(pixel.noisy_color.r.is_finite());
        assert!(pixel.noisy_color.g.is_finite());
        assert!(pixel.noisy_color.b.is_finite());
    }
}

#[test]
fn fixed_seed_single_thread_renders_are_identical() {
    let mut scene = Scene::new();
    scene.add_object(
        SdfObject::translate(SdfObject::plane(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(0.0, -1.0, 0.0)),
        Material::Diffuse(Color::from_scalar(0.5)),
    );
    scene.add_object(
        SdfObject::sphere(0.5),
        Material::Flat(Color::from_scalar(2.0)),
    );

    let options = RenderOptions {
        samples_per_pixel: 4,
        do_aa: true,
        ..test_options()
    };
    let camera = looking_forward_from(Vec3::new(0.0, 0.0, -4.0));

    let first = render_scene(&scene, &camera, &options);
    let second = render_scene(&scene, &camera, &options);
    assert_eq!(first, second);
}

#[test]
fn multithreaded_rendering_covers_every_pixel() {
    let mut scene = Scene::new();
    scene.add_object(
        SdfObject::sphere(1.0),
        Material::Flat(Color::white()),
    );

    let options = RenderOptions {
        output_size: Vec2 { x: 32, y: 32 },
        thread_count: 0,
        ..test_options()
    };
    let camera = looking_forward_from(Vec3::new(0.0, 0.0, -3.0));
    let framebuffer = render_scene(&scene, &camera, &options);

    assert_eq!(framebuffer.size(), Vec2 { x: 32, y: 32 });
    for pixel in framebuffer.pixels() {
        assert!(pixel.noisy_color.r.is_finite());
    }
    // The center pixel hit the sphere no matter which thread owned it.
    assert_eq!(framebuffer.at(16, 16).noisy_color, Color::white());
}
