// The parallel renderer: generates (and caches) the per-pixel base rays,
// hands tiles to worker threads, and accumulates samples into fat pixels.

use crate::camera::Camera;
use crate::film::{FatFramebuffer, FatPixel, Framebuffer, Size2D, Tile, TileBuffer, TileGrid};
use crate::histogram::Histogram;
use crate::rng::Xoroshiro128;
use crate::scene::Scene;
use crate::shading::{self, RenderData, RenderState};
use crate::spectrum::Color;
use crate::ziggurat;

use mmath::vector::{Vec2, Vec3, Vec3d};

use lazy_static::lazy_static;
use simple_error::{bail, SimpleResult};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Size of the output image.
    pub output_size: Size2D,
    /// Maximum number of steps until raymarching terminates.
    pub max_ray_steps: usize,
    /// Maximum depth for recursive algorithms.
    pub max_recursion_depth: usize,
    /// Maximum number of light bounces for indirect lighting.
    pub max_lighting_bounces: usize,
    /// Number of samples per pixel. Dramatically increases render times!
    pub samples_per_pixel: usize,
    /// Whether to jitter sample directions for antialiasing.
    pub do_aa: bool,
    /// How many threads to render with. 0 means platform concurrency.
    pub thread_count: usize,
    /// Maximum distance a ray can travel.
    pub max_ray_depth: f64,
    /// Maximum distance between the ray and a surface.
    pub surface_epsilon: f64,
    /// Radius used for numeric normal calculation. Should be smaller than
    /// surface_epsilon to avoid weirdness.
    pub normal_epsilon: f64,
    /// Offset along the surface normal to avoid shadow weirdness. Should be
    /// larger than surface_epsilon.
    pub shading_epsilon: f64,
    /// Seed the per-worker generators are derived from. Identical seeds and
    /// thread counts reproduce identical images.
    pub sample_seed: u64,
    /// Where the watcher thread writes its preview image, if anywhere.
    pub preview_path: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            output_size: Vec2 { x: 1280, y: 720 },
            max_ray_steps: 1_024,
            max_recursion_depth: 6,
            max_lighting_bounces: 2,
            samples_per_pixel: 128,
            do_aa: true,
            thread_count: 0,
            max_ray_depth: 500.0,
            surface_epsilon: 1e-6,
            normal_epsilon: 1e-12,
            shading_epsilon: 1e-5,
            sample_seed: 1,
            preview_path: None,
        }
    }
}

//
// Ray generation and caching
//

type RayCacheKey = (u64, (usize, usize));

lazy_static! {
    // The base directions only depend on the zoom and the output plane, so
    // they are memoized for the lifetime of the process.
    static ref RAY_CACHE: Mutex<HashMap<RayCacheKey, Arc<Vec<Vec3d>>>> = Mutex::new(HashMap::new());
}

fn generate_base_rays(camera: &Camera, options: &RenderOptions) -> Vec<Vec3d> {
    let right = Vec3::new(1.0, 0.0, 0.0);
    let up = Vec3::new(0.0, 1.0, 0.0);
    let forward = Vec3::new(0.0, 0.0, 1.0);

    let plane = options.output_size;
    let aspect_ratio = plane.x as f64 / plane.y as f64;

    let relative_coordinates = |x: usize, y: usize| {
        let raw_relative_x = x as f64 / plane.x as f64 - 0.5;
        let raw_relative_y = y as f64 / plane.y as f64 - 0.5;
        if aspect_ratio > 1.0 {
            (raw_relative_x * aspect_ratio, raw_relative_y)
        } else {
            (raw_relative_x, raw_relative_y / aspect_ratio)
        }
    };

    let mut rays = Vec::with_capacity(plane.area());
    for y in (1..=plane.y).rev() {
        for x in 0..plane.x {
            let (relative_x, relative_y) = relative_coordinates(x, y);
            let direction = (right.scale(relative_x)
                + up.scale(relative_y)
                + forward.scale(camera.zoom))
            .normalize();
            rays.push(direction);
        }
    }
    rays
}

fn cached_base_rays(camera: &Camera, options: &RenderOptions) -> Arc<Vec<Vec3d>> {
    let key = (
        camera.zoom.to_bits(),
        (options.output_size.x, options.output_size.y),
    );

    let mut cache = RAY_CACHE.lock().unwrap();
    if let Some(rays) = cache.get(&key) {
        log::debug!(
            "found cached ray data for zoom={}, size={}x{}",
            camera.zoom,
            options.output_size.x,
            options.output_size.y
        );
        return rays.clone();
    }

    log::debug!(
        "ray cache not populated, generating rays for the {}x{} plane",
        options.output_size.x,
        options.output_size.y
    );
    let rays = Arc::new(generate_base_rays(camera, options));
    cache.insert(key, rays.clone());
    rays
}

//
// Rendering
//

fn effective_thread_count(requested: usize) -> usize {
    if requested != 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

/// Derives the seed a worker feeds into its thread-local generators. Worker
/// `id` gets the stream `id` long jumps away from the base seed.
fn worker_seed(sample_seed: u64, worker_id: usize) -> u64 {
    let mut stream = Xoroshiro128::from_seed_u64(sample_seed);
    for _ in 0..worker_id {
        stream.long_jump();
    }
    stream.next()
}

fn sample_direction(base_direction: Vec3d, camera: &Camera, options: &RenderOptions) -> Vec3d {
    if options.do_aa {
        let jitter = Vec3::new(
            ziggurat::uniform_random() / options.output_size.x as f64,
            ziggurat::uniform_random() / options.output_size.y as f64,
            0.0,
        );
        camera
            .transform
            .rotation
            .rotate((base_direction + jitter).normalize())
    } else {
        camera.transform.rotation.rotate(base_direction)
    }
}

fn render_tile(
    tile: Tile,
    buffer: &TileBuffer<FatPixel>,
    rays: &[Vec3d],
    camera: &Camera,
    state: &RenderState,
    pixels_rendered: &AtomicUsize,
) {
    let options = state.options;
    let width = options.output_size.x;

    for y in tile.start.y..tile.end.y {
        for x in tile.start.x..tile.end.x {
            let base_direction = rays[x + y * width];

            let mut histogram = Histogram::new();
            let mut pixel_color = Color::black();

            for _ in 0..options.samples_per_pixel {
                let direction = sample_direction(base_direction, camera, options);
                let sample = shading::get_shaded_color(&RenderData {
                    origin: camera.transform.offset,
                    direction,
                    state,
                    recursion_depth: 0,
                });
                histogram.add_sample(sample);
                pixel_color = pixel_color + sample.div_scale(options.samples_per_pixel as f64);
            }

            buffer.set(
                x,
                y,
                FatPixel {
                    noisy_color: pixel_color,
                    histogram,
                },
            );
            pixels_rendered.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn render_worker(
    worker_id: usize,
    tiles: &TileGrid,
    buffer: &TileBuffer<FatPixel>,
    rays: &[Vec3d],
    camera: &Camera,
    state: &RenderState,
    pixels_rendered: &AtomicUsize,
) {
    ziggurat::reseed(worker_seed(state.options.sample_seed, worker_id));
    while let Some(tile) = tiles.next_tile() {
        render_tile(tile, buffer, rays, camera, state, pixels_rendered);
    }
}

/// Renders the scene into a fat framebuffer: one histogram-carrying pixel
/// per output pixel, ready for the denoiser.
pub fn render_scene(scene: &Scene, camera: &Camera, options: &RenderOptions) -> FatFramebuffer {
    let rays = cached_base_rays(camera, options);
    let size = options.output_size;
    let pixel_count = size.area();

    let buffer = TileBuffer::<FatPixel>::new(size);
    let tiles = TileGrid::new(size);
    let pixels_rendered = AtomicUsize::new(0);

    let state = RenderState {
        surfaces: scene.objects(),
        materials: scene.materials(),
        background: scene.background_function(),
        options,
    };

    let num_threads = effective_thread_count(options.thread_count);

    if num_threads <= 1 {
        render_worker(0, &tiles, &buffer, &rays, camera, &state, &pixels_rendered);
    } else {
        let buffer_ref = &buffer;
        let tiles_ref = &tiles;
        let state_ref = &state;
        let rays_ref = rays.as_slice();
        let pixels_rendered_ref = &pixels_rendered;

        crossbeam::thread::scope(|s| {
            // The watcher only observes the pixel counter; it never touches
            // renderer state.
            s.spawn(move |_| loop {
                let rendered = pixels_rendered_ref.load(Ordering::Relaxed);
                log::info!(
                    "rendered {}/{} pixels ({}%)",
                    rendered,
                    pixel_count,
                    rendered * 100 / pixel_count.max(1)
                );
                if rendered >= pixel_count {
                    break;
                }
                std::thread::sleep(Duration::from_millis(30));
            });

            for id in 1..num_threads {
                s.spawn(move |_| {
                    render_worker(
                        id,
                        tiles_ref,
                        buffer_ref,
                        rays_ref,
                        camera,
                        state_ref,
                        pixels_rendered_ref,
                    );
                });
            }

            // The "main" thread always has id 0:
            render_worker(
                0,
                tiles_ref,
                buffer_ref,
                rays_ref,
                camera,
                state_ref,
                pixels_rendered_ref,
            );
        })
        .unwrap();
    }

    let framebuffer = buffer.into_framebuffer();

    if let Some(path) = &options.preview_path {
        if let Err(err) = write_ppm(&framebuffer.to_color_framebuffer(), path) {
            log::warn!("could not write preview image: {}", err);
        }
    }

    framebuffer
}

/// Writes an 8-bit binary P6 PPM image.
pub fn write_ppm(framebuffer: &Framebuffer<Color>, path: &PathBuf) -> SimpleResult<()> {
    // Don't bother writing an empty framebuffer.
    if framebuffer.is_empty() {
        return Ok(());
    }

    let file = match File::create(path) {
        Ok(file) => file,
        Err(err) => bail!("unable to open output file {:?}: {}", path, err),
    };
    let mut writer = BufWriter::new(file);

    let size = framebuffer.size();
    let header = format!("P6\n{} {}\n255\n", size.x, size.y);
    if let Err(err) = writer.write_all(header.as_bytes()) {
        bail!("error writing image header: {}", err);
    }
    for pixel in framebuffer.pixels() {
        if let Err(err) = writer.write_all(&pixel.to_rgb8()) {
            bail!("error writing image data: {}", err);
        }
    }
    Ok(())
}
