// Ray histogram fusion: a non-local-means variant that compares pixels by
// the chi-squared distance between their sample histograms instead of their
// colors, plus an optional multi-scale pyramid on top.

use crate::film::{FatFramebuffer, FatPixel, Framebuffer, Size2D, Tile, TileGrid};
use crate::spectrum::Color;

use mmath::vector::Vec2;

use std::sync::Mutex;

#[derive(Clone, Copy, Debug)]
pub struct DenoisingOptions {
    /// Half side length of the patch around each pixel.
    pub half_patch_size: usize,
    /// Half side length of the search window scanned for similar pixels.
    pub half_search_window_size: usize,
    /// Chi-squared distance below which a pixel contributes to the patch.
    pub distance_threshold: f64,
    /// Number of pyramid scales. 1 disables the pyramid.
    pub num_scales: usize,
}

impl Default for DenoisingOptions {
    fn default() -> Self {
        DenoisingOptions {
            half_patch_size: 1,
            half_search_window_size: 6,
            distance_threshold: 1.0,
            num_scales: 3,
        }
    }
}

/// A pixel rectangle clipped to the image, with half-open coordinate ranges.
#[derive(Clone, Copy, Debug)]
struct Window {
    start_x: usize,
    start_y: usize,
    end_x: usize,
    end_y: usize,
}

impl Window {
    fn width(&self) -> usize {
        self.end_x - self.start_x
    }

    fn area(&self) -> usize {
        self.width() * (self.end_y - self.start_y)
    }
}

fn window_for_pixel(x: usize, y: usize, image_size: Size2D, half_size: usize) -> Window {
    Window {
        start_x: x.saturating_sub(half_size),
        start_y: y.saturating_sub(half_size),
        end_x: (x + half_size).min(image_size.x),
        end_y: (y + half_size).min(image_size.y),
    }
}

/// Per-channel chi-squared distance between two binned channels, averaged
/// over the non-empty bins. Two empty histograms are at distance zero.
fn chi_squared_channel<const N: usize>(a: &[f64; N], b: &[f64; N]) -> f64 {
    let mut sum = 0.0;
    let mut num_nonempty_bins = 0.0;

    for i in 0..N {
        let divisor = a[i] + b[i];
        if divisor != 0.0 {
            let difference = a[i] - b[i];
            sum += difference * difference / divisor;
            num_nonempty_bins += 1.0;
        }
    }

    if num_nonempty_bins == 0.0 {
        return 0.0;
    }
    sum / num_nonempty_bins
}

fn chi_squared_distance(a: &FatPixel, b: &FatPixel) -> [f64; 3] {
    [
        chi_squared_channel(a.histogram.red_channel(), b.histogram.red_channel()),
        chi_squared_channel(a.histogram.green_channel(), b.histogram.green_channel()),
        chi_squared_channel(a.histogram.blue_channel(), b.histogram.blue_channel()),
    ]
}

/// Runs the fusion for one pixel's patch: every pixel `b` in the patches
/// around the search window contributes its color to every patch cell `a`
/// whose histogram it resembles.
fn denoised_patch(
    search_window: &Window,
    this_patch: &Window,
    input: &FatFramebuffer,
    options: &DenoisingOptions,
) -> Vec<Color> {
    let image_size = input.size();
    let mut values = vec![Color::black(); this_patch.area()];
    let mut counts = vec![[0.0f64; 3]; this_patch.area()];

    for search_y in search_window.start_y..search_window.end_y {
        for search_x in search_window.start_x..search_window.end_x {
            let other_patch =
                window_for_pixel(search_x, search_y, image_size, options.half_patch_size);

            for this_y in this_patch.start_y..this_patch.end_y {
                for this_x in this_patch.start_x..this_patch.end_x {
                    let this_pixel = input.at(this_x, this_y);
                    let index_in_patch =
                        (this_x - this_patch.start_x) + (this_y - this_patch.start_y) * this_patch.width();

                    for other_y in other_patch.start_y..other_patch.end_y {
                        for other_x in other_patch.start_x..other_patch.end_x {
                            let other_pixel = input.at(other_x, other_y);
                            let distance = chi_squared_distance(this_pixel, other_pixel);

                            for channel in 0..3 {
                                if distance[channel] < options.distance_threshold {
                                    values[index_in_patch][channel] +=
                                        other_pixel.noisy_color[channel];
                                    counts[index_in_patch][channel] += 1.0;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    for (value, count) in values.iter_mut().zip(counts.iter()) {
        for channel in 0..3 {
            if count[channel] != 0.0 {
                value[channel] /= count[channel];
            }
        }
    }
    values
}

/// Streaming-mean accumulator for one output cell.
#[derive(Clone, Copy, Default)]
struct Accumulator {
    sum: Color,
    contributions: f64,
}

fn denoise_tile(
    tile: Tile,
    input: &FatFramebuffer,
    options: &DenoisingOptions,
    output: &Mutex<Vec<Accumulator>>,
) {
    let image_size = input.size();

    // Patches of pixels near the tile border reach into neighboring tiles,
    // so the tile accumulates locally over its expanded rectangle and merges
    // once at the end.
    let rect = Window {
        start_x: tile.start.x.saturating_sub(options.half_patch_size),
        start_y: tile.start.y.saturating_sub(options.half_patch_size),
        end_x: (tile.end.x + options.half_patch_size).min(image_size.x),
        end_y: (tile.end.y + options.half_patch_size).min(image_size.y),
    };
    let mut local = vec![Accumulator::default(); rect.area()];

    for y in tile.start.y..tile.end.y {
        for x in tile.start.x..tile.end.x {
            let this_patch = window_for_pixel(x, y, image_size, options.half_patch_size);
            let search_window =
                window_for_pixel(x, y, image_size, options.half_search_window_size);

            let values = denoised_patch(&search_window, &this_patch, input, options);

            for patch_y in this_patch.start_y..this_patch.end_y {
                for patch_x in this_patch.start_x..this_patch.end_x {
                    let index_in_patch = (patch_x - this_patch.start_x)
                        + (patch_y - this_patch.start_y) * this_patch.width();
                    let index_in_rect =
                        (patch_x - rect.start_x) + (patch_y - rect.start_y) * rect.width();

                    local[index_in_rect].sum = local[index_in_rect].sum + values[index_in_patch];
                    local[index_in_rect].contributions += 1.0;
                }
            }
        }
    }

    let mut shared = output.lock().unwrap();
    for y in rect.start_y..rect.end_y {
        for x in rect.start_x..rect.end_x {
            let index_in_rect = (x - rect.start_x) + (y - rect.start_y) * rect.width();
            let cell = &mut shared[x + y * image_size.x];
            cell.sum = cell.sum + local[index_in_rect].sum;
            cell.contributions += local[index_in_rect].contributions;
        }
    }
}

fn denoise_internal(input: &FatFramebuffer, options: &DenoisingOptions) -> Vec<Accumulator> {
    let size = input.size();
    let output = Mutex::new(vec![Accumulator::default(); size.area()]);
    let tiles = TileGrid::new(size);

    let num_threads = std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1);

    if num_threads <= 1 {
        while let Some(tile) = tiles.next_tile() {
            denoise_tile(tile, input, options, &output);
        }
    } else {
        let tiles_ref = &tiles;
        let output_ref = &output;
        crossbeam::thread::scope(|s| {
            for i in 0..num_threads {
                s.spawn(move |_| {
                    while let Some(tile) = tiles_ref.next_tile() {
                        log::debug!("denoise thread {} got tile {}", i, tile.index);
                        denoise_tile(tile, input, options, output_ref);
                    }
                });
            }
        })
        .unwrap();
    }

    output.into_inner().unwrap()
}

/// Denoises a fat framebuffer at its own resolution.
pub fn denoise_single_scale(
    input: &FatFramebuffer,
    options: &DenoisingOptions,
) -> Framebuffer<Color> {
    let accumulators = denoise_internal(input, options);

    let pixels = accumulators
        .into_iter()
        .map(|cell| {
            if cell.contributions != 0.0 {
                cell.sum.div_scale(cell.contributions)
            } else {
                Color::black()
            }
        })
        .collect();

    Framebuffer::from_pixels(input.size(), pixels)
}

/// Box-subsamples the input down by a factor of `2^scale`, averaging colors
/// and histograms over each pixel's sample window.
fn gaussian_subsample(input: &FatFramebuffer, scale: usize) -> FatFramebuffer {
    assert!(scale < usize::BITS as usize);

    if scale == 0 {
        return input.clone();
    }

    let half_sample_window_size = 1usize << (scale - 1);
    let pixel_step = 1usize << scale;
    let input_size = input.size();
    let scaled_size = Vec2 {
        x: input_size.x >> scale,
        y: input_size.y >> scale,
    };

    if scaled_size.x == 0 || scaled_size.y == 0 {
        return Framebuffer::from_pixels(Vec2 { x: 0, y: 0 }, Vec::new());
    }

    let mut output_pixels = Vec::with_capacity(scaled_size.area());
    for y in 0..scaled_size.y {
        for x in 0..scaled_size.x {
            let sample_patch = window_for_pixel(
                x * pixel_step,
                y * pixel_step,
                input_size,
                half_sample_window_size,
            );

            let mut num_samples = 0usize;
            let mut output_pixel = FatPixel::default();
            for patch_y in sample_patch.start_y..sample_patch.end_y {
                for patch_x in sample_patch.start_x..sample_patch.end_x {
                    num_samples += 1;
                    output_pixel = output_pixel + *input.at(patch_x, patch_y);
                }
            }
            output_pixels.push(output_pixel.div_scale(num_samples as f64));
        }
    }

    Framebuffer::from_pixels(scaled_size, output_pixels)
}

/// Bilinearly upsamples one denoised scale back to full resolution and adds
/// it into the output, weighted down so the scales sum to a bounded
/// correction.
fn add_scaled(
    output: &mut Framebuffer<Color>,
    scaled: &Framebuffer<Color>,
    scale: usize,
    num_scales: usize,
) {
    let output_size = output.size();
    let scaled_size = scaled.size();
    let step_size = 0.5f64.powi(scale as i32);
    let correction_factor = 0.5 / num_scales as f64;

    for y in 0..output_size.y {
        for x in 0..output_size.x {
            let fx = x as f64 * step_size;
            let fy = y as f64 * step_size;

            let x0 = (fx as usize).min(scaled_size.x - 1);
            let y0 = (fy as usize).min(scaled_size.y - 1);
            let x1 = (x0 + 1).min(scaled_size.x - 1);
            let y1 = (y0 + 1).min(scaled_size.y - 1);

            let right_weight = fx - x0 as f64;
            let bottom_weight = fy - y0 as f64;

            let top = scaled
                .at(x0, y0)
                .lerp(*scaled.at(x1, y0), right_weight.clamp(0.0, 1.0));
            let bottom = scaled
                .at(x0, y1)
                .lerp(*scaled.at(x1, y1), right_weight.clamp(0.0, 1.0));
            let interpolated = top.lerp(bottom, bottom_weight.clamp(0.0, 1.0));

            let cell = output.at_mut(x, y);
            *cell = *cell + interpolated.scale(correction_factor);
        }
    }
}

/// Multi-scale ray histogram fusion: the finest scale is denoised directly,
/// coarser pyramid scales are denoised independently and blended back in.
/// Scales that collapse to an empty image are skipped; degenerate inputs
/// yield zero output rather than an error.
pub fn denoise_multiscale(
    input: &FatFramebuffer,
    options: &DenoisingOptions,
) -> Framebuffer<Color> {
    if options.num_scales <= 1 {
        return denoise_single_scale(input, options);
    }

    let mut output = denoise_single_scale(input, options);

    for scale in 1..options.num_scales {
        let scaled_input = gaussian_subsample(input, scale);
        if scaled_input.is_empty() {
            log::debug!("skipping collapsed pyramid scale {}", scale);
            continue;
        }

        let scaled_output = denoise_single_scale(&scaled_input, options);
        add_scaled(&mut output, &scaled_output, scale, options.num_scales);
    }

    output
}
