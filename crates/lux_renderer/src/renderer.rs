//! Parallel renderer.
//!
//! The image is split into contiguous bands of rows, one per worker. Each
//! band gets an exclusive slice of the pixel buffer, so workers write
//! without locks and the scope's join is the only synchronization.

use std::ops::Range;
use std::time::Instant;

use lux_core::ViewFrustum;
use lux_math::{Color, Ray};
use thiserror::Error;

use crate::shading::Tracer;
use crate::world::World;

/// Default maximum primitives per BVH leaf.
pub const DEFAULT_LEAF_SIZE: usize = 4;

/// Default recursion limit for reflected and refracted rays.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Errors that can occur when starting a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Thread count must be at least 1")]
    ZeroThreads,

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Worker threads; `None` uses the available parallelism
    pub threads: Option<usize>,
    /// Maximum reflection/refraction depth
    pub max_depth: u32,
    /// Maximum primitives per BVH leaf
    pub max_leaf_size: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            threads: None,
            max_depth: DEFAULT_MAX_DEPTH,
            max_leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

impl RenderConfig {
    /// Worker count this configuration resolves to.
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Linear RGB pixels, row-major, first row at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::BLACK; width as usize * height as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let index = y as usize * self.width as usize + x as usize;
        self.pixels[index] = color;
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Split the buffer into exclusive handles for the given row ranges.
    ///
    /// Ranges must be ascending and non-overlapping. Rows outside the image
    /// are dropped.
    pub fn bands_mut(&mut self, bands: &[Range<u32>]) -> Vec<RowBandMut<'_>> {
        let width = self.width as usize;
        let height = self.height;
        let mut rest: &mut [Color] = &mut self.pixels;
        let mut next_row = 0;
        let mut handles = Vec::with_capacity(bands.len());

        for band in bands {
            let start = band.start.clamp(next_row, height);
            let end = band.end.clamp(start, height);

            let skipped = std::mem::take(&mut rest);
            let (_, tail) = skipped.split_at_mut((start - next_row) as usize * width);
            let (pixels, tail) = tail.split_at_mut((end - start) as usize * width);
            rest = tail;
            next_row = end;

            if start < end {
                handles.push(RowBandMut {
                    first_row: start,
                    width: self.width,
                    pixels,
                });
            }
        }
        handles
    }
}

/// Exclusive write access to a contiguous run of image rows.
#[derive(Debug)]
pub struct RowBandMut<'a> {
    first_row: u32,
    width: u32,
    pixels: &'a mut [Color],
}

impl RowBandMut<'_> {
    /// Image rows covered by this band.
    pub fn rows(&self) -> Range<u32> {
        let count = (self.pixels.len() / self.width.max(1) as usize) as u32;
        self.first_row..self.first_row + count
    }

    /// Set the pixel at image coordinates (x, y); `y` must lie in [`rows`](Self::rows).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let index = (y - self.first_row) as usize * self.width as usize + x as usize;
        self.pixels[index] = color;
    }
}

/// Split `height` rows into at most `workers` contiguous bands.
///
/// Every band gets `height / workers` rows and the first `height % workers`
/// bands one more. Empty bands are dropped.
pub fn partition_rows(height: u32, workers: usize) -> Vec<Range<u32>> {
    let workers = workers.max(1) as u32;
    let base = height / workers;
    let extra = height % workers;

    let mut bands = Vec::new();
    let mut start = 0;
    for i in 0..workers {
        let rows = base + u32::from(i < extra);
        if rows == 0 {
            break;
        }
        bands.push(start..start + rows);
        start += rows;
    }
    bands
}

/// Color of pixel (x, y). Rays that cannot be formed see the background.
pub fn render_pixel(world: &World, frustum: &ViewFrustum, x: u32, y: u32, config: &RenderConfig) -> Color {
    trace_pixel(&Tracer::new(world, config.max_depth), world, frustum, x, y)
}

fn trace_pixel(tracer: &Tracer<'_>, world: &World, frustum: &ViewFrustum, x: u32, y: u32) -> Color {
    match Ray::towards(frustum.eye, frustum.pixel_position(x, y)) {
        Ok(ray) => tracer.trace(&ray, 0),
        Err(_) => world.scene().background,
    }
}

fn render_band(world: &World, frustum: &ViewFrustum, config: &RenderConfig, band: &mut RowBandMut<'_>) {
    let tracer = Tracer::new(world, config.max_depth);
    for y in band.rows() {
        for x in 0..frustum.width {
            band.set(x, y, trace_pixel(&tracer, world, frustum, x, y));
        }
    }
}

/// Render the whole view on a pool of `config.threads` workers.
pub fn render(world: &World, frustum: &ViewFrustum, config: &RenderConfig) -> RenderResult<ImageBuffer> {
    let workers = config.worker_count();
    if workers == 0 {
        return Err(RenderError::ZeroThreads);
    }
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;

    let bands = partition_rows(frustum.height, workers);
    let mut image = ImageBuffer::new(frustum.width, frustum.height);

    log::info!(
        "Rendering {}x{} with {} workers ({} bands)",
        frustum.width,
        frustum.height,
        workers,
        bands.len()
    );
    let start = Instant::now();

    let handles = image.bands_mut(&bands);
    pool.scope(|s| {
        for mut band in handles {
            s.spawn(move |_| render_band(world, frustum, config, &mut band));
        }
    });

    log::info!("Render complete in {:.2?}", start.elapsed());
    Ok(image)
}
