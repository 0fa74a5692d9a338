//! The two-stage frame pipeline shared by camera and shadow passes.
//!
//! ```text
//!   models ──► flatten ──► partition ──► [ setup task per worker ]
//!                                          clip, project, set up jobs,
//!                                          bucket jobs by band
//!                                                │ barrier
//!                                                ▼
//!                                        [ raster task per band ]
//!                                          clear band, rasterize buckets,
//!                                          resolve band into the frame
//!                                                │ barrier
//!                                                ▼
//!                                           FrameStats
//! ```
//!
//! Setup tasks own disjoint triangle ranges and write only to their own
//! [`WorkerOutput`]. Raster tasks own disjoint row ranges of every buffer.
//! The only lock taken is the scheduler's.

use std::ops::Range;
use std::time::Instant;

use log::trace;

use super::buffer::{Buffer2D, BufferRows, ColorBuffer, DepthBuffer, WorldBuffer};
use super::rasterizer::{rasterize, BandTarget, DepthOnlyShader, Rejection, RenderJob, Shading};
use super::resolve::resolve_rows;
use crate::clipper::{clip_near, Clipped};
use crate::distribute::{self, Slice};
use crate::geometry::{TexVertex, TextureIndex, Triangle};
use crate::math::Vec4;
use crate::model::Model;
use crate::scheduler::Scheduler;
use crate::stats::FrameStats;
use crate::transform::CoordinateTransformer;

/// Geometry options of one pass.
pub(crate) struct Pass<'a> {
    /// Prepared for the viewer, sized to the internal render resolution.
    pub transformer: &'a CoordinateTransformer,
    pub near_z: f32,
    pub cull_backfaces: bool,
    /// Models with this texture are skipped.
    pub skip_texture: Option<TextureIndex>,
}

/// Packed output frame plus how to fill it from the color buffer.
pub(crate) struct Output<'a> {
    pub frame: &'a mut [u32],
    pub width: usize,
    pub ssaa: usize,
    pub dither: bool,
}

/// Buffers written by a pass. Depth is always written.
pub(crate) struct Targets<'a> {
    pub depth: &'a mut DepthBuffer,
    pub color: Option<&'a mut ColorBuffer>,
    pub world: Option<&'a mut WorldBuffer>,
    pub output: Option<Output<'a>>,
}

/// Everything one setup task produced.
struct WorkerOutput<'m> {
    jobs: Vec<RenderJob<'m>>,
    /// Indices into `jobs`, one list per band.
    buckets: Vec<Vec<usize>>,
    stats: FrameStats,
}

impl WorkerOutput<'_> {
    fn new(bands: usize) -> Self {
        Self {
            jobs: Vec::new(),
            buckets: vec![Vec::new(); bands],
            stats: FrameStats::default(),
        }
    }
}

/// `bands` contiguous row ranges covering `0..height`, as equal as possible.
pub(crate) fn band_rows(height: usize, bands: usize) -> Vec<Range<usize>> {
    let bands = bands.max(1);
    (0..bands)
        .map(|band| band * height / bands..(band + 1) * height / bands)
        .collect()
}

/// True when every corner of the model's bounding box is behind the near plane.
fn behind_near_plane(model: &Model, pass: &Pass<'_>) -> bool {
    model
        .bounds()
        .iter()
        .all(|&corner| pass.transformer.rotate_and_translate(Vec4::from(corner)).z > pass.near_z)
}

/// Runs both stages over `models` on `scheduler`.
///
/// `shading` of `None` renders depth only.
pub(crate) fn run(
    scheduler: &Scheduler,
    models: &[Model],
    pass: &Pass<'_>,
    targets: Targets<'_>,
    shading: Option<&Shading<'_>>,
) -> FrameStats {
    let workers = scheduler.thread_count().max(1);
    let (width, height) = (targets.depth.width(), targets.depth.height());
    let ssaa = targets.output.as_ref().map_or(1, |output| output.ssaa.max(1));

    let out_bands = band_rows(height / ssaa, workers);
    let bands: Vec<Range<usize>> = out_bands
        .iter()
        .map(|rows| rows.start * ssaa..rows.end * ssaa)
        .collect();

    let mut stats = FrameStats {
        models_submitted: models.len(),
        ..Default::default()
    };

    // Stage 1: clip, project and bucket.
    let setup_start = Instant::now();
    let visible: Vec<(usize, &Model)> = models
        .iter()
        .enumerate()
        .filter(|(_, model)| {
            let keep = pass.skip_texture != Some(model.texture()) && !behind_near_plane(model, pass);
            if !keep {
                stats.models_rejected += 1;
            }
            keep
        })
        .collect();
    let parts = distribute::partition(&distribute::flatten(visible), workers);

    let mut outputs: Vec<WorkerOutput<'_>> = parts.iter().map(|_| WorkerOutput::new(bands.len())).collect();
    scheduler.scope(|scope| {
        for (slices, output) in parts.iter().zip(outputs.iter_mut()) {
            let bands = &bands;
            scope.add_task(
                move || prepare_jobs(slices, models, pass, bands, (width, height), output),
                &[],
            );
        }
    });
    stats.setup_time = setup_start.elapsed();
    for output in &outputs {
        stats.merge(&output.stats);
    }
    trace!("setup: {} jobs in {:.2?}", stats.jobs, stats.setup_time);

    // Stage 2: rasterize and resolve, one task per band.
    let raster_start = Instant::now();
    let Targets {
        depth,
        color,
        world,
        output,
    } = targets;
    let depth_bands = depth.bands_mut(&bands);
    let color_bands = optional_bands(color, &bands);
    let world_bands = optional_bands(world, &bands);
    let (frame_bands, resolve): (Vec<Option<&mut [u32]>>, _) = match output {
        Some(output) => {
            let rows = split_rows(output.frame, output.width, &out_bands);
            (rows.into_iter().map(Some).collect(), Some((output.width, output.ssaa, output.dither)))
        }
        None => (out_bands.iter().map(|_| None).collect(), None),
    };

    let mut pixels = vec![0u64; bands.len()];
    let outputs = &outputs;
    scheduler.scope(|scope| {
        let per_band = depth_bands
            .into_iter()
            .zip(color_bands)
            .zip(world_bands)
            .zip(frame_bands)
            .zip(pixels.iter_mut())
            .zip(out_bands.iter().cloned())
            .enumerate();
        for (band, (((((depth, color), world), frame), pixels), out_rows)) in per_band {
            scope.add_task(
                move || {
                    let mut target = BandTarget { depth, color, world };
                    *pixels = draw_band(band, &mut target, outputs, shading);
                    if let (Some(frame), Some(color), Some((width, ssaa, dither))) =
                        (frame, &target.color, resolve)
                    {
                        resolve_rows(color, frame, out_rows, width, ssaa, dither);
                    }
                },
                &[],
            );
        }
    });
    stats.raster_time = raster_start.elapsed();
    stats.pixels_shaded = pixels.iter().sum();
    trace!("raster: {} pixels in {:.2?}", stats.pixels_shaded, stats.raster_time);

    stats
}

fn optional_bands<'a, T: Copy>(
    buffer: Option<&'a mut Buffer2D<T>>,
    bands: &[Range<usize>],
) -> Vec<Option<BufferRows<'a, T>>> {
    match buffer {
        Some(buffer) => buffer.bands_mut(bands).into_iter().map(Some).collect(),
        None => bands.iter().map(|_| None).collect(),
    }
}

/// Splits a packed frame into the rows of each band.
fn split_rows<'a>(mut frame: &'a mut [u32], width: usize, bands: &[Range<usize>]) -> Vec<&'a mut [u32]> {
    let mut rows = Vec::with_capacity(bands.len());
    for band in bands {
        let (head, tail) = std::mem::take(&mut frame).split_at_mut(band.len() * width);
        rows.push(head);
        frame = tail;
    }
    rows
}

/// Stage 1 for one worker's slices.
fn prepare_jobs<'m>(
    slices: &[Slice],
    models: &'m [Model],
    pass: &Pass<'_>,
    bands: &[Range<usize>],
    (width, height): (usize, usize),
    output: &mut WorkerOutput<'m>,
) {
    let transformer = pass.transformer;
    let stats = &mut output.stats;

    for slice in slices {
        let model = &models[slice.model];
        for triangle in &model.triangles()[slice.range()] {
            stats.triangles_submitted += 1;

            let camera = Triangle::new(
                triangle.verts.map(|v| TexVertex {
                    space: transformer.rotate_and_translate(v.space),
                    ..v
                }),
                triangle.texture,
            );
            let clipped = clip_near(&camera, pass.near_z);
            match clipped {
                Clipped::None => stats.triangles_clipped_away += 1,
                Clipped::Two(..) => stats.triangles_split += 1,
                Clipped::One(_) => {}
            }

            for piece in clipped.iter() {
                let projected = Triangle::new(piece.verts.map(|v| transformer.project_vertex(&v)), piece.texture);
                match RenderJob::setup(projected, model, width, height, pass.cull_backfaces) {
                    Ok(job) => {
                        let index = output.jobs.len();
                        for (band, rows) in bands.iter().enumerate() {
                            if job.rect.overlaps_rows(rows) {
                                output.buckets[band].push(index);
                            }
                        }
                        output.jobs.push(job);
                        stats.jobs += 1;
                    }
                    Err(Rejection::Degenerate) => stats.triangles_degenerate += 1,
                    Err(Rejection::Backface) => stats.triangles_backface += 1,
                    Err(Rejection::Offscreen) => stats.triangles_offscreen += 1,
                }
            }
        }
    }
}

/// Stage 2 for one band: clears it and draws every job bucketed to it, in
/// worker order.
fn draw_band(
    band: usize,
    target: &mut BandTarget<'_>,
    outputs: &[WorkerOutput<'_>],
    shading: Option<&Shading<'_>>,
) -> u64 {
    target.clear();
    let mut pixels = 0;
    for output in outputs {
        for &index in &output.buckets[band] {
            let job = &output.jobs[index];
            pixels += match shading {
                Some(shading) => rasterize(job, target, &shading.shader_for(job)),
                None => rasterize(job, target, &DepthOnlyShader),
            };
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_rows_cover_height() {
        assert_eq!(band_rows(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(band_rows(2, 4), vec![0..0, 0..1, 1..1, 1..2]);
        assert_eq!(band_rows(7, 0), vec![0..7]);
    }

    #[test]
    fn test_split_rows_matches_bands() {
        let mut frame = vec![0u32; 12];
        let rows = split_rows(&mut frame, 3, &[0..1, 1..4]);
        assert_eq!(rows.iter().map(|r| r.len()).collect::<Vec<_>>(), vec![3, 9]);
    }
}
