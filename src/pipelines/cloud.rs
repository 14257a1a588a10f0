// SPDX-License-Identifier: MPL-2.0

//! Display-image and point-cloud generation from a filtered working set
//!
//! Everything here runs after filtering, so a pixel is valid exactly when
//! its mask bit is set and its depth is not the sentinel. Images are built
//! data-parallel per pixel; the cloud is written in vertex-id order.

use glam::Vec3;
use rayon::prelude::*;

use crate::capture::ModeInfo;
use crate::config::{FilterSettings, GenerationSettings};
use crate::constants::{DEPTH_GRADIENT, INFRA_PREVIEW_CEILING, INVALID_COLOR, INVALID_INFRA};
use crate::media::frame::{ColoredCloud, RgbImage8, RgbaImage8};
use crate::pipelines::tables::IndexTables;
use crate::pipelines::working::FrameWorkingSet;

/// Interpolate the false-color depth gradient at `t` in 0..1
pub fn depth_gradient_color(t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (DEPTH_GRADIENT.len() - 1) as f32;
    let idx = (scaled as usize).min(DEPTH_GRADIENT.len() - 2);
    let frac = scaled - idx as f32;
    let a = DEPTH_GRADIENT[idx];
    let b = DEPTH_GRADIENT[idx + 1];
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
    ]
}

pub struct CloudAndImageBuilder;

impl CloudAndImageBuilder {
    /// Overwrite invalidated pixels in the depth-sized color and infra buffers
    ///
    /// Runs before image/cloud generation so every consumer sees the same
    /// invalidated channels.
    pub fn apply_invalidation(mode: &ModeInfo, settings: &FilterSettings, ws: &mut FrameWorkingSet) {
        let size = mode.depth_size();
        if settings.invalidate_color_from_depth && ws.depth_sized_color.len() == size * 4 {
            let mask = &ws.mask;
            ws.depth_sized_color
                .par_chunks_exact_mut(4)
                .enumerate()
                .for_each(|(id, px)| {
                    if mask[id] == 0 {
                        px.copy_from_slice(&INVALID_COLOR);
                    }
                });
        }
        if settings.invalidate_infra_from_depth && ws.infra.len() == size {
            let mask = &ws.mask;
            ws.infra.par_iter_mut().enumerate().for_each(|(id, v)| {
                if mask[id] == 0 {
                    *v = INVALID_INFRA;
                }
            });
        }

        // mark the retained cluster's center of mass for visual feedback
        if settings.invalidate_color_from_depth && ws.depth_sized_color.len() == size * 4 {
            if let Some((col, row)) = ws.biggest_cluster_rep {
                let id = row.round() as usize * mode.depth_width() as usize + col.round() as usize;
                if id < size {
                    ws.depth_sized_color[id * 4..id * 4 + 4].copy_from_slice(&[255, 0, 0, 255]);
                }
            }
        }
    }

    /// False-color depth preview; invalid pixels are black
    pub fn build_depth_image(mode: &ModeInfo, ws: &FrameWorkingSet, out: &mut RgbImage8) {
        out.width = mode.depth_width();
        out.height = mode.depth_height();
        out.pixels.clear();
        if ws.depth.len() != mode.depth_size() {
            out.width = 0;
            out.height = 0;
            return;
        }

        let (min, max) = mode.depth_range_mm();
        let span = (max - min).max(1) as f32;
        out.pixels.resize(mode.depth_size(), [0u8; 3]);
        out.pixels
            .par_iter_mut()
            .zip(ws.depth.par_iter())
            .zip(ws.mask.par_iter())
            .for_each(|((px, &d), &m)| {
                if m == 0 {
                    *px = [0, 0, 0];
                } else {
                    let t = (d.saturating_sub(min) as f32 / span).clamp(0.0, 1.0);
                    let c = depth_gradient_color(t);
                    *px = [
                        (c[0] * 255.0) as u8,
                        (c[1] * 255.0) as u8,
                        (c[2] * 255.0) as u8,
                    ];
                }
            });
    }

    /// Grayscale infrared preview, clamped at the fixed display ceiling
    pub fn build_infra_image(mode: &ModeInfo, ws: &FrameWorkingSet, out: &mut RgbImage8) {
        out.width = mode.depth_width();
        out.height = mode.depth_height();
        out.pixels.clear();
        if ws.infra.len() != mode.depth_size() {
            out.width = 0;
            out.height = 0;
            return;
        }

        out.pixels.resize(mode.depth_size(), [0u8; 3]);
        out.pixels
            .par_iter_mut()
            .zip(ws.infra.par_iter())
            .for_each(|(px, &v)| {
                let g = ((v as f32).min(INFRA_PREVIEW_CEILING) / INFRA_PREVIEW_CEILING * 255.0)
                    as u8;
                *px = [g, g, g];
            });
    }

    /// Gray body-id map; pixel intensity is the raw index
    ///
    /// Matches the transport representation of the channel, so the
    /// background value renders near-white.
    pub fn build_body_index_image(mode: &ModeInfo, ws: &FrameWorkingSet, out: &mut RgbImage8) {
        out.width = mode.depth_width();
        out.height = mode.depth_height();
        out.pixels.clear();
        if ws.body_index.len() != mode.depth_size() {
            out.width = 0;
            out.height = 0;
            return;
        }

        out.pixels.resize(mode.depth_size(), [0u8; 3]);
        out.pixels
            .par_iter_mut()
            .zip(ws.body_index.par_iter())
            .for_each(|(px, &idx)| {
                *px = [idx, idx, idx];
            });
    }

    /// Wrap the already-converted RGBA color buffer as a display image
    pub fn build_color_image(width: u32, height: u32, rgba: &[u8], out: &mut RgbaImage8) {
        out.pixels.clear();
        if rgba.len() != (width * height) as usize * 4 {
            out.width = 0;
            out.height = 0;
            return;
        }
        out.width = width;
        out.height = height;
        out.pixels
            .extend(rgba.chunks_exact(4).map(|px| [px[0], px[1], px[2], px[3]]));
    }

    /// Build the colored cloud for the frame's valid pixels
    ///
    /// Positions convert raw millimeter samples to meters. Colors come from
    /// the depth-sized color image when requested and present, otherwise from
    /// the depth gradient. Normals use the depth slope against the axis
    /// neighbors, falling back to the center depth for missing neighbors.
    pub fn build_cloud(
        mode: &ModeInfo,
        tables: &IndexTables,
        settings: &GenerationSettings,
        ws: &FrameWorkingSet,
        out: &mut ColoredCloud,
    ) {
        out.clear();
        if ws.cloud.len() != mode.depth_size() || ws.valid_vertex_count == 0 {
            return;
        }

        let use_image = settings.cloud_color_from_image
            && ws.depth_sized_color.len() == mode.depth_size() * 4;
        let (range_min, range_max) = mode.depth_range_mm();
        let span = (range_max - range_min).max(1) as f32;

        let count = ws.valid_vertex_count;
        out.vertices.resize(count, [0.0; 3]);
        out.colors.resize(count, [0.0; 3]);
        out.normals.resize(count, [0.0; 3]);

        for &(pixel_id, vertex_id) in &ws.depth_vertex {
            if vertex_id < 0 {
                continue;
            }
            let id = pixel_id as usize;
            let slot = vertex_id as usize;

            let s = ws.cloud[id];
            out.vertices[slot] = [
                s[0] as f32 * 0.001,
                s[1] as f32 * 0.001,
                s[2] as f32 * 0.001,
            ];

            out.colors[slot] = if use_image {
                let px = &ws.depth_sized_color[id * 4..id * 4 + 4];
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ]
            } else {
                let t = (ws.depth[id].saturating_sub(range_min) as f32 / span).clamp(0.0, 1.0);
                depth_gradient_color(t)
            };

            let center = ws.depth[id] as f32;
            let sample = |n: i32| -> f32 {
                if n >= 0 && ws.mask[n as usize] == 1 {
                    ws.depth[n as usize] as f32
                } else {
                    center
                }
            };
            let [b, d, e, g] = tables.neighbours_4[id];
            let ddx = sample(e) - sample(d);
            let ddy = sample(g) - sample(b);
            let n = (Vec3::new(ddx, 0.0, -2.0) + Vec3::new(0.0, ddy, -2.0)).normalize_or_zero();
            out.normals[slot] = n.to_array();
        }
    }
}
