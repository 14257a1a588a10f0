// SPDX-License-Identifier: MPL-2.0

//! Depth validity filtering
//!
//! Runs the full stage sequence over one working set: basic range/crop
//! checks, color matching, geometric culls, then the neighborhood filters
//! that need the precomputed index tables. Filtering only flips mask bits;
//! the final numbering pass resets invalid depths to the sentinel and hands
//! out dense vertex ids, so after [`DepthFilterPipeline::apply`] a pixel is
//! masked valid exactly when its depth is not the sentinel.
//!
//! Per-pixel stages run data-parallel; the neighborhood stages write to a
//! scratch mask first so every pass reads a consistent snapshot.

use glam::{EulerRot, Mat3, Vec3};
use rayon::prelude::*;

use crate::capture::ModeInfo;
use crate::config::{FilterSettings, PlaneFilteringMode};
use crate::constants::INVALID_DEPTH_MM;
use crate::media::convert::rgb_to_hsv;
use crate::pipelines::cluster;
use crate::pipelines::tables::{Connectivity, IndexTables};
use crate::pipelines::working::FrameWorkingSet;

pub struct DepthFilterPipeline;

impl DepthFilterPipeline {
    /// Run every enabled stage and number the surviving pixels
    pub fn apply(
        mode: &ModeInfo,
        tables: &IndexTables,
        settings: &FilterSettings,
        ws: &mut FrameWorkingSet,
    ) {
        if ws.depth.len() != mode.depth_size() || ws.depth.is_empty() {
            ws.valid_vertex_count = 0;
            return;
        }

        basic_filter(mode, settings, ws);
        color_filter(mode, settings, ws);
        geometry_filter(mode, settings, ws);

        if settings.do_local_diff_filtering {
            local_diff_filter(
                tables,
                settings.local_diff_connectivity,
                settings.max_local_diff,
                ws,
            );
        }
        if settings.do_min_neighbours_filtering {
            for _ in 0..settings.min_neighbours_loops {
                neighbour_count_filter(
                    tables,
                    settings.min_neighbours_connectivity,
                    settings.nb_min_neighbours,
                    ws,
                );
            }
        }
        if settings.do_erosion {
            for _ in 0..settings.erosion_loops {
                neighbour_count_filter(
                    tables,
                    settings.erosion_connectivity,
                    settings.erosion_min_neighbours,
                    ws,
                );
            }
        }
        if settings.keep_only_biggest_cluster {
            cluster::keep_biggest(tables, ws);
        }
        if settings.remove_after_closest_point {
            closest_point_filter(settings.max_distance_after_closest_point, ws);
        }

        number_vertices(ws);
    }
}

/// Crop-window and depth-range validity, from a fully reset mask
fn basic_filter(mode: &ModeInfo, settings: &FilterSettings, ws: &mut FrameWorkingSet) {
    let width = mode.depth_width() as f32;
    let height = mode.depth_height() as f32;
    let (range_min, range_max) = mode.depth_range_mm();
    let span = (range_max - range_min) as f32;

    let min_col = settings.min_width_f * width;
    let max_col = settings.max_width_f * width;
    let min_row = settings.min_height_f * height;
    let max_row = settings.max_height_f * height;
    let min_depth = (range_min as f32 + settings.min_depth_f * span) as u16;
    let max_depth = (range_min as f32 + settings.max_depth_f * span) as u16;

    let w = mode.depth_width() as usize;
    let depth = &ws.depth;
    ws.mask
        .par_iter_mut()
        .enumerate()
        .for_each(|(id, m)| {
            let d = depth[id];
            if d == INVALID_DEPTH_MM {
                *m = 0;
                return;
            }
            let col = (id % w) as f32;
            let row = (id / w) as f32;
            let inside = col >= min_col
                && col < max_col
                && row >= min_row
                && row < max_row
                && d >= min_depth
                && d <= max_depth;
            *m = inside as u8;
        });
}

/// Invalidate pixels whose depth-sized color strays from the reference HSV
fn color_filter(mode: &ModeInfo, settings: &FilterSettings, ws: &mut FrameWorkingSet) {
    if !settings.filter_depth_with_color {
        return;
    }
    if ws.depth_sized_color.len() != mode.depth_size() * 4 {
        tracing::warn!(
            got = ws.depth_sized_color.len(),
            expected = mode.depth_size() * 4,
            "depth-sized color missing or mismatched, skipping color filter"
        );
        return;
    }

    let reference = rgb_to_hsv(settings.filter_color);
    let max_diff = settings.max_diff_color;
    let color = &ws.depth_sized_color;

    ws.mask.par_iter_mut().enumerate().for_each(|(id, m)| {
        if *m == 0 {
            return;
        }
        let px = &color[id * 4..id * 4 + 4];
        let hsv = rgb_to_hsv([
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ]);
        if (hsv[0] - reference[0]).abs() > max_diff[0]
            || (hsv[1] - reference[1]).abs() > max_diff[1]
            || (hsv[2] - reference[2]).abs() > max_diff[2]
        {
            *m = 0;
        }
    });
}

/// Plane, sphere and oriented-box culls over the camera-space cloud
fn geometry_filter(mode: &ModeInfo, settings: &FilterSettings, ws: &mut FrameWorkingSet) {
    if !settings.filter_depth_with_cloud {
        return;
    }
    let plane_on = settings.plane_mode != PlaneFilteringMode::None;
    if !plane_on && !settings.filter_with_sphere && !settings.keep_only_points_inside_box {
        return;
    }
    if ws.cloud.len() != mode.depth_size() {
        tracing::warn!(
            got = ws.cloud.len(),
            expected = mode.depth_size(),
            "cloud missing or mismatched, skipping geometry filters"
        );
        return;
    }

    let plane_a = Vec3::from_array(settings.plane_a);
    let plane_b = Vec3::from_array(settings.plane_b);
    let plane_c = Vec3::from_array(settings.plane_c);
    let plane_mean = (plane_a + plane_b + plane_c) / 3.0;
    let plane_normal = (plane_b - plane_a).cross(plane_c - plane_a);
    // three collinear points give no plane
    let plane_on = plane_on && plane_normal.length_squared() > f32::EPSILON;
    let plane_normal = plane_normal.normalize_or_zero();

    let sphere_center = Vec3::from_array(settings.sphere_center);
    let max_sphere_sq = settings.max_sphere_distance * settings.max_sphere_distance;

    let box_position = Vec3::from_array(settings.box_position);
    let box_half = Vec3::from_array(settings.box_size) * 0.5;
    let box_inv_rot = Mat3::from_euler(
        EulerRot::XYZ,
        settings.box_rotation[0].to_radians(),
        settings.box_rotation[1].to_radians(),
        settings.box_rotation[2].to_radians(),
    )
    .transpose();

    let cloud = &ws.cloud;
    let plane_mode = settings.plane_mode;
    let sphere_on = settings.filter_with_sphere;
    let box_on = settings.keep_only_points_inside_box;

    ws.mask.par_iter_mut().enumerate().for_each(|(id, m)| {
        if *m == 0 {
            return;
        }
        let s = cloud[id];
        let p = Vec3::new(s[0] as f32, s[1] as f32, s[2] as f32) * 0.001;

        if plane_on {
            let signed = (p - plane_mean).dot(plane_normal);
            let cut = match plane_mode {
                PlaneFilteringMode::Above => signed > 0.0,
                PlaneFilteringMode::Below => signed < 0.0,
                PlaneFilteringMode::None => false,
            };
            if cut {
                *m = 0;
                return;
            }
        }
        if sphere_on && (p - sphere_center).length_squared() > max_sphere_sq {
            *m = 0;
            return;
        }
        if box_on {
            let local = box_inv_rot * (p - box_position);
            if local.x.abs() > box_half.x || local.y.abs() > box_half.y || local.z.abs() > box_half.z
            {
                *m = 0;
            }
        }
    });
}

/// Invalidate pixels whose mean depth difference to valid neighbors is too big
///
/// Only interior pixels are evaluated; the outer 1-pixel ring is always
/// invalidated while this stage runs. A valid pixel with no valid neighbor
/// is dropped too.
fn local_diff_filter(
    tables: &IndexTables,
    connectivity: Connectivity,
    max_local_diff: f32,
    ws: &mut FrameWorkingSet,
) {
    ws.filtering_mask.fill(0);
    for &id in &tables.depths_1d_no_borders {
        if ws.mask[id] == 0 {
            continue;
        }
        let current = ws.depth[id] as f32;
        let mut sum = 0.0f32;
        let mut count = 0u32;
        // interior pixels have their full neighbor set on-grid
        for &n in tables.neighbours(connectivity, id) {
            let n = n as usize;
            if ws.mask[n] == 1 {
                sum += (ws.depth[n] as f32 - current).abs();
                count += 1;
            }
        }
        if count > 0 && sum / count as f32 <= max_local_diff {
            ws.filtering_mask[id] = 1;
        }
    }
    ws.mask.copy_from_slice(&ws.filtering_mask);
}

/// One pass dropping valid pixels with fewer than `minimum` valid neighbors
fn neighbour_count_filter(
    tables: &IndexTables,
    connectivity: Connectivity,
    minimum: u8,
    ws: &mut FrameWorkingSet,
) {
    ws.filtering_mask.copy_from_slice(&ws.mask);
    for &id in &tables.depths_1d {
        if ws.mask[id] == 0 {
            continue;
        }
        let mut count = 0u8;
        for &n in tables.neighbours(connectivity, id) {
            if n >= 0 && ws.mask[n as usize] == 1 {
                count += 1;
            }
        }
        if count < minimum {
            ws.filtering_mask[id] = 0;
        }
    }
    ws.mask.copy_from_slice(&ws.filtering_mask);
}

/// Drop everything farther than the closest valid point plus a margin
fn closest_point_filter(margin_m: f32, ws: &mut FrameWorkingSet) {
    let closest = ws
        .depth
        .par_iter()
        .zip(ws.mask.par_iter())
        .filter(|(_, &m)| m == 1)
        .map(|(&d, _)| d)
        .min();
    let Some(closest) = closest else {
        return;
    };

    let cutoff = closest as f32 + margin_m * 1000.0;
    let depth = &ws.depth;
    ws.mask.par_iter_mut().enumerate().for_each(|(id, m)| {
        if *m == 1 && depth[id] as f32 > cutoff {
            *m = 0;
        }
    });
}

/// Assign dense vertex ids to valid pixels and reset invalid depths
fn number_vertices(ws: &mut FrameWorkingSet) {
    let mut next = 0i32;
    for id in 0..ws.depth.len() {
        if ws.mask[id] == 1 {
            ws.depth_vertex[id].1 = next;
            next += 1;
        } else {
            ws.depth_vertex[id].1 = -1;
            ws.depth[id] = INVALID_DEPTH_MM;
        }
    }
    ws.valid_vertex_count = next as usize;
}
