// SPDX-License-Identifier: MPL-2.0

//! Connected-component retention over the validity mask
//!
//! Labels 8-connected components of valid pixels with a flood fill, keeps
//! only the largest one and records its mean (col, row) as the cluster
//! representative.

use crate::pipelines::tables::{Connectivity, IndexTables};
use crate::pipelines::working::FrameWorkingSet;

/// Invalidate every valid pixel outside the largest connected component
pub fn keep_biggest(tables: &IndexTables, ws: &mut FrameWorkingSet) {
    ws.cluster_ids.fill(-1);
    ws.biggest_cluster_rep = None;

    let mut sizes: Vec<usize> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for &seed in &tables.depths_1d {
        if ws.mask[seed] == 0 || ws.cluster_ids[seed] >= 0 {
            continue;
        }
        let label = sizes.len() as i32;
        let mut size = 0usize;
        stack.push(seed);
        ws.cluster_ids[seed] = label;
        while let Some(id) = stack.pop() {
            size += 1;
            for &n in tables.neighbours(Connectivity::Eight, id) {
                if n < 0 {
                    continue;
                }
                let n = n as usize;
                if ws.mask[n] == 1 && ws.cluster_ids[n] < 0 {
                    ws.cluster_ids[n] = label;
                    stack.push(n);
                }
            }
        }
        sizes.push(size);
    }

    let Some(biggest) = sizes
        .iter()
        .enumerate()
        .max_by_key(|&(_, &size)| size)
        .map(|(label, _)| label as i32)
    else {
        return;
    };

    let mut col_sum = 0.0f64;
    let mut row_sum = 0.0f64;
    let mut kept = 0usize;
    for &id in &tables.depths_1d {
        if ws.mask[id] == 0 {
            continue;
        }
        if ws.cluster_ids[id] != biggest {
            ws.invalidate(id);
        } else {
            let coord = tables.coords[id];
            col_sum += coord.col as f64;
            row_sum += coord.row as f64;
            kept += 1;
        }
    }

    if kept > 0 {
        ws.biggest_cluster_rep = Some(((col_sum / kept as f64) as f32, (row_sum / kept as f64) as f32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ColorResolution, DepthMode, ModeInfo, RawCapture};

    fn narrow_binned() -> ModeInfo {
        ModeInfo {
            depth_mode: DepthMode::NarrowBinned,
            color_resolution: ColorResolution::Off,
            ..Default::default()
        }
    }

    #[test]
    fn test_keeps_largest_component() {
        let mode = narrow_binned();
        let tables = IndexTables::build(&mode);
        let w = mode.depth_width() as usize;

        let mut ws = FrameWorkingSet::default();
        ws.rebind(
            &mode,
            RawCapture {
                depth: vec![1000; mode.depth_size()],
                ..Default::default()
            },
        );

        // 3-pixel horizontal run and an isolated pixel two rows below
        for id in [0usize, 1, 2] {
            ws.mask[id] = 1;
        }
        ws.mask[3 * w + 10] = 1;

        keep_biggest(&tables, &mut ws);
        assert_eq!(ws.mask[0], 1);
        assert_eq!(ws.mask[1], 1);
        assert_eq!(ws.mask[2], 1);
        assert_eq!(ws.mask[3 * w + 10], 0);
        assert_eq!(ws.depth[3 * w + 10], 0);
        assert_eq!(ws.biggest_cluster_rep, Some((1.0, 0.0)));
    }

    #[test]
    fn test_diagonal_pixels_connect() {
        let mode = narrow_binned();
        let tables = IndexTables::build(&mode);
        let w = mode.depth_width() as usize;

        let mut ws = FrameWorkingSet::default();
        ws.rebind(
            &mode,
            RawCapture {
                depth: vec![1000; mode.depth_size()],
                ..Default::default()
            },
        );
        // diagonal pair plus a single far-away pixel
        ws.mask[0] = 1;
        ws.mask[w + 1] = 1;
        ws.mask[10 * w] = 1;

        keep_biggest(&tables, &mut ws);
        assert_eq!(ws.mask[0], 1);
        assert_eq!(ws.mask[w + 1], 1);
        assert_eq!(ws.mask[10 * w], 0);
    }

    #[test]
    fn test_empty_mask_is_noop() {
        let mode = narrow_binned();
        let tables = IndexTables::build(&mode);
        let mut ws = FrameWorkingSet::default();
        ws.rebind(&mode, RawCapture::default());
        ws.depth = vec![0; mode.depth_size()];
        keep_biggest(&tables, &mut ws);
        assert!(ws.biggest_cluster_rep.is_none());
    }
}
