// SPDX-License-Identifier: MPL-2.0

//! End-to-end filtering and generation tests over synthetic captures

use std::time::Duration;

use depthcap::capture::{ColorResolution, DepthMode, ModeInfo, RawCapture};
use depthcap::config::FilterSettings;
use depthcap::constants::INVALID_DEPTH_MM;
use depthcap::pipelines::{DepthFilterPipeline, FrameWorkingSet, IndexTables};

fn narrow_binned() -> ModeInfo {
    ModeInfo {
        depth_mode: DepthMode::NarrowBinned,
        color_resolution: ColorResolution::Off,
        ..Default::default()
    }
}

/// Depth buffer that is the sentinel everywhere except inside `blobs`
fn blob_capture(mode: &ModeInfo, blobs: &[(usize, usize, usize, usize)]) -> RawCapture {
    let w = mode.depth_width() as usize;
    let mut depth = vec![INVALID_DEPTH_MM; mode.depth_size()];
    for &(col0, row0, bw, bh) in blobs {
        for row in row0..row0 + bh {
            for col in col0..col0 + bw {
                depth[row * w + col] = 1000;
            }
        }
    }
    RawCapture {
        depth,
        timestamp: Duration::from_millis(1),
        ..Default::default()
    }
}

fn no_complex_filters() -> FilterSettings {
    FilterSettings {
        do_local_diff_filtering: false,
        ..Default::default()
    }
}

#[test]
fn biggest_cluster_retention_drops_small_blob() {
    let mode = narrow_binned();
    let tables = IndexTables::build(&mode);
    let w = mode.depth_width() as usize;

    // a 10x10 blob and a disjoint 3x3 blob
    let mut ws = FrameWorkingSet::default();
    ws.rebind(&mode, blob_capture(&mode, &[(10, 10, 10, 10), (100, 100, 3, 3)]));

    let settings = FilterSettings {
        keep_only_biggest_cluster: true,
        ..no_complex_filters()
    };
    DepthFilterPipeline::apply(&mode, &tables, &settings, &mut ws);

    assert_eq!(ws.valid_vertex_count, 100);
    assert_eq!(ws.mask[15 * w + 15], 1);
    assert_eq!(ws.mask[101 * w + 101], 0);
    assert_eq!(ws.depth[101 * w + 101], INVALID_DEPTH_MM);

    // representative sits at the kept blob's center of mass
    let (col, row) = ws.biggest_cluster_rep.unwrap();
    assert!((col - 14.5).abs() < 1e-3);
    assert!((row - 14.5).abs() < 1e-3);
}

#[test]
fn mask_and_sentinel_agree_after_every_stage_mix() {
    let mode = narrow_binned();
    let tables = IndexTables::build(&mode);

    let mut ws = FrameWorkingSet::default();
    ws.rebind(&mode, blob_capture(&mode, &[(50, 50, 40, 40)]));

    let settings = FilterSettings {
        do_min_neighbours_filtering: true,
        nb_min_neighbours: 2,
        do_erosion: true,
        erosion_loops: 2,
        keep_only_biggest_cluster: true,
        ..FilterSettings::default()
    };
    DepthFilterPipeline::apply(&mode, &tables, &settings, &mut ws);

    for id in 0..mode.depth_size() {
        assert_eq!(
            ws.mask[id] == 1,
            ws.depth[id] != INVALID_DEPTH_MM,
            "pixel {id} disagrees"
        );
    }
}

#[test]
fn vertex_ids_stay_dense_and_raster_ordered() {
    let mode = narrow_binned();
    let tables = IndexTables::build(&mode);

    let mut ws = FrameWorkingSet::default();
    ws.rebind(&mode, blob_capture(&mode, &[(0, 0, 30, 30), (200, 200, 20, 20)]));
    DepthFilterPipeline::apply(&mode, &tables, &no_complex_filters(), &mut ws);

    assert_eq!(ws.valid_vertex_count, 30 * 30 + 20 * 20);
    let mut expected = 0i32;
    for &(_, vertex_id) in &ws.depth_vertex {
        if vertex_id >= 0 {
            assert_eq!(vertex_id, expected);
            expected += 1;
        }
    }
    assert_eq!(expected as usize, ws.valid_vertex_count);
}

#[test]
fn erosion_peels_blob_border() {
    let mode = narrow_binned();
    let tables = IndexTables::build(&mode);
    let w = mode.depth_width() as usize;

    let mut ws = FrameWorkingSet::default();
    ws.rebind(&mode, blob_capture(&mode, &[(20, 20, 10, 10)]));

    let settings = FilterSettings {
        do_erosion: true,
        erosion_loops: 1,
        erosion_min_neighbours: 8,
        ..no_complex_filters()
    };
    DepthFilterPipeline::apply(&mode, &tables, &settings, &mut ws);

    // a full ring requires 8 valid neighbors, so one pass shrinks 10x10 to 8x8
    assert_eq!(ws.valid_vertex_count, 64);
    assert_eq!(ws.mask[20 * w + 20], 0);
    assert_eq!(ws.mask[21 * w + 21], 1);
}

#[test]
fn color_mismatch_can_invalidate_everything() {
    let mode = narrow_binned();
    let tables = IndexTables::build(&mode);

    let mut capture = blob_capture(&mode, &[(0, 0, 320, 288)]);
    capture.depth_sized_color = vec![0u8; mode.depth_size() * 4];
    for px in capture.depth_sized_color.chunks_exact_mut(4) {
        px.copy_from_slice(&[0, 0, 255, 255]); // uniform blue
    }

    let mut ws = FrameWorkingSet::default();
    ws.rebind(&mode, capture);

    let settings = FilterSettings {
        filter_depth_with_color: true,
        filter_color: [1.0, 0.0, 0.0], // looking for red
        max_diff_color: [30.0, 0.2, 0.2],
        ..no_complex_filters()
    };
    DepthFilterPipeline::apply(&mode, &tables, &settings, &mut ws);

    assert_eq!(ws.valid_vertex_count, 0);
    assert!(ws.depth.iter().all(|&d| d == INVALID_DEPTH_MM));
    assert!(ws.depth_vertex.iter().all(|&(_, v)| v == -1));
}

#[test]
fn empty_depth_short_circuits() {
    let mode = narrow_binned();
    let tables = IndexTables::build(&mode);
    let mut ws = FrameWorkingSet::default();
    // rebind with a capture carrying no depth at all
    ws.rebind(&mode, RawCapture::default());
    DepthFilterPipeline::apply(&mode, &tables, &FilterSettings::default(), &mut ws);
    assert_eq!(ws.valid_vertex_count, 0);
}
