// SPDX-License-Identifier: MPL-2.0

//! Mutable per-capture scratch state owned by the capture thread
//!
//! One instance lives for the whole session; buffers grow on demand and are
//! rebound/reset each cycle instead of reallocated. Single writer, no
//! internal locking.

use std::time::Duration;

use crate::capture::{AudioFrame, Body, ImuSample, ModeInfo, RawCapture};
use crate::constants::INVALID_DEPTH_MM;

/// Scratch buffers for one in-flight capture
#[derive(Debug, Default)]
pub struct FrameWorkingSet {
    /// Raw color buffer in the device layout
    pub raw_color: Vec<u8>,
    /// Color converted to RGBA8 at color resolution
    pub converted_color: Vec<u8>,
    /// RGBA8 color at depth resolution
    pub depth_sized_color: Vec<u8>,
    pub depth: Vec<u16>,
    pub infra: Vec<u16>,
    pub body_index: Vec<u8>,
    /// Camera-space point samples, millimeters
    pub cloud: Vec<[i16; 3]>,
    /// Per-pixel validity, 1 = kept
    pub mask: Vec<u8>,
    /// Scratch mask for the iterative filters
    pub filtering_mask: Vec<u8>,
    /// Per-pixel cluster label for the largest-cluster filter
    pub cluster_ids: Vec<i32>,
    /// Per-pixel (pixel id, vertex id); vertex id is -1 for invalid pixels
    pub depth_vertex: Vec<(u32, i32)>,
    /// Count of valid pixels after filtering
    pub valid_vertex_count: usize,
    /// Mean (col, row) of the retained cluster, if one was computed
    pub biggest_cluster_rep: Option<(f32, f32)>,
    pub calibration: Vec<u8>,
    pub imu: Option<ImuSample>,
    pub audio: Vec<AudioFrame>,
    pub bodies: Vec<Body>,
    pub timestamp: Duration,
}

impl FrameWorkingSet {
    /// Take over one raw capture's buffers and reset the derived state
    ///
    /// Depth-sized scratch buffers are resized to the mode's pixel count;
    /// capacity is kept across cycles.
    pub fn rebind(&mut self, mode: &ModeInfo, capture: RawCapture) {
        let depth_size = mode.depth_size();

        self.raw_color = capture.color;
        self.depth_sized_color = capture.depth_sized_color;
        self.depth = capture.depth;
        self.infra = capture.infra;
        self.body_index = capture.body_index;
        self.cloud = capture.cloud;
        self.calibration = capture.calibration;
        self.imu = capture.imu;
        self.audio = capture.audio;
        self.bodies = capture.bodies;
        self.timestamp = capture.timestamp;

        self.converted_color.clear();

        self.mask.clear();
        self.mask.resize(depth_size, 0);
        self.filtering_mask.clear();
        self.filtering_mask.resize(depth_size, 0);
        self.cluster_ids.clear();
        self.cluster_ids.resize(depth_size, -1);

        self.depth_vertex.clear();
        self.depth_vertex
            .extend((0..depth_size as u32).map(|id| (id, -1i32)));

        self.valid_vertex_count = 0;
        self.biggest_cluster_rep = None;
    }

    /// True when the pixel survived filtering so far
    #[inline]
    pub fn is_valid(&self, id: usize) -> bool {
        self.mask[id] == 1
    }

    /// Drop the pixel: clear its mask bit and reset its depth to the sentinel
    #[inline]
    pub fn invalidate(&mut self, id: usize) {
        self.mask[id] = 0;
        self.depth[id] = INVALID_DEPTH_MM;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ColorResolution, DepthMode};

    #[test]
    fn test_rebind_resets_derived_state() {
        let mode = ModeInfo {
            depth_mode: DepthMode::NarrowBinned,
            color_resolution: ColorResolution::Off,
            ..Default::default()
        };
        let size = mode.depth_size();

        let mut ws = FrameWorkingSet::default();
        ws.rebind(
            &mode,
            RawCapture {
                depth: vec![1000; size],
                ..Default::default()
            },
        );
        ws.mask.fill(1);
        ws.valid_vertex_count = size;
        ws.biggest_cluster_rep = Some((1.0, 2.0));

        ws.rebind(
            &mode,
            RawCapture {
                depth: vec![1500; size],
                ..Default::default()
            },
        );
        assert_eq!(ws.mask.len(), size);
        assert!(ws.mask.iter().all(|&m| m == 0));
        assert_eq!(ws.valid_vertex_count, 0);
        assert!(ws.biggest_cluster_rep.is_none());
        assert_eq!(ws.depth_vertex[0], (0, -1));
        assert_eq!(ws.depth_vertex[size - 1], (size as u32 - 1, -1));
    }

    #[test]
    fn test_invalidate_clears_depth() {
        let mode = ModeInfo {
            depth_mode: DepthMode::NarrowBinned,
            color_resolution: ColorResolution::Off,
            ..Default::default()
        };
        let mut ws = FrameWorkingSet::default();
        ws.rebind(
            &mode,
            RawCapture {
                depth: vec![1200; mode.depth_size()],
                ..Default::default()
            },
        );
        ws.mask[42] = 1;
        ws.invalidate(42);
        assert!(!ws.is_valid(42));
        assert_eq!(ws.depth[42], INVALID_DEPTH_MM);
    }
}
