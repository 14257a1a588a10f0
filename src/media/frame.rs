// SPDX-License-Identifier: MPL-2.0

//! Output frame types emitted by the capture pipeline
//!
//! [`DisplayFrame`] is the uncompressed local-consumer form; all images are
//! RGB8/RGBA8 and the cloud is ready for upload. [`CompressedFrame`] carries
//! the encoded channels for network transport. Channels a frame does not
//! include are left empty/`None`.

use std::time::Duration;

use crate::capture::{AudioFrame, Body, ImuSample};

/// An RGB8 image with its dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RgbImage8 {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 3]>,
}

impl RgbImage8 {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Interleaved view for texture upload or encoding
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// An RGBA8 image with its dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RgbaImage8 {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl RgbaImage8 {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Interleaved view for texture upload or encoding
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// Colored point cloud with optional normals
///
/// `colors` and `normals`, when present, run parallel to `vertices`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColoredCloud {
    /// Camera-space positions, meters
    pub vertices: Vec<[f32; 3]>,
    /// Per-vertex RGB, 0-1
    pub colors: Vec<[f32; 3]>,
    /// Per-vertex unit normals
    pub normals: Vec<[f32; 3]>,
}

impl ColoredCloud {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Flat position buffer for GPU upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.colors.clear();
        self.normals.clear();
    }
}

/// Uncompressed frame for local display
#[derive(Debug, Clone, Default)]
pub struct DisplayFrame {
    pub capture_id: u64,
    /// Capture timestamp, duration since the session epoch
    pub timestamp: Duration,
    /// Session-relative time at which processing of this frame finished
    pub processed_timestamp: Duration,
    /// Full-resolution color
    pub color: RgbaImage8,
    /// Color mapped onto the depth grid
    pub depth_sized_color: RgbaImage8,
    /// False-color depth preview
    pub depth: RgbImage8,
    /// Grayscale infrared preview
    pub infra: RgbImage8,
    /// Gray body-id map
    pub body_index: RgbImage8,
    /// Filtered depth in millimeters, sentinel where invalid
    pub raw_depth: Vec<u16>,
    /// Infrared intensities after invalidation
    pub raw_infra: Vec<u16>,
    pub cloud: ColoredCloud,
    /// Opaque device calibration blob
    pub calibration: Vec<u8>,
    pub imu: Option<ImuSample>,
    pub audio: Vec<AudioFrame>,
    pub bodies: Vec<Body>,
}

/// One encoded channel payload
#[derive(Debug, Clone, Default)]
pub struct EncodedChannel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl EncodedChannel {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Compressed frame for transport or recording
#[derive(Debug, Clone, Default)]
pub struct CompressedFrame {
    /// Identifier of the producing device within the session
    pub device_id: u32,
    pub capture_id: u64,
    /// Capture timestamp, duration since the session epoch
    pub timestamp: Duration,
    /// Count of valid depth pixels; sizes the cloud payloads
    pub valid_vertex_count: usize,
    /// Lossy-encoded full-resolution color
    pub color: EncodedChannel,
    /// Lossy-encoded depth-sized color
    pub depth_sized_color: EncodedChannel,
    /// Lossless-encoded depth
    pub depth: EncodedChannel,
    /// Lossless-encoded infrared
    pub infra: EncodedChannel,
    /// Lossy-encoded body-index visualization
    pub body_index: EncodedChannel,
    /// Lossless-encoded packed cloud coordinates
    pub cloud: EncodedChannel,
    /// Lossy-encoded tiled cloud colors
    pub cloud_color: EncodedChannel,
    /// Opaque device calibration blob
    pub calibration: Vec<u8>,
    pub imu: Option<ImuSample>,
    pub audio: Vec<AudioFrame>,
    pub bodies: Vec<Body>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_views_match_pixel_counts() {
        let img = RgbaImage8 {
            width: 2,
            height: 1,
            pixels: vec![[1, 2, 3, 4], [5, 6, 7, 8]],
        };
        assert_eq!(img.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);

        let cloud = ColoredCloud {
            vertices: vec![[1.0, 2.0, 3.0]],
            ..Default::default()
        };
        assert_eq!(cloud.vertex_bytes().len(), 12);
    }
}
