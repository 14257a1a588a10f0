// SPDX-License-Identifier: MPL-2.0

//! Capture-mode description: resolutions, depth range and channel availability
//!
//! A [`ModeInfo`] is fixed for the lifetime of a capture session; index tables
//! and working-set storage are rebuilt whenever the mode changes.

use serde::{Deserialize, Serialize};

/// Depth sensor operating mode
///
/// Resolutions and usable ranges follow the sensor datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthMode {
    /// Depth disabled
    Off,
    /// Narrow field of view, unbinned: 640x576, 0.50-3.86 m
    #[default]
    NarrowUnbinned,
    /// Narrow field of view, 2x2 binned: 320x288, 0.50-5.46 m
    NarrowBinned,
    /// Wide field of view, 2x2 binned: 512x512, 0.25-2.88 m
    WideBinned,
    /// Wide field of view, unbinned: 1024x1024, 0.25-2.21 m
    WideUnbinned,
}

impl DepthMode {
    /// Depth image resolution, (width, height) in pixels
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            DepthMode::Off => (0, 0),
            DepthMode::NarrowUnbinned => (640, 576),
            DepthMode::NarrowBinned => (320, 288),
            DepthMode::WideBinned => (512, 512),
            DepthMode::WideUnbinned => (1024, 1024),
        }
    }

    /// Usable depth range in millimeters, (min, max)
    pub fn range_mm(&self) -> (u16, u16) {
        match self {
            DepthMode::Off => (0, 0),
            DepthMode::NarrowUnbinned => (500, 3860),
            DepthMode::NarrowBinned => (500, 5460),
            DepthMode::WideBinned => (250, 2880),
            DepthMode::WideUnbinned => (250, 2210),
        }
    }
}

/// Color camera resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorResolution {
    /// Color disabled
    Off,
    /// 1280x720
    #[default]
    R720,
    /// 1920x1080
    R1080,
    /// 2560x1440
    R1440,
}

impl ColorResolution {
    /// Color image resolution, (width, height) in pixels
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            ColorResolution::Off => (0, 0),
            ColorResolution::R720 => (1280, 720),
            ColorResolution::R1080 => (1920, 1080),
            ColorResolution::R1440 => (2560, 1440),
        }
    }
}

/// Raw color buffer layout delivered by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorLayout {
    /// Planar luma followed by interleaved chroma (NV12)
    PlanarLumaChroma,
    /// Packed 4:2:2, Y0 U Y1 V per 2 pixels (YUY2)
    Packed422,
    /// JPEG-compressed payload (MJPG)
    Compressed,
    /// Packed 32-bit BGRA
    #[default]
    Packed32,
}

/// Immutable per-mode configuration
///
/// Pure data; the capture thread reads it, nothing mutates it mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeInfo {
    pub depth_mode: DepthMode,
    pub color_resolution: ColorResolution,
    pub color_layout: ColorLayout,
    /// Infrared channel is delivered alongside depth in this mode
    pub has_infra: bool,
    /// Camera-space point samples are delivered in this mode
    pub has_cloud: bool,
    /// Body-index map is delivered in this mode
    pub has_body_index: bool,
}

impl Default for ModeInfo {
    fn default() -> Self {
        Self {
            depth_mode: DepthMode::NarrowUnbinned,
            color_resolution: ColorResolution::R720,
            color_layout: ColorLayout::Packed32,
            has_infra: true,
            has_cloud: true,
            has_body_index: false,
        }
    }
}

impl ModeInfo {
    pub fn has_depth(&self) -> bool {
        self.depth_mode != DepthMode::Off
    }

    pub fn has_color(&self) -> bool {
        self.color_resolution != ColorResolution::Off
    }

    /// Depth image width in pixels
    pub fn depth_width(&self) -> u32 {
        self.depth_mode.resolution().0
    }

    /// Depth image height in pixels
    pub fn depth_height(&self) -> u32 {
        self.depth_mode.resolution().1
    }

    /// Number of depth pixels
    pub fn depth_size(&self) -> usize {
        let (w, h) = self.depth_mode.resolution();
        (w * h) as usize
    }

    /// Color image width in pixels
    pub fn color_width(&self) -> u32 {
        self.color_resolution.resolution().0
    }

    /// Color image height in pixels
    pub fn color_height(&self) -> u32 {
        self.color_resolution.resolution().1
    }

    /// Number of color pixels
    pub fn color_size(&self) -> usize {
        let (w, h) = self.color_resolution.resolution();
        (w * h) as usize
    }

    /// Usable depth range in millimeters, (min, max)
    pub fn depth_range_mm(&self) -> (u16, u16) {
        self.depth_mode.range_mm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_dimensions() {
        let mode = ModeInfo::default();
        assert_eq!(mode.depth_width(), 640);
        assert_eq!(mode.depth_height(), 576);
        assert_eq!(mode.depth_size(), 640 * 576);
        assert_eq!(mode.depth_range_mm(), (500, 3860));
    }

    #[test]
    fn test_off_modes() {
        let mode = ModeInfo {
            depth_mode: DepthMode::Off,
            color_resolution: ColorResolution::Off,
            ..Default::default()
        };
        assert!(!mode.has_depth());
        assert!(!mode.has_color());
        assert_eq!(mode.depth_size(), 0);
    }
}
