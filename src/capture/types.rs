// SPDX-License-Identifier: MPL-2.0

//! Raw capture inputs and the device-collaborator boundary
//!
//! The actual sensor/SDK calls that fill these buffers live outside this
//! crate; [`CaptureSource`] is the seam the orchestrator pulls captures
//! through. All buffers are owned here so the working set can borrow them
//! for the duration of one cycle.

use std::time::Duration;

use crate::errors::CaptureError;

/// Inertial sample attached to a capture
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuSample {
    pub temperature: f32,
    /// Accelerometer reading, m/s^2
    pub acc: [f32; 3],
    /// Accelerometer timestamp, microseconds
    pub acc_ts_us: u64,
    /// Gyroscope reading, rad/s
    pub gyr: [f32; 3],
    /// Gyroscope timestamp, microseconds
    pub gyr_ts_us: u64,
}

/// One microphone-array audio frame (7 channels)
pub type AudioFrame = [f32; crate::constants::AUDIO_CHANNEL_COUNT];

/// A body detected by the external tracking collaborator
///
/// Carried through the pipeline untouched; inference is out of scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub id: u32,
    /// Joint positions in camera space, meters
    pub joint_positions: Vec<[f32; 3]>,
    /// Per-joint confidence, same length as `joint_positions`
    pub joint_confidences: Vec<u8>,
}

/// Raw per-capture sensor buffers, as delivered by the device collaborator
///
/// Channels a mode does not provide are left empty. `depth_sized_color` is
/// the device registration transform's output (RGBA8 at depth resolution);
/// producing it requires the device calibration and stays outside this core.
#[derive(Debug, Clone, Default)]
pub struct RawCapture {
    /// Raw color buffer in the mode's [`ColorLayout`](super::mode::ColorLayout)
    pub color: Vec<u8>,
    /// RGBA8 color mapped onto the depth grid by the device transform
    pub depth_sized_color: Vec<u8>,
    /// Depth in millimeters, one value per depth pixel
    pub depth: Vec<u16>,
    /// Infrared intensity, one value per depth pixel
    pub infra: Vec<u16>,
    /// Body-index map, one value per depth pixel (255 = background)
    pub body_index: Vec<u8>,
    /// Camera-space point samples in millimeters, one triple per depth pixel
    pub cloud: Vec<[i16; 3]>,
    /// Opaque device calibration blob
    pub calibration: Vec<u8>,
    pub imu: Option<ImuSample>,
    pub audio: Vec<AudioFrame>,
    pub bodies: Vec<Body>,
    /// Capture timestamp, duration since an arbitrary epoch shared by the session
    pub timestamp: Duration,
}

/// Device-collaborator seam the capture loop reads from
///
/// Implementations wrap the sensor SDK; a read error or timeout marks the
/// whole cycle invalid (the capture-id counter still advances).
pub trait CaptureSource: Send {
    /// Block up to `timeout` for the next capture
    fn read_capture(&mut self, timeout: Duration) -> Result<RawCapture, CaptureError>;
}
