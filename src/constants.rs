// SPDX-License-Identifier: MPL-2.0

//! Crate-wide constants for depth processing and encoding

/// Reserved depth value meaning "no measurement" for a depth pixel (mm)
pub const INVALID_DEPTH_MM: u16 = 0;

/// Value written into the infrared buffer when a pixel is invalidated from depth
pub const INVALID_INFRA: u16 = 0;

/// RGBA value written into depth-sized color pixels invalidated from depth
pub const INVALID_COLOR: [u8; 4] = [0, 0, 0, 0];

/// Body-index map value meaning "background" (no tracked body at this pixel)
pub const BODY_INDEX_BACKGROUND: u8 = 255;

/// Block length of the lossless integer codec
///
/// Input length for [`crate::media::codec::ChannelCodec::encode_lossless_u16`]
/// must be a multiple of this value; callers zero-pad before encoding.
pub const LOSSLESS_BLOCK_LEN: usize = 128;

/// Offset added to camera-space X/Y millimeter samples when packing the
/// cloud into unsigned 16-bit values (samples lie within ±4096 mm laterally)
pub const CLOUD_XY_PACKING_OFFSET: i32 = 4096;

/// Height of the synthetic image used to lossy-encode packed cloud colors
///
/// The tiling is derived purely from the vertex count so that encode and
/// decode always agree: `height = 128`, `width = ceil(count / 128)`.
pub const CLOUD_COLOR_TILE_HEIGHT: u32 = 128;

/// Fixed ceiling for the linear grayscale infrared preview
pub const INFRA_PREVIEW_CEILING: f32 = 2000.0;

/// Five-stop false-color gradient for depth previews and cloud coloring,
/// blue (near) to red (far)
pub const DEPTH_GRADIENT: [[f32; 3]; 5] = [
    [0.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 0.0],
];

/// Number of audio channels per microphone-array frame
pub const AUDIO_CHANNEL_COUNT: usize = 7;

/// Window over which the rolling captures-per-second figure is computed
pub const CAPTURE_RATE_WINDOW_MS: u64 = 5000;
