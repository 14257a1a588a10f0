// SPDX-License-Identifier: MPL-2.0

//! Per-channel encoders for compressed frames
//!
//! Image channels use lossy JPEG; 16-bit channels (depth, infra, packed
//! cloud coordinates) use a lossless fixed-block bit-packing codec. The
//! lossless codec works on blocks of 128 values, so every input must be
//! zero-padded to a multiple of 128 before encoding.
//!
//! Lossless stream layout, per block: one `num_bits` byte followed by
//! `num_bits * 16` packed bytes.

use bitpacking::{BitPacker, BitPacker4x};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::constants::{CLOUD_COLOR_TILE_HEIGHT, CLOUD_XY_PACKING_OFFSET, LOSSLESS_BLOCK_LEN};
use crate::errors::CodecError;

/// Stateful channel encoder with reusable scratch storage
///
/// Scratch buffers grow to the largest channel seen and stay allocated, so a
/// long-lived codec does no per-frame allocation on the lossless path.
pub struct ChannelCodec {
    packer: BitPacker4x,
    widen: Vec<u32>,
    packed: Vec<u8>,
    rgb: Vec<u8>,
}

impl Default for ChannelCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelCodec {
    pub fn new() -> Self {
        Self {
            packer: BitPacker4x::new(),
            widen: Vec::new(),
            packed: Vec::new(),
            rgb: Vec::new(),
        }
    }

    /// Lossy-encode an interleaved RGB8/RGBA8 image to JPEG
    ///
    /// `channels` must be 3 or 4. JPEG carries RGB only, so 4-channel input
    /// has its alpha stripped into a reusable scratch buffer first.
    pub fn encode_lossy_image(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u8,
        quality: u8,
    ) -> Result<Vec<u8>, CodecError> {
        let expected = (width * height) as usize * channels as usize;
        if pixels.len() != expected {
            return Err(CodecError::EncoderFailed(format!(
                "image buffer holds {} bytes, expected {expected}",
                pixels.len()
            )));
        }

        let rgb: &[u8] = match channels {
            3 => pixels,
            4 => {
                self.rgb.clear();
                self.rgb
                    .extend(pixels.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]));
                &self.rgb
            }
            other => return Err(CodecError::InvalidChannelCount(other)),
        };

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode(rgb, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| CodecError::EncoderFailed(e.to_string()))?;
        Ok(out)
    }

    /// Lossless-encode a 16-bit channel
    ///
    /// `values.len()` must be a multiple of the 128-value block length.
    pub fn encode_lossless_u16(&mut self, values: &[u16]) -> Result<Vec<u8>, CodecError> {
        if values.is_empty() || values.len() % LOSSLESS_BLOCK_LEN != 0 {
            return Err(CodecError::NotBlockPadded(values.len()));
        }

        self.widen.clear();
        self.widen.extend(values.iter().map(|&v| v as u32));
        self.packed.resize(4 * BitPacker4x::BLOCK_LEN, 0);

        let mut out = Vec::with_capacity(values.len());
        for block in self.widen.chunks_exact(BitPacker4x::BLOCK_LEN) {
            let num_bits = self.packer.num_bits(block);
            let written = self.packer.compress(block, &mut self.packed, num_bits);
            out.push(num_bits);
            out.extend_from_slice(&self.packed[..written]);
        }
        Ok(out)
    }

    /// Decode a stream produced by [`encode_lossless_u16`](Self::encode_lossless_u16)
    ///
    /// `value_count` is the padded length of the source channel.
    pub fn decode_lossless_u16(
        &mut self,
        data: &[u8],
        value_count: usize,
    ) -> Result<Vec<u16>, CodecError> {
        if value_count == 0 || value_count % LOSSLESS_BLOCK_LEN != 0 {
            return Err(CodecError::NotBlockPadded(value_count));
        }

        self.widen.clear();
        self.widen.resize(BitPacker4x::BLOCK_LEN, 0);

        let mut out = Vec::with_capacity(value_count);
        let mut offset = 0usize;
        for _ in 0..value_count / LOSSLESS_BLOCK_LEN {
            let num_bits = *data
                .get(offset)
                .ok_or_else(|| CodecError::DecoderFailed("stream truncated".into()))?;
            offset += 1;
            let block_bytes = num_bits as usize * BitPacker4x::BLOCK_LEN / 8;
            let block = data
                .get(offset..offset + block_bytes)
                .ok_or_else(|| CodecError::DecoderFailed("stream truncated".into()))?;
            offset += block_bytes;

            self.packer.decompress(block, &mut self.widen, num_bits);
            for &v in self.widen.iter() {
                if v > u16::MAX as u32 {
                    return Err(CodecError::DecoderFailed(format!(
                        "decoded value {v} exceeds 16 bits"
                    )));
                }
                out.push(v as u16);
            }
        }

        if offset != data.len() {
            return Err(CodecError::DecoderFailed(format!(
                "{} trailing bytes after the last block",
                data.len() - offset
            )));
        }
        Ok(out)
    }
}

/// Round `count` up to the next block boundary
#[inline]
pub fn padded_len(count: usize) -> usize {
    count + (LOSSLESS_BLOCK_LEN - count % LOSSLESS_BLOCK_LEN) % LOSSLESS_BLOCK_LEN
}

/// Tiled image dimensions holding `valid_count` cloud colors
///
/// Colors are laid out column-major in fixed-height tiles; the last tile is
/// zero-padded. Empty input yields a 0x0 image.
pub fn cloud_color_tiling(valid_count: usize) -> (u32, u32) {
    if valid_count == 0 {
        return (0, 0);
    }
    let h = CLOUD_COLOR_TILE_HEIGHT as usize;
    let w = valid_count.div_ceil(h);
    (w as u32, CLOUD_COLOR_TILE_HEIGHT)
}

/// Pack valid cloud points into a lossless-codec-ready u16 buffer
///
/// Layout is three equal regions (x, y, z), each the padded valid count
/// long. X and Y are offset so camera-space negatives fit in u16; Z is the
/// raw millimeter value. Pad slots are zero.
pub fn pack_cloud(cloud: &[[i16; 3]], depth_vertex: &[(u32, i32)], valid_count: usize) -> Vec<u16> {
    let region = padded_len(valid_count);
    let mut out = vec![0u16; 3 * region];

    for &(pixel_id, vertex_id) in depth_vertex {
        if vertex_id < 0 {
            continue;
        }
        let v = cloud[pixel_id as usize];
        let slot = vertex_id as usize;
        out[slot] = (v[0] as i32 + CLOUD_XY_PACKING_OFFSET) as u16;
        out[region + slot] = (v[1] as i32 + CLOUD_XY_PACKING_OFFSET) as u16;
        out[2 * region + slot] = v[2] as u16;
    }

    out
}

/// Unpack a buffer produced by [`pack_cloud`] back to millimeter triples
pub fn unpack_cloud(packed: &[u16], valid_count: usize) -> Vec<[i16; 3]> {
    let region = padded_len(valid_count);
    let mut out = Vec::with_capacity(valid_count);
    for slot in 0..valid_count {
        out.push([
            (packed[slot] as i32 - CLOUD_XY_PACKING_OFFSET) as i16,
            (packed[region + slot] as i32 - CLOUD_XY_PACKING_OFFSET) as i16,
            packed[2 * region + slot] as i16,
        ]);
    }
    out
}

/// Gather valid pixels' colors into the tiled RGBA image for lossy encoding
///
/// `depth_sized_color` is interleaved RGBA8 at depth resolution. Returns the
/// tiled pixel buffer and its dimensions.
pub fn pack_cloud_colors(
    depth_sized_color: &[u8],
    depth_vertex: &[(u32, i32)],
    valid_count: usize,
) -> (Vec<u8>, u32, u32) {
    let (w, h) = cloud_color_tiling(valid_count);
    let mut out = vec![0u8; (w * h) as usize * 4];

    for &(pixel_id, vertex_id) in depth_vertex {
        if vertex_id < 0 {
            continue;
        }
        let src = pixel_id as usize * 4;
        let dst = vertex_id as usize * 4;
        out[dst..dst + 4].copy_from_slice(&depth_sized_color[src..src + 4]);
    }

    (out, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lossless_round_trip() {
        let mut codec = ChannelCodec::new();
        let values: Vec<u16> = (0..512).map(|i| (i * 13 % 5000) as u16).collect();
        let encoded = codec.encode_lossless_u16(&values).unwrap();
        assert!(encoded.len() < values.len() * 2);
        let decoded = codec.decode_lossless_u16(&encoded, values.len()).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_lossless_rejects_unpadded() {
        let mut codec = ChannelCodec::new();
        let err = codec.encode_lossless_u16(&vec![1u16; 100]).unwrap_err();
        assert!(matches!(err, CodecError::NotBlockPadded(100)));
    }

    #[test]
    fn test_lossless_constant_block() {
        // a constant block packs to its minimum width
        let mut codec = ChannelCodec::new();
        let values = vec![1000u16; 128];
        let encoded = codec.encode_lossless_u16(&values).unwrap();
        let decoded = codec.decode_lossless_u16(&encoded, 128).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_lossy_accepts_rgba_input() {
        let mut codec = ChannelCodec::new();
        let pixels: Vec<u8> = std::iter::repeat([200u8, 40, 40, 255])
            .take(16 * 16)
            .flatten()
            .collect();
        let jpeg = codec.encode_lossy_image(&pixels, 16, 16, 4, 90).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
        let px = decoded.get_pixel(8, 8);
        assert!(px[0] > 150 && px[1] < 120 && px[2] < 120);
    }

    #[test]
    fn test_lossy_rejects_bad_channel_count() {
        let mut codec = ChannelCodec::new();
        let err = codec
            .encode_lossy_image(&[0u8; 8], 2, 2, 2, 80)
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidChannelCount(2)));
    }

    #[test]
    fn test_cloud_pack_round_trip() {
        let cloud = vec![[-100i16, 50, 1200], [7, -2048, 900], [0, 0, 0]];
        // pixels 0 and 1 valid, pixel 2 not
        let depth_vertex = vec![(0u32, 0i32), (1, 1), (2, -1)];
        let packed = pack_cloud(&cloud, &depth_vertex, 2);
        assert_eq!(packed.len(), 3 * 128);
        assert_eq!(packed[0], (-100 + 4096) as u16);
        let unpacked = unpack_cloud(&packed, 2);
        assert_eq!(unpacked, vec![[-100, 50, 1200], [7, -2048, 900]]);
    }

    #[test]
    fn test_cloud_color_tiling() {
        assert_eq!(cloud_color_tiling(0), (0, 0));
        assert_eq!(cloud_color_tiling(1), (1, 128));
        assert_eq!(cloud_color_tiling(128), (1, 128));
        assert_eq!(cloud_color_tiling(129), (2, 128));
    }

    #[test]
    fn test_pack_cloud_colors_gathers_valid_pixels() {
        let mut color = vec![0u8; 3 * 4];
        color[4..8].copy_from_slice(&[10, 20, 30, 255]);
        let depth_vertex = vec![(0u32, -1i32), (1, 0), (2, -1)];
        let (tiled, w, h) = pack_cloud_colors(&color, &depth_vertex, 1);
        assert_eq!((w, h), (1, 128));
        assert_eq!(&tiled[0..4], &[10, 20, 30, 255]);
        assert_eq!(&tiled[4..8], &[0, 0, 0, 0]);
    }
}
