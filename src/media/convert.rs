// SPDX-License-Identifier: MPL-2.0

//! Pixel format conversion from device color layouts to RGBA8
//!
//! Every supported [`ColorLayout`] converts to the same interleaved RGBA8
//! buffer so the rest of the pipeline never sees a device layout. YUV paths
//! use BT.601 coefficients.

use image::ImageReader;
use std::io::Cursor;

use crate::capture::ColorLayout;
use crate::errors::ConvertError;

#[inline]
fn yuv_to_rgba(y: f32, u: f32, v: f32) -> [u8; 4] {
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    [r, g, b, 255]
}

/// Convert NV12 (planar luma then interleaved 2x2-subsampled chroma) to RGBA
pub fn nv12_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut Vec<u8>,
) -> Result<(), ConvertError> {
    let w = width as usize;
    let h = height as usize;
    let expected = w * h + (w * h) / 2;
    if data.len() < expected {
        return Err(ConvertError::SizeMismatch {
            expected,
            got: data.len(),
        });
    }

    let (luma, chroma) = data.split_at(w * h);
    out.clear();
    out.reserve(w * h * 4);

    for row in 0..h {
        for col in 0..w {
            let y = luma[row * w + col] as f32;
            let c = ((row / 2) * (w / 2) + col / 2) * 2;
            let u = chroma[c] as f32 - 128.0;
            let v = chroma[c + 1] as f32 - 128.0;
            out.extend_from_slice(&yuv_to_rgba(y, u, v));
        }
    }

    Ok(())
}

/// Convert YUY2 (packed 4:2:2, Y0 U Y1 V per 2 pixels) to RGBA
pub fn yuy2_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut Vec<u8>,
) -> Result<(), ConvertError> {
    let pixel_count = (width * height) as usize;
    let expected = pixel_count * 2;
    if data.len() < expected {
        return Err(ConvertError::SizeMismatch {
            expected,
            got: data.len(),
        });
    }

    out.clear();
    out.reserve(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            out.extend_from_slice(&yuv_to_rgba(y, u, v));
            if out.len() >= pixel_count * 4 {
                break;
            }
        }
    }

    Ok(())
}

/// Decode an MJPG payload and expand it to RGBA
pub fn mjpg_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut Vec<u8>,
) -> Result<(), ConvertError> {
    let decoded = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ConvertError::DecodeFailed(e.to_string()))?
        .decode()
        .map_err(|e| ConvertError::DecodeFailed(e.to_string()))?;

    if decoded.width() != width || decoded.height() != height {
        return Err(ConvertError::SizeMismatch {
            expected: (width * height) as usize,
            got: (decoded.width() * decoded.height()) as usize,
        });
    }

    out.clear();
    out.extend_from_slice(decoded.to_rgba8().as_raw());
    Ok(())
}

/// Swizzle packed BGRA to RGBA
pub fn bgra_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut Vec<u8>,
) -> Result<(), ConvertError> {
    let pixel_count = (width * height) as usize;
    let expected = pixel_count * 4;
    if data.len() < expected {
        return Err(ConvertError::SizeMismatch {
            expected,
            got: data.len(),
        });
    }

    out.clear();
    out.reserve(expected);
    for px in data[..expected].chunks_exact(4) {
        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }

    Ok(())
}

/// Convert a raw color buffer in `layout` to RGBA8
pub fn color_to_rgba(
    layout: ColorLayout,
    data: &[u8],
    width: u32,
    height: u32,
    out: &mut Vec<u8>,
) -> Result<(), ConvertError> {
    match layout {
        ColorLayout::PlanarLumaChroma => nv12_to_rgba(data, width, height, out),
        ColorLayout::Packed422 => yuy2_to_rgba(data, width, height, out),
        ColorLayout::Compressed => mjpg_to_rgba(data, width, height, out),
        ColorLayout::Packed32 => bgra_to_rgba(data, width, height, out),
    }
}

/// Convert RGB (0-1) to HSV (H in degrees 0-360, S/V 0-1)
pub fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let s = if max == 0.0 { 0.0 } else { delta / max };

    [h, s, max]
}
