// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture processing core
//!
//! Every foreseeable failure inside a capture cycle degrades to "channel
//! absent" rather than crossing the pipeline boundary; these types cover the
//! places where an error is still worth reporting to the caller.

use std::fmt;

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Top-level error for a capture cycle
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Device read failed or timed out; the whole cycle is invalid
    DeviceRead(String),
    /// Raw buffer sizes do not match the active mode
    BufferMismatch(ConvertError),
    /// Capture loop is already running / not running
    InvalidState(String),
}

/// Color conversion errors
#[derive(Debug, Clone)]
pub enum ConvertError {
    /// Buffer length does not match the expected layout dimensions
    SizeMismatch { expected: usize, got: usize },
    /// Compressed color payload failed to decode
    DecodeFailed(String),
}

/// Channel encoding errors (logged, channel treated as absent)
#[derive(Debug, Clone)]
pub enum CodecError {
    /// Lossy encoder accepts only 3- or 4-channel images
    InvalidChannelCount(u8),
    /// Lossless input length must be a multiple of the codec block length
    NotBlockPadded(usize),
    /// Underlying encoder reported a failure
    EncoderFailed(String),
    /// Compressed payload failed to decode
    DecoderFailed(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceRead(msg) => write!(f, "Device read failed: {}", msg),
            CaptureError::BufferMismatch(e) => write!(f, "Raw buffer mismatch: {}", e),
            CaptureError::InvalidState(msg) => write!(f, "Invalid capture state: {}", msg),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::SizeMismatch { expected, got } => {
                write!(f, "Size mismatch: expected {} bytes, got {}", expected, got)
            }
            ConvertError::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidChannelCount(c) => {
                write!(f, "Invalid channel count {} (expected 3 or 4)", c)
            }
            CodecError::NotBlockPadded(len) => {
                write!(f, "Input length {} is not a multiple of 128", len)
            }
            CodecError::EncoderFailed(msg) => write!(f, "Encoder failed: {}", msg),
            CodecError::DecoderFailed(msg) => write!(f, "Decoder failed: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}
impl std::error::Error for ConvertError {}
impl std::error::Error for CodecError {}

impl From<ConvertError> for CaptureError {
    fn from(err: ConvertError) -> Self {
        CaptureError::BufferMismatch(err)
    }
}
