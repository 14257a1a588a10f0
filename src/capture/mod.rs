// SPDX-License-Identifier: MPL-2.0

//! Capture-mode description and raw device inputs

pub mod mode;
pub mod types;

pub use mode::{ColorLayout, ColorResolution, DepthMode, ModeInfo};
pub use types::{AudioFrame, Body, CaptureSource, ImuSample, RawCapture};
