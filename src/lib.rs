// SPDX-License-Identifier: MPL-2.0

//! Real-time processing core for depth-camera capture pipelines
//!
//! Takes raw per-capture sensor buffers (depth, color, infrared, point
//! samples, IMU, audio) and turns them into filtered, display-ready and
//! compressed frames. Device I/O stays outside the crate behind the
//! [`capture::CaptureSource`] seam.
//!
//! # Architecture
//!
//! - [`capture`]: capture-mode description and raw device inputs
//! - [`pipelines`]: index tables, depth filtering, cloud/image generation
//!   and the capture orchestrator
//! - [`media`]: pixel conversion, channel codecs, output frames and the
//!   delayed emission queue
//! - [`config`]: settings structs consumed by the pipeline
//!
//! # Example
//!
//! ```no_run
//! use depthcap::capture::ModeInfo;
//! use depthcap::pipelines::{CaptureOrchestrator, SessionSettings};
//!
//! let mut orchestrator = CaptureOrchestrator::new(ModeInfo::default());
//! orchestrator.update_settings(SessionSettings::default());
//! orchestrator.set_display_callback(Box::new(|frame| {
//!     println!("capture {} with {} points", frame.capture_id, frame.cloud.vertices.len());
//! }));
//! ```

pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;

// Re-export commonly used types
pub use capture::{CaptureSource, ModeInfo, RawCapture};
pub use config::{DataSettings, FilterSettings};
pub use errors::{CaptureError, CaptureResult};
pub use media::{CompressedFrame, DisplayFrame};
pub use pipelines::{CaptureLoop, CaptureOrchestrator, SessionSettings};
