// SPDX-License-Identifier: MPL-2.0

//! Per-capture processing stages, from raw buffers to output frames

pub mod cloud;
pub mod cluster;
pub mod filters;
pub mod orchestrator;
pub mod tables;
pub mod working;

pub use cloud::CloudAndImageBuilder;
pub use filters::DepthFilterPipeline;
pub use orchestrator::{CaptureLoop, CaptureOrchestrator, SessionSettings};
pub use tables::{Connectivity, IndexTables};
pub use working::FrameWorkingSet;
