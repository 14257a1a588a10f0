// SPDX-License-Identifier: MPL-2.0

//! Pixel conversion, channel encoding and output frame plumbing

pub mod codec;
pub mod convert;
pub mod delay;
pub mod frame;

pub use codec::ChannelCodec;
pub use delay::DelayedFrameQueue;
pub use frame::{ColoredCloud, CompressedFrame, DisplayFrame, EncodedChannel};
