//! Video frame extraction
//!
//! The decoder seam in [`decoder`] keeps the extractor independent of how
//! frames are actually produced; [`ffmpeg`] is the production backend.

pub mod decoder;
pub mod ffmpeg;
pub mod frame_extractor;

pub use decoder::{ChannelOrder, DecodeError, MediaDecoder, MediaSource, RawFrame};
pub use ffmpeg::FfmpegDecoder;
pub use frame_extractor::{clamp_timestamp, FrameExtractor};
