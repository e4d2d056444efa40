//! Reelscope Processing Library
//!
//! Local, network-free stages of the pipeline: upload validation, parsing of
//! the analysis text and thumbnail extraction.

pub mod parser;
pub mod validator;
pub mod video;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use parser::ResultParser;
pub use validator::{ValidationError, VideoValidator};
pub use video::{
    ChannelOrder, DecodeError, FfmpegDecoder, FrameExtractor, MediaDecoder, MediaSource, RawFrame,
};
