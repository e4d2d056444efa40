//! Media decoding seam.
//!
//! [`MediaDecoder`] opens a file and hands back a [`MediaSource`], a cursor
//! over the first video stream. Dropping the source releases it.

use async_trait::async_trait;
use image::RgbImage;
use reelscope_core::JobError;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Failed to open media: {0}")]
    Open(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Invalid stream info: {0}")]
    InvalidStream(String),

    #[error("Seek failed: {0}")]
    Seek(String),

    #[error("Frame read failed: {0}")]
    Read(String),

    #[error("Frame buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("No frame at {0} ms")]
    EndOfStream(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DecodeError> for JobError {
    fn from(err: DecodeError) -> Self {
        JobError::decode_failure(err.to_string())
    }
}

/// Byte layout of a decoded frame as produced by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl ChannelOrder {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ChannelOrder::Rgb | ChannelOrder::Bgr => 3,
            ChannelOrder::Rgba | ChannelOrder::Bgra => 4,
        }
    }
}

/// A packed, row-major frame in the codec's native channel order.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Reorder channels into RGB, dropping alpha.
    pub fn into_rgb(self) -> Result<RgbImage, DecodeError> {
        let bpp = self.order.bytes_per_pixel();
        let expected = self.width as usize * self.height as usize * bpp;
        if self.data.len() != expected {
            return Err(DecodeError::BufferSize {
                expected,
                actual: self.data.len(),
            });
        }

        let rgb = match self.order {
            ChannelOrder::Rgb => self.data,
            ChannelOrder::Bgr | ChannelOrder::Rgba | ChannelOrder::Bgra => {
                let swap = matches!(self.order, ChannelOrder::Bgr | ChannelOrder::Bgra);
                let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
                for px in self.data.chunks_exact(bpp) {
                    if swap {
                        out.extend_from_slice(&[px[2], px[1], px[0]]);
                    } else {
                        out.extend_from_slice(&px[..3]);
                    }
                }
                out
            }
        };

        RgbImage::from_raw(self.width, self.height, rgb).ok_or(DecodeError::BufferSize {
            expected,
            actual: 0,
        })
    }
}

#[async_trait]
pub trait MediaDecoder: Send + Sync {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, DecodeError>;
}

#[async_trait]
pub trait MediaSource: Send {
    fn frame_count(&self) -> u64;

    fn frame_rate(&self) -> f64;

    /// Position the cursor at `ms` milliseconds from the start.
    async fn seek_to_time(&mut self, ms: u64) -> Result<(), DecodeError>;

    /// Decode the frame at the cursor; `None` past the end of the stream.
    async fn read_frame(&mut self) -> Result<Option<RawFrame>, DecodeError>;

    fn duration_secs(&self) -> Result<f64, DecodeError> {
        let fps = self.frame_rate();
        if !fps.is_finite() || fps <= 0.0 {
            return Err(DecodeError::InvalidStream(format!("frame rate {}", fps)));
        }
        if self.frame_count() == 0 {
            return Err(DecodeError::InvalidStream("zero frames".to_string()));
        }
        Ok(self.frame_count() as f64 / fps)
    }
}
