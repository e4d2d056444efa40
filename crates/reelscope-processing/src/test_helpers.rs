//! In-memory decoder for tests that should not depend on ffmpeg.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::video::{ChannelOrder, DecodeError, MediaDecoder, MediaSource, RawFrame};

/// Description of the media a [`FakeDecoder`] pretends to open.
#[derive(Debug, Clone)]
pub struct FakeMedia {
    pub frame_count: u64,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
    pub pixel: [u8; 3],
}

impl FakeMedia {
    pub fn new(frame_count: u64, frame_rate: f64) -> Self {
        Self {
            frame_count,
            frame_rate,
            width: 4,
            height: 4,
            order: ChannelOrder::Rgb,
            pixel: [0, 128, 255],
        }
    }

    /// Fill frames with `pixel`, laid out in `order`.
    pub fn with_pixel(mut self, order: ChannelOrder, pixel: [u8; 3]) -> Self {
        self.order = order;
        self.pixel = pixel;
        self
    }

    fn frame(&self) -> RawFrame {
        let bpp = self.order.bytes_per_pixel();
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * bpp);
        for _ in 0..(self.width * self.height) {
            data.extend_from_slice(&self.pixel);
            if bpp == 4 {
                data.push(255);
            }
        }
        RawFrame {
            width: self.width,
            height: self.height,
            order: self.order,
            data,
        }
    }
}

/// Decoder returning solid-colour frames; `None` when it should fail to open.
#[derive(Debug, Clone)]
pub struct FakeDecoder {
    media: Option<FakeMedia>,
    seeks: Arc<Mutex<Vec<u64>>>,
}

impl FakeDecoder {
    pub fn new(media: FakeMedia) -> Self {
        Self {
            media: Some(media),
            seeks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            media: None,
            seeks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every seek position requested so far, in milliseconds.
    pub fn seeks(&self) -> Vec<u64> {
        self.seeks.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaDecoder for FakeDecoder {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, DecodeError> {
        let media = self.media.clone().ok_or_else(|| {
            DecodeError::Open(format!("unsupported container: {}", path.display()))
        })?;
        Ok(Box::new(FakeSource {
            media,
            position_ms: 0,
            seeks: self.seeks.clone(),
        }))
    }
}

struct FakeSource {
    media: FakeMedia,
    position_ms: u64,
    seeks: Arc<Mutex<Vec<u64>>>,
}

impl FakeSource {
    fn duration_ms(&self) -> u64 {
        (self.media.frame_count as f64 / self.media.frame_rate * 1000.0) as u64
    }
}

#[async_trait]
impl MediaSource for FakeSource {
    fn frame_count(&self) -> u64 {
        self.media.frame_count
    }

    fn frame_rate(&self) -> f64 {
        self.media.frame_rate
    }

    async fn seek_to_time(&mut self, ms: u64) -> Result<(), DecodeError> {
        self.seeks.lock().unwrap().push(ms);
        if ms > self.duration_ms() {
            return Err(DecodeError::Seek(format!("{} ms is past the end", ms)));
        }
        self.position_ms = ms;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<RawFrame>, DecodeError> {
        if self.position_ms >= self.duration_ms() {
            return Ok(None);
        }
        Ok(Some(self.media.frame()))
    }
}
