use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// A single decoded frame in RGB channel order, plus where it was taken.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub image: RgbImage,
    /// Position of the frame in seconds, always within `[0, duration]`.
    pub timestamp_secs: f64,
    /// Second originally asked for, before clamping.
    pub requested_secs: u32,
    /// Total media duration in seconds.
    pub duration_secs: f64,
}

impl Thumbnail {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the requested second was outside the media and got clamped.
    pub fn was_clamped(&self) -> bool {
        (self.timestamp_secs - self.requested_secs as f64).abs() > f64::EPSILON
    }

    /// Encode the frame as JPEG for display or download.
    pub fn to_jpeg_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(self.image.clone()).write_to(&mut buf, ImageFormat::Jpeg)?;
        Ok(buf.into_inner())
    }

    /// Save the frame; the format follows the file extension.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}
