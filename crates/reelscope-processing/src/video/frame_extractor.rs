use reelscope_core::{JobError, Thumbnail};
use std::path::Path;
use std::sync::Arc;

use super::decoder::{DecodeError, MediaDecoder};

/// Pulls a single still frame out of a local video.
#[derive(Clone)]
pub struct FrameExtractor {
    decoder: Arc<dyn MediaDecoder>,
}

/// Position to decode for `target_second`, given the media duration.
///
/// Targets past the end fall back to the middle of the media.
pub fn clamp_timestamp(target_second: u32, duration_secs: f64) -> f64 {
    let target = target_second as f64;
    if target > duration_secs {
        duration_secs / 2.0
    } else {
        target
    }
}

impl FrameExtractor {
    pub fn new(decoder: Arc<dyn MediaDecoder>) -> Self {
        Self { decoder }
    }

    /// Decode the frame nearest `target_second`.
    ///
    /// Every failure is reported as a decode failure; callers treat it as
    /// a missing thumbnail rather than a failed job.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn extract_frame(
        &self,
        path: &Path,
        target_second: u32,
    ) -> Result<Thumbnail, JobError> {
        self.extract(path, target_second).await.map_err(|e| {
            tracing::warn!(error = %e, target_second, "Frame extraction failed");
            JobError::from(e)
        })
    }

    async fn extract(&self, path: &Path, target_second: u32) -> Result<Thumbnail, DecodeError> {
        let mut source = self.decoder.open(path).await?;
        let duration_secs = source.duration_secs()?;
        let timestamp_secs = clamp_timestamp(target_second, duration_secs);

        if timestamp_secs != target_second as f64 {
            tracing::debug!(
                target_second,
                duration_secs,
                timestamp_secs,
                "Requested second is past the end, using midpoint"
            );
        }

        let mut position_ms = (timestamp_secs * 1000.0).round() as u64;
        source.seek_to_time(position_ms).await?;
        let mut frame = source.read_frame().await?;

        // Seeking exactly to the end leaves no frame to read; step back one.
        if frame.is_none() && position_ms > 0 {
            let frame_ms = (1000.0 / source.frame_rate()).ceil() as u64;
            position_ms = position_ms.saturating_sub(frame_ms);
            source.seek_to_time(position_ms).await?;
            frame = source.read_frame().await?;
        }

        let frame = frame.ok_or(DecodeError::EndOfStream(position_ms))?;
        let image = frame.into_rgb()?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            position_ms,
            "Frame extracted"
        );

        Ok(Thumbnail {
            image,
            timestamp_secs: position_ms as f64 / 1000.0,
            requested_secs: target_second,
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeDecoder, FakeMedia};
    use crate::video::ChannelOrder;
    use reelscope_core::ErrorKind;

    fn ten_second_clip() -> FakeMedia {
        FakeMedia::new(300, 30.0)
    }

    #[tokio::test]
    async fn test_target_past_end_clamps_to_midpoint() {
        let decoder = Arc::new(FakeDecoder::new(ten_second_clip()));
        let extractor = FrameExtractor::new(decoder.clone());

        let thumb = extractor
            .extract_frame(Path::new("clip.mp4"), 999)
            .await
            .unwrap();
        assert_eq!(thumb.timestamp_secs, 5.0);
        assert_eq!(thumb.requested_secs, 999);
        assert!(thumb.was_clamped());
        assert_eq!(decoder.seeks(), vec![5000]);
    }

    #[tokio::test]
    async fn test_target_within_bounds() {
        let decoder = Arc::new(FakeDecoder::new(ten_second_clip()));
        let extractor = FrameExtractor::new(decoder);

        let thumb = extractor
            .extract_frame(Path::new("clip.mp4"), 3)
            .await
            .unwrap();
        assert_eq!(thumb.timestamp_secs, 3.0);
        assert_eq!(thumb.duration_secs, 10.0);
        assert!(!thumb.was_clamped());
    }

    #[tokio::test]
    async fn test_target_at_end_steps_back_one_frame() {
        let decoder = Arc::new(FakeDecoder::new(ten_second_clip()));
        let extractor = FrameExtractor::new(decoder.clone());

        let thumb = extractor
            .extract_frame(Path::new("clip.mp4"), 10)
            .await
            .unwrap();
        assert!(thumb.timestamp_secs < 10.0);
        assert!(thumb.timestamp_secs >= 9.9);
        assert_eq!(decoder.seeks(), vec![10000, 9966]);
    }

    #[tokio::test]
    async fn test_bgr_frames_are_returned_as_rgb() {
        let media = ten_second_clip().with_pixel(ChannelOrder::Bgr, [0, 0, 255]);
        let extractor = FrameExtractor::new(Arc::new(FakeDecoder::new(media)));

        let thumb = extractor
            .extract_frame(Path::new("clip.mp4"), 1)
            .await
            .unwrap();
        assert_eq!(thumb.image.get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[tokio::test]
    async fn test_open_failure_is_decode_failure() {
        let extractor = FrameExtractor::new(Arc::new(FakeDecoder::failing()));

        let err = extractor
            .extract_frame(Path::new("corrupt.mp4"), 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DecodeFailure);
    }

    #[tokio::test]
    async fn test_zero_frame_rate_is_decode_failure() {
        let extractor = FrameExtractor::new(Arc::new(FakeDecoder::new(FakeMedia::new(300, 0.0))));

        let err = extractor
            .extract_frame(Path::new("clip.mp4"), 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DecodeFailure);
    }

    #[test]
    fn test_clamp_timestamp() {
        assert_eq!(clamp_timestamp(999, 10.0), 5.0);
        assert_eq!(clamp_timestamp(10, 10.0), 10.0);
        assert_eq!(clamp_timestamp(0, 10.0), 0.0);
    }
}
