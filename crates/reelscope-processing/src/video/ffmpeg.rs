//! ffmpeg/ffprobe backed decoder.
//!
//! Stream info comes from one ffprobe call at open time. Each `read_frame`
//! spawns ffmpeg with an input seek and asks for a single rawvideo frame in
//! `rgb24`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::decoder::{ChannelOrder, DecodeError, MediaDecoder, MediaSource, RawFrame};

fn validate_executable(path: &str) -> Result<(), DecodeError> {
    let safe = !path.is_empty()
        && path.chars().all(|c| {
            c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\'
        });
    if !safe {
        return Err(DecodeError::Open(format!(
            "unsafe executable path: {}",
            path
        )));
    }
    Ok(())
}

/// Parse an ffprobe rational such as `30000/1001`.
fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

/// Older ffprobe builds report rotation as a `rotate` tag instead of side data.
#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees, normalized to `0..360`.
    fn rotation(&self) -> i64 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct StreamInfo {
    width: u32,
    height: u32,
    frame_count: u64,
    frame_rate: f64,
}

impl ProbeOutput {
    fn into_stream_info(self) -> Result<StreamInfo, DecodeError> {
        let stream = self
            .streams
            .into_iter()
            .next()
            .ok_or(DecodeError::NoVideoStream)?;

        let width = stream
            .width
            .ok_or_else(|| DecodeError::InvalidStream("missing width".to_string()))?;
        let height = stream
            .height
            .ok_or_else(|| DecodeError::InvalidStream("missing height".to_string()))?;

        // ffmpeg applies the display matrix when decoding, so a quarter turn
        // swaps the dimensions of the frames it writes.
        let (width, height) = match stream.rotation() {
            90 | 270 => (height, width),
            _ => (width, height),
        };

        let frame_rate = stream
            .r_frame_rate
            .as_deref()
            .and_then(parse_rational)
            .filter(|fps| *fps > 0.0)
            .or_else(|| {
                stream
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_rational)
                    .filter(|fps| *fps > 0.0)
            })
            .ok_or_else(|| DecodeError::InvalidStream("missing frame rate".to_string()))?;

        // Containers like MKV do not store nb_frames; derive it from duration.
        let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
            Some(n) if n > 0 => n,
            _ => {
                let duration = stream
                    .duration
                    .as_deref()
                    .or(self.format.as_ref().and_then(|f| f.duration.as_deref()))
                    .and_then(|d| d.parse::<f64>().ok())
                    .ok_or_else(|| DecodeError::InvalidStream("missing duration".to_string()))?;
                (duration * frame_rate).round() as u64
            }
        };

        Ok(StreamInfo {
            width,
            height,
            frame_count,
            frame_rate,
        })
    }
}

/// Decoder that shells out to the ffmpeg CLI tools.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegDecoder {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Result<Self, DecodeError> {
        let ffmpeg_path = ffmpeg_path.into();
        let ffprobe_path = ffprobe_path.into();
        validate_executable(&ffmpeg_path)?;
        validate_executable(&ffprobe_path)?;
        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }

    #[tracing::instrument(skip(self), fields(process.executable.name = "ffprobe"))]
    async fn probe(&self, path: &Path) -> Result<StreamInfo, DecodeError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DecodeError::Open(format!("failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(DecodeError::Open(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| DecodeError::Open(format!("failed to parse ffprobe output: {}", e)))?;
        let info = probe.into_stream_info()?;

        tracing::debug!(
            width = info.width,
            height = info.height,
            frame_count = info.frame_count,
            frame_rate = info.frame_rate,
            "Video probe completed"
        );
        Ok(info)
    }
}

#[async_trait]
impl MediaDecoder for FfmpegDecoder {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaSource>, DecodeError> {
        if !tokio::fs::try_exists(path).await? {
            return Err(DecodeError::Open(format!(
                "file not found: {}",
                path.display()
            )));
        }
        let info = self.probe(path).await?;
        Ok(Box::new(FfmpegSource {
            ffmpeg_path: self.ffmpeg_path.clone(),
            path: path.to_path_buf(),
            info,
            position_ms: 0,
        }))
    }
}

struct FfmpegSource {
    ffmpeg_path: String,
    path: PathBuf,
    info: StreamInfo,
    position_ms: u64,
}

#[async_trait]
impl MediaSource for FfmpegSource {
    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn frame_rate(&self) -> f64 {
        self.info.frame_rate
    }

    async fn seek_to_time(&mut self, ms: u64) -> Result<(), DecodeError> {
        let duration_ms = (self.duration_secs()? * 1000.0) as u64;
        if ms > duration_ms {
            return Err(DecodeError::Seek(format!(
                "{} ms is past the end ({} ms)",
                ms, duration_ms
            )));
        }
        self.position_ms = ms;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(process.executable.name = "ffmpeg"))]
    async fn read_frame(&mut self) -> Result<Option<RawFrame>, DecodeError> {
        let seek = format!("{:.3}", self.position_ms as f64 / 1000.0);
        let output = Command::new(&self.ffmpeg_path)
            .args(["-v", "error", "-ss", &seek, "-i"])
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DecodeError::Read(format!("failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(DecodeError::Read(format!(
                "ffmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if output.stdout.is_empty() {
            return Ok(None);
        }

        Ok(Some(RawFrame {
            width: self.info.width,
            height: self.info.height,
            order: ChannelOrder::Rgb,
            data: output.stdout,
        }))
    }
}
