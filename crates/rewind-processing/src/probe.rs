//! Media probe - turns ffprobe output into encoding candidates

use async_trait::async_trait;
use bytes::Bytes;
use rewind_core::{AppError, Encoding, EncodingCandidate, MediaDescriptor, MediaReference};
use serde::Deserialize;
use tokio::process::Command;

use crate::tools::validate_tool_path;
use crate::traits::MediaProbe;

/// Bytes per pixel per frame of a palette gif, measured on typical short clips.
const GIF_PIXEL_TO_SIZE: f64 = 0.3063;

#[derive(Debug, Deserialize)]
pub struct FFprobeOutput {
    #[serde(default)]
    pub streams: Vec<FFprobeStream>,
    pub format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
pub struct FFprobeStream {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub nb_read_frames: Option<String>,
    pub nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FFprobeFormat {
    pub format_name: Option<String>,
    pub duration: Option<String>,
}

impl FFprobeOutput {
    fn stream(&self, kind: &str) -> Option<&FFprobeStream> {
        self.streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    }
}

impl FFprobeStream {
    fn frame_count(&self) -> Option<u64> {
        [&self.nb_read_frames, &self.nb_frames]
            .into_iter()
            .flatten()
            .filter_map(|f| f.parse::<u64>().ok())
            .find(|f| *f > 0)
    }
}

/// Estimated size in bytes of `frames` frames at `width`x`height` encoded as gif.
pub fn estimate_gif_size(width: u32, height: u32, frames: u64) -> u64 {
    (width as f64 * height as f64 * frames as f64 * GIF_PIXEL_TO_SIZE).round() as u64
}

fn source_encoding(output: &FFprobeOutput, video: &FFprobeStream) -> Option<Encoding> {
    if video.codec_name.as_deref() == Some("gif") {
        return Some(Encoding::Gif);
    }
    let format_name = output.format.as_ref()?.format_name.as_deref()?;
    format_name
        .split(',')
        .find_map(|name| name.trim().parse::<Encoding>().ok())
}

/// Build the ordered candidate list for a probed artifact.
///
/// The source container always comes first. A video source gets a silent gif
/// fallback when its frame count is known; a gif source gets a silent mp4 fallback.
pub fn candidates_from_probe(output: &FFprobeOutput, data: &Bytes) -> Vec<EncodingCandidate> {
    let Some(video) = output.stream("video") else {
        return Vec::new();
    };
    let (Some(width), Some(height)) = (video.width, video.height) else {
        return Vec::new();
    };
    let Some(encoding) = source_encoding(output, video) else {
        return Vec::new();
    };

    let duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .unwrap_or(0.0)
        .max(0.0);
    let frames = video.frame_count();
    let has_audio = encoding.is_video() && output.stream("audio").is_some();

    let source = EncodingCandidate {
        encoding,
        duration,
        width,
        height,
        frames,
        size_bytes: data.len() as u64,
        has_audio,
        data: data.clone(),
    };

    let fallback = match encoding {
        Encoding::Gif => Some(EncodingCandidate {
            encoding: Encoding::Mp4,
            has_audio: false,
            ..source.clone()
        }),
        Encoding::Mp4 | Encoding::Webm => frames.map(|frames| EncodingCandidate {
            encoding: Encoding::Gif,
            size_bytes: estimate_gif_size(width, height, frames),
            has_audio: false,
            ..source.clone()
        }),
    };

    std::iter::once(source).chain(fallback).collect()
}

pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: String) -> anyhow::Result<Self> {
        validate_tool_path(&ffprobe_path)?;
        Ok(Self { ffprobe_path })
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    #[tracing::instrument(skip(self, data), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        media.host = %reference.host,
        media.id = %reference.id,
        media.bytes = data.len()
    ))]
    async fn probe(
        &self,
        reference: &MediaReference,
        data: Bytes,
    ) -> Result<MediaDescriptor, AppError> {
        let start = std::time::Instant::now();

        // Containers like mp4 need seekable input, so ffprobe reads from a file.
        let temp_file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(temp_file.path(), &data).await?;

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-count_frames",
            ])
            .arg(temp_file.path())
            .output()
            .await
            .map_err(|e| AppError::Probe(format!("Failed to execute ffprobe: {}", e)))?;

        let candidates = if output.status.success() {
            match serde_json::from_slice::<FFprobeOutput>(&output.stdout) {
                Ok(parsed) => candidates_from_probe(&parsed, &data),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable ffprobe output");
                    Vec::new()
                }
            }
        } else {
            tracing::warn!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "ffprobe rejected media"
            );
            Vec::new()
        };

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            candidates = candidates.len(),
            "Media probe completed"
        );

        Ok(MediaDescriptor {
            reference: reference.clone(),
            candidates,
        })
    }
}
