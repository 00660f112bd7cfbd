//! ffmpeg-backed reversal

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use rewind_core::{AppError, Encoding, EncodingCandidate};
use tokio::process::Command;

use crate::tools::validate_tool_path;
use crate::traits::MediaTransform;

const GIF_FILTER: &str = "reverse,split[a][b];[a]palettegen[p];[b][p]paletteuse";

/// ffmpeg arguments that reverse `input` into `output` with the given encoding.
pub fn reverse_args(input: &Path, output: &Path, encoding: Encoding, has_audio: bool) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().to_string(),
    ];

    match encoding {
        Encoding::Gif => {
            args.extend(["-vf".into(), GIF_FILTER.into(), "-an".into()]);
        }
        Encoding::Mp4 => {
            args.extend([
                "-vf".into(),
                "reverse".into(),
                "-c:v".into(),
                "libx264".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-movflags".into(),
                "+faststart".into(),
            ]);
            if has_audio {
                args.extend(["-af".into(), "areverse".into(), "-c:a".into(), "aac".into()]);
            } else {
                args.push("-an".into());
            }
        }
        Encoding::Webm => {
            args.extend([
                "-vf".into(),
                "reverse".into(),
                "-c:v".into(),
                "libvpx-vp9".into(),
            ]);
            if has_audio {
                args.extend(["-af".into(), "areverse".into(), "-c:a".into(), "libopus".into()]);
            } else {
                args.push("-an".into());
            }
        }
    }

    args.push(output.to_string_lossy().to_string());
    args
}

pub struct FfmpegReverser {
    ffmpeg_path: String,
}

impl FfmpegReverser {
    pub fn new(ffmpeg_path: String) -> anyhow::Result<Self> {
        validate_tool_path(&ffmpeg_path)?;
        Ok(Self { ffmpeg_path })
    }
}

#[async_trait]
impl MediaTransform for FfmpegReverser {
    #[tracing::instrument(skip(self, candidate), fields(
        process.executable.name = "ffmpeg",
        ffmpeg.operation = "reverse",
        media.encoding = %candidate.encoding,
        media.bytes = candidate.data.len()
    ))]
    async fn reverse(&self, candidate: &EncodingCandidate) -> Result<Bytes, AppError> {
        if candidate.data.is_empty() {
            return Err(AppError::Transform("No source data to reverse".to_string()));
        }

        let start = std::time::Instant::now();
        let work_dir = tempfile::tempdir()?;
        let input = work_dir.path().join("source");
        let output = work_dir
            .path()
            .join(format!("reversed.{}", candidate.encoding.extension()));
        tokio::fs::write(&input, &candidate.data).await?;

        let args = reverse_args(&input, &output, candidate.encoding, candidate.has_audio);
        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AppError::Transform(format!("Failed to execute ffmpeg: {}", e)))?;

        if !result.status.success() {
            return Err(AppError::Transform(format!(
                "FFmpeg failed: {}",
                String::from_utf8_lossy(&result.stderr)
            )));
        }

        let reversed = tokio::fs::read(&output).await?;
        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            output_bytes = reversed.len(),
            "Reversal completed"
        );
        Ok(Bytes::from(reversed))
    }
}
