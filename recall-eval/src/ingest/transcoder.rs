//! External audio transcoding

use super::IngestError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Produces a normalized mono 16 kHz WAV from an uploaded container
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), IngestError>;
}

/// Runs `ffmpeg -y -i <in> -ar 16000 -ac 1 -f wav <out>`
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), IngestError> {
        let child = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-ar", "16000", "-ac", "1", "-f", "wav"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| IngestError::Transcode(format!("Failed to run {}: {}", self.program, e)))?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                IngestError::Transcode(format!("{} timed out after {:?}", self.program, self.timeout))
            })?
            .map_err(|e| IngestError::Transcode(format!("{} did not complete: {}", self.program, e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(IngestError::Transcode(format!(
                "{} exited with {}: {}",
                self.program, result.status, tail
            )));
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(IngestError::Transcode(format!(
                "{} produced no output at {}",
                self.program,
                output.display()
            )));
        }

        debug!(input = %input.display(), output = %output.display(), "Transcoded audio");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_non_zero_exit_is_transcode_error() {
        let dir = TempDir::new().unwrap();
        let transcoder = FfmpegTranscoder::new("false", Duration::from_secs(5));
        let err = transcoder
            .transcode(&dir.path().join("in.mp4"), &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Transcode(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_transcode_error() {
        let dir = TempDir::new().unwrap();
        let transcoder = FfmpegTranscoder::new("definitely-not-a-real-binary-5f3a", Duration::from_secs(5));
        let err = transcoder
            .transcode(&dir.path().join("in.mp4"), &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Transcode(msg) if msg.contains("Failed to run")));
    }

    #[tokio::test]
    async fn test_success_without_output_is_transcode_error() {
        // `true` accepts any arguments and writes nothing
        let dir = TempDir::new().unwrap();
        let transcoder = FfmpegTranscoder::new("true", Duration::from_secs(5));
        let err = transcoder
            .transcode(&dir.path().join("in.mp4"), &dir.path().join("out.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Transcode(msg) if msg.contains("no output")));
    }
}
