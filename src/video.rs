use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ThumbnailConfig;
use crate::error::{EchoLineError, Result};
use crate::media::{file_stem, MediaLayout};

/// Extracts a still preview frame from uploaded videos using FFmpeg
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    ffmpeg_path: String,
    seek_seconds: f64,
    timeout: Duration,
    enabled: bool,
}

impl ThumbnailGenerator {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            seek_seconds: config.seek_seconds,
            timeout: Duration::from_secs(config.timeout_seconds),
            enabled: config.enabled,
        }
    }

    /// A generator that never runs ffmpeg
    pub fn disabled() -> Self {
        Self {
            ffmpeg_path: String::new(),
            seek_seconds: 0.0,
            timeout: Duration::ZERO,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Preview file name for a video: `<stem>_thumb.jpg`
    pub fn thumbnail_name(video_file: &str) -> String {
        format!("{}_thumb.jpg", file_stem(video_file))
    }

    /// Generate the preview for a root-relative video URL.
    ///
    /// Returns the preview's root-relative URL, or `None` if the tool is
    /// disabled, missing, fails, or runs past the timeout.
    pub async fn generate(&self, layout: &MediaLayout, video_url: &str) -> Option<String> {
        if !self.enabled {
            debug!("Thumbnail generation disabled, skipping {}", video_url);
            return None;
        }

        let video_path = layout.resolve(video_url)?;
        let video_file = video_path.file_name()?.to_string_lossy().to_string();
        let thumb_name = Self::thumbnail_name(&video_file);
        let thumb_path = layout.videos_path().join(&thumb_name);

        match self.extract(&video_path, &thumb_path).await {
            Ok(()) => {
                info!("🖼️ Generated thumbnail {}", thumb_name);
                Some(layout.video_url(&thumb_name))
            }
            Err(e) => {
                warn!("No thumbnail for {}: {}", video_path.display(), e);
                None
            }
        }
    }

    async fn extract(&self, video_path: &Path, thumb_path: &Path) -> Result<()> {
        let seek = format!("{}", self.seek_seconds);

        let mut command = tokio::process::Command::new(&self.ffmpeg_path);
        command
            .arg("-y")
            .args(["-ss", &seek])
            .arg("-i")
            .arg(video_path)
            .args(["-vframes", "1"])
            .arg(thumb_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            EchoLineError::Thumbnail(format!("failed to launch {}: {}", self.ffmpeg_path, e))
        })?;

        let status = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?.status,
            Err(_) => {
                return Err(EchoLineError::Thumbnail(format!(
                    "timed out after {:?}",
                    self.timeout
                )))
            }
        };

        if !status.success() {
            return Err(EchoLineError::Thumbnail(format!("ffmpeg exited with {}", status)));
        }

        Ok(())
    }
}
