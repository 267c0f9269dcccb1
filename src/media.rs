//! On-disk layout of the served media tree.
//!
//! Catalog records store paths relative to the site root (`videos/...`,
//! `subtitles/...`); this module maps them to files and back.

use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;

/// Which transcript track a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Primary,
    Secondary,
}

impl TrackKind {
    /// Language tag used in stored file names
    pub fn file_tag(self) -> &'static str {
        match self {
            Self::Primary => "en",
            Self::Secondary => "zh",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaLayout {
    root: PathBuf,
    videos_dir: String,
    subtitles_dir: String,
}

impl MediaLayout {
    pub fn new(root: impl Into<PathBuf>, videos_dir: &str, subtitles_dir: &str) -> Self {
        Self {
            root: root.into(),
            videos_dir: videos_dir.trim_matches('/').to_string(),
            subtitles_dir: subtitles_dir.trim_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.server.root_dir.clone(),
            &config.media.videos_dir,
            &config.media.subtitles_dir,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn videos_path(&self) -> PathBuf {
        self.root.join(&self.videos_dir)
    }

    pub fn subtitles_path(&self) -> PathBuf {
        self.root.join(&self.subtitles_dir)
    }

    /// Create the media directories if they are missing
    pub async fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.videos_path()).await?;
        fs::create_dir_all(self.subtitles_path()).await?;
        Ok(())
    }

    /// Root-relative URL of a file in the videos directory
    pub fn video_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.videos_dir, file_name)
    }

    /// Root-relative URL of a stored transcript
    pub fn subtitle_url(&self, prefix: &str, track: TrackKind) -> String {
        format!("{}/{}", self.subtitles_dir, subtitle_file_name(prefix, track))
    }

    /// File path for a root-relative URL; `None` if it would escape the root
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !safe || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Write an uploaded video as `<prefix><ext>`; returns its URL
    pub async fn store_video(&self, prefix: &str, ext: &str, bytes: &[u8]) -> Result<String> {
        let file_name = format!("{prefix}{ext}");
        fs::write(self.videos_path().join(&file_name), bytes).await?;
        debug!("Stored video {} ({} bytes)", file_name, bytes.len());
        Ok(self.video_url(&file_name))
    }

    /// Write a transcript for `prefix`; returns its URL
    pub async fn store_subtitle(&self, prefix: &str, track: TrackKind, text: &str) -> Result<String> {
        let path = self.subtitles_path().join(subtitle_file_name(prefix, track));
        fs::write(&path, text).await?;
        debug!("Stored transcript {}", path.display());
        Ok(self.subtitle_url(prefix, track))
    }

    /// Delete a referenced asset; missing files and failures are only logged
    pub async fn remove_asset(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!("Refusing to delete asset outside root: {}", relative);
            return;
        };

        match fs::remove_file(&path).await {
            Ok(()) => debug!("🗑️ Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    /// Path of an existing video referenced by bare file name
    pub async fn existing_video(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.videos_path().join(file_name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}

fn subtitle_file_name(prefix: &str, track: TrackKind) -> String {
    format!("{}.{}.srt", prefix, track.file_tag())
}

/// File name component of a client-supplied name, with `..` removed
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = base.replace("..", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Extension including the dot, defaulting to `.mp4`
pub fn extension_or_default(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| ".mp4".to_string())
}

/// File name without its extension
pub fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string())
}
