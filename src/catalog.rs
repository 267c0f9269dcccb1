//! Episode catalog: the record model, ordering and deep links shared by the
//! player, plus the flat-file store the management server edits.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::subtitles::srt::parse_leading_int;
use crate::subtitles::DisplayMode;

/// Transcript locations for one episode.
///
/// `en`/`zh` are accepted as older names for the two tracks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubtitleTracks {
    #[serde(default, alias = "en", skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, alias = "zh", skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl SubtitleTracks {
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }
}

/// One catalog record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<SubtitleTracks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_mode: Option<DisplayMode>,
}

impl Episode {
    /// Title shown in the list, falling back to the position
    pub fn display_title(&self, index: usize) -> String {
        if self.title.trim().is_empty() {
            default_title(index)
        } else {
            self.title.clone()
        }
    }

    pub fn primary_track(&self) -> Option<&str> {
        self.subtitles.as_ref().and_then(|s| s.primary.as_deref())
    }

    pub fn secondary_track(&self) -> Option<&str> {
        self.subtitles.as_ref().and_then(|s| s.secondary.as_deref())
    }

    /// Every media path the record references
    pub fn asset_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        if !self.video_url.is_empty() {
            paths.push(self.video_url.as_str());
        }
        paths.extend(self.thumb_url.as_deref());
        paths.extend(self.primary_track());
        paths.extend(self.secondary_track());
        paths
    }
}

pub fn default_title(index: usize) -> String {
    format!("Episode {}", index + 1)
}

/// Sort key: the integer a title starts with, if any
pub fn title_number(title: &str) -> Option<i64> {
    parse_leading_int(title)
}

/// Order by leading title number; unnumbered titles go last in their
/// original relative order.
pub fn sort_episodes(episodes: &mut [Episode]) {
    episodes.sort_by_key(|episode| match title_number(&episode.title) {
        Some(number) => (false, number),
        None => (true, 0),
    });
}

/// URL fragment that opens the episode at `index`
pub fn deep_link(index: usize) -> String {
    format!("#play-{index}")
}

/// Episode index addressed by a `#play-<n>` fragment
pub fn parse_deep_link(fragment: &str) -> Option<usize> {
    let start = fragment.find("#play-")? + "#play-".len();
    let digits: String = fragment[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Flat JSON file holding the catalog, serialized by one writer at a time
#[derive(Debug, Clone)]
pub struct CatalogStore {
    catalog_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CatalogStore {
    /// Open the store, creating its directory if needed
    pub async fn open(catalog_path: impl Into<PathBuf>) -> Result<Self> {
        let catalog_path = catalog_path.into();
        if let Some(parent) = catalog_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        debug!("📁 Catalog store at {}", catalog_path.display());
        Ok(Self {
            catalog_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.catalog_path
    }

    /// Current records; a missing or unreadable file is an empty catalog
    pub async fn load(&self) -> Vec<Episode> {
        let content = match fs::read_to_string(&self.catalog_path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No catalog at {}: {}", self.catalog_path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(episodes) => episodes,
            Err(e) => {
                warn!("Failed to parse catalog {}: {}", self.catalog_path.display(), e);
                Vec::new()
            }
        }
    }

    /// Sibling file a commit is staged in before it replaces the catalog
    fn staging_path(&self) -> PathBuf {
        let mut file_name = self
            .catalog_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        file_name.push(".tmp");
        self.catalog_path.with_file_name(file_name)
    }

    async fn save(&self, episodes: &[Episode]) -> Result<()> {
        let json_content = serde_json::to_string_pretty(episodes)?;

        // Readers see either the old file or the new one, never a partial write
        let staging_path = self.staging_path();
        fs::write(&staging_path, json_content).await?;
        fs::rename(&staging_path, &self.catalog_path).await?;
        info!("💾 Catalog saved with {} episodes", episodes.len());
        Ok(())
    }

    /// Load the catalog under the write lock; changes persist on commit
    pub async fn begin(&self) -> CatalogTransaction<'_> {
        let guard = self.write_lock.lock().await;
        let episodes = self.load().await;
        CatalogTransaction {
            _guard: guard,
            store: self,
            episodes,
        }
    }
}

/// Exclusive read-modify-write session over the catalog
pub struct CatalogTransaction<'a> {
    _guard: MutexGuard<'a, ()>,
    store: &'a CatalogStore,
    pub episodes: Vec<Episode>,
}

impl CatalogTransaction<'_> {
    pub async fn commit(self) -> Result<()> {
        self.store.save(&self.episodes).await
    }
}
