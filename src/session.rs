//! Loading an episode into a playback session: fetch the catalog and the
//! transcript tracks, merge them, and hand the result to one controller.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::catalog::{sort_episodes, Episode};
use crate::config::Config;
use crate::subtitles::{
    merge_tracks_with_tolerance, parse_srt, render_transcript, secondary_only, to_srt, Cue,
    DisplayMode, MergedCue, TranscriptLine, MERGE_TOLERANCE_SECONDS,
};
use crate::sync::{SyncController, SyncSettings};

/// Source of catalog and transcript text, addressed by root-relative path
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_text(&self, location: &str) -> Result<String>;
}

/// Fetches resources from a running EchoLine server
pub struct HttpFetcher {
    base: Url,
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(base: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { base, client })
    }

    /// Absolute URL for `location`, with a cache-busting `t` parameter
    pub fn resolve(&self, location: &str) -> Result<Url> {
        let mut url = self
            .base
            .join(location)
            .with_context(|| format!("Invalid resource location `{}`", location))?;
        url.query_pairs_mut()
            .append_pair("t", &chrono::Utc::now().timestamp_millis().to_string());
        Ok(url)
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        let url = self.resolve(location)?;
        debug!("Fetching {}", url);

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("GET {} returned {}", url, response.status()));
        }

        Ok(response.text().await?)
    }
}

/// Reads resources from a local site root
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ResourceFetcher for FsFetcher {
    async fn fetch_text(&self, location: &str) -> Result<String> {
        let path = self.root.join(location.trim_start_matches('/'));
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Catalog from `location`, sorted for display; empty if it cannot be loaded
pub async fn fetch_catalog(fetcher: &dyn ResourceFetcher, location: &str) -> Vec<Episode> {
    let mut episodes = match fetcher.fetch_text(location).await {
        Ok(text) => match serde_json::from_str::<Vec<Episode>>(&text) {
            Ok(episodes) => episodes,
            Err(e) => {
                warn!("Catalog at {} is not valid JSON: {}", location, e);
                Vec::new()
            }
        },
        Err(e) => {
            warn!("Failed to load catalog {}: {:#}", location, e);
            Vec::new()
        }
    };

    sort_episodes(&mut episodes);
    episodes
}

/// Parsed cues for one track; any failure yields an empty track
pub async fn load_track(fetcher: &dyn ResourceFetcher, location: &str) -> Vec<Cue> {
    match fetcher.fetch_text(location).await {
        Ok(text) => parse_srt(&text),
        Err(e) => {
            warn!("Failed to load transcript {}: {:#}", location, e);
            Vec::new()
        }
    }
}

/// Fetch whichever tracks the episode has and merge them.
///
/// Both fetches run concurrently; the merged list is only produced once
/// both have finished.
pub async fn load_episode_cues(
    fetcher: &dyn ResourceFetcher,
    episode: &Episode,
    tolerance: f64,
) -> Vec<MergedCue> {
    match (episode.primary_track(), episode.secondary_track()) {
        (Some(primary), Some(secondary)) => {
            let (primary, secondary) = futures::join!(
                load_track(fetcher, primary),
                load_track(fetcher, secondary)
            );
            merge_tracks_with_tolerance(&primary, &secondary, tolerance)
        }
        (Some(primary), None) => {
            let primary = load_track(fetcher, primary).await;
            merge_tracks_with_tolerance(&primary, &[], tolerance)
        }
        (None, Some(secondary)) => secondary_only(&load_track(fetcher, secondary).await),
        (None, None) => Vec::new(),
    }
}

/// Tuning for opening sessions
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub sync: SyncSettings,
    pub merge_tolerance: f64,
    pub display_mode: DisplayMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sync: SyncSettings::default(),
            merge_tolerance: MERGE_TOLERANCE_SECONDS,
            display_mode: DisplayMode::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sync: config.sync_settings(),
            merge_tolerance: config.player.merge_tolerance_seconds,
            display_mode: config.player.default_display_mode,
        }
    }
}

/// One open episode with its own controller
pub struct PlaybackSession {
    episode_index: usize,
    episode: Episode,
    controller: SyncController,
    display_mode: DisplayMode,
}

impl PlaybackSession {
    /// Open `catalog[index]`. Returns `None` for an index past the end or an
    /// episode without a video.
    pub async fn open(
        catalog: &[Episode],
        index: usize,
        fetcher: &dyn ResourceFetcher,
        options: &SessionOptions,
    ) -> Option<Self> {
        let episode = catalog.get(index)?;
        if episode.video_url.trim().is_empty() {
            debug!("Episode {} has no video, not opening", index);
            return None;
        }

        let cues = load_episode_cues(fetcher, episode, options.merge_tolerance).await;
        let display_mode = initial_mode(episode, options.display_mode);

        info!(
            "▶️ Opened episode {} ({}) with {} cues",
            index,
            episode.display_title(index),
            cues.len()
        );

        Some(Self {
            episode_index: index,
            episode: episode.clone(),
            controller: SyncController::with_settings(cues, options.sync),
            display_mode,
        })
    }

    pub fn episode_index(&self) -> usize {
        self.episode_index
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SyncController {
        &mut self.controller
    }

    /// Switch languages. The controller restarts over the same cues.
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
        let cues = self.controller.cues().to_vec();
        self.controller.reset(cues);
    }

    pub fn transcript(&self) -> Vec<TranscriptLine> {
        render_transcript(self.controller.cues(), self.display_mode)
    }

    /// Current cues as SRT text in the active display mode
    pub fn export_srt(&self) -> String {
        export_srt(self.controller.cues(), self.display_mode)
    }

    /// Deep link fragment for this episode
    pub fn deep_link(&self) -> String {
        crate::catalog::deep_link(self.episode_index)
    }
}

fn initial_mode(episode: &Episode, fallback: DisplayMode) -> DisplayMode {
    match episode.subtitle_mode {
        Some(mode) => mode,
        None if episode.primary_track().is_none() && episode.secondary_track().is_some() => {
            DisplayMode::Secondary
        }
        None => fallback,
    }
}

/// Merged cues as SRT using the text each line would display
pub fn export_srt(cues: &[MergedCue], mode: DisplayMode) -> String {
    let cues: Vec<Cue> = render_transcript(cues, mode)
        .into_iter()
        .map(|line| {
            let text = match line.translation {
                Some(translation) => format!("{}\n{}", line.text, translation),
                None => line.text,
            };
            Cue::new(line.index as i64 + 1, line.start, line.end, text)
        })
        .collect();
    to_srt(&cues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SubtitleTracks;
    use std::collections::HashMap;

    struct MapFetcher(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl ResourceFetcher for MapFetcher {
        async fn fetch_text(&self, location: &str) -> Result<String> {
            self.0
                .get(location)
                .map(|text| text.to_string())
                .ok_or_else(|| anyhow!("404 {}", location))
        }
    }

    const EN: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello\n\n2\n00:00:04,000 --> 00:00:06,000\nWorld\n";
    const ZH: &str = "1\n00:00:01,200 --> 00:00:03,000\n你好\n";

    fn episode(primary: Option<&str>, secondary: Option<&str>) -> Episode {
        Episode {
            title: "1 Intro".into(),
            video_url: "videos/episode_0.mp4".into(),
            subtitles: Some(SubtitleTracks {
                primary: primary.map(String::from),
                secondary: secondary.map(String::from),
            }),
            ..Default::default()
        }
    }

    fn fetcher() -> MapFetcher {
        MapFetcher(HashMap::from([("a.en.srt", EN), ("a.zh.srt", ZH)]))
    }

    #[tokio::test]
    async fn test_dual_tracks_are_merged() {
        let cues = load_episode_cues(&fetcher(), &episode(Some("a.en.srt"), Some("a.zh.srt")), 2.0).await;

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text_secondary.as_deref(), Some("你好"));
        assert_eq!(cues[1].text_secondary, None);
    }

    #[tokio::test]
    async fn test_missing_secondary_degrades_to_primary() {
        let cues = load_episode_cues(&fetcher(), &episode(Some("a.en.srt"), Some("gone.srt")), 2.0).await;

        assert_eq!(cues.len(), 2);
        assert!(cues.iter().all(|cue| cue.text_secondary.is_none()));
    }

    #[tokio::test]
    async fn test_secondary_only_episode() {
        let catalog = vec![episode(None, Some("a.zh.srt"))];
        let session = PlaybackSession::open(&catalog, 0, &fetcher(), &SessionOptions::default())
            .await
            .unwrap();

        assert_eq!(session.display_mode(), DisplayMode::Secondary);
        assert_eq!(session.transcript()[0].text, "你好");
    }

    #[tokio::test]
    async fn test_open_rejects_bad_targets() {
        let mut no_video = episode(Some("a.en.srt"), None);
        no_video.video_url.clear();
        let catalog = vec![no_video];

        assert!(PlaybackSession::open(&catalog, 0, &fetcher(), &SessionOptions::default()).await.is_none());
        assert!(PlaybackSession::open(&catalog, 5, &fetcher(), &SessionOptions::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_display_mode_change_resets_controller() {
        let catalog = vec![episode(Some("a.en.srt"), Some("a.zh.srt"))];
        let mut session = PlaybackSession::open(&catalog, 0, &fetcher(), &SessionOptions::default())
            .await
            .unwrap();

        session
            .controller_mut()
            .dispatch(crate::sync::SyncCommand::GoToIndex(1));
        assert_eq!(session.controller().current_index(), Some(1));

        session.set_display_mode(DisplayMode::Both);
        assert_eq!(session.controller().current_index(), None);
        assert_eq!(session.controller().cues().len(), 2);
        assert_eq!(session.transcript()[0].translation.as_deref(), Some("你好"));
    }

    #[tokio::test]
    async fn test_catalog_failure_is_empty() {
        assert!(fetch_catalog(&fetcher(), "data/episodes.json").await.is_empty());
    }

    #[test]
    fn test_export_srt_uses_display_text() {
        let cues = vec![MergedCue::paired(
            &Cue::new(1, 1.0, 2.5, "Hi"),
            &Cue::new(1, 1.0, 2.5, "嗨"),
        )];

        let srt = export_srt(&cues, DisplayMode::Both);
        assert_eq!(srt, "1\n00:00:01,000 --> 00:00:02,500\nHi\n嗨\n\n");
    }

    #[test]
    fn test_http_fetcher_resolves_relative_paths() {
        let fetcher = HttpFetcher::new(Url::parse("http://localhost:3000/").unwrap()).unwrap();
        let url = fetcher.resolve("subtitles/a.en.srt").unwrap();

        assert_eq!(url.path(), "/subtitles/a.en.srt");
        assert!(url.query_pairs().any(|(key, _)| key == "t"));
    }
}
