//! API request handlers

use serde_json::Value;
use tracing::info;

use super::models::{AddEpisodeResponse, EpisodeForm, ThumbnailReport, UpdateEpisodeResponse};
use super::server::AppState;
use crate::catalog::{default_title, Episode, SubtitleTracks};
use crate::error::{EchoLineError, Result};
use crate::media::{extension_or_default, file_stem, sanitize_file_name, TrackKind};
use crate::subtitles::DisplayMode;

/// Handle health check requests
pub async fn health_check() -> Result<Value> {
    Ok(serde_json::json!({
        "status": "healthy",
        "service": "echoline",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle catalog listing requests
pub async fn list_episodes(state: &AppState) -> Result<Vec<Episode>> {
    Ok(state.catalog.load().await)
}

/// Register a new episode from an upload or a video already on the server
pub async fn add_episode(state: &AppState, form: EpisodeForm) -> Result<AddEpisodeResponse> {
    let mut transaction = state.catalog.begin().await;
    let index = transaction.episodes.len();
    state.layout.ensure_dirs().await?;

    let (prefix, video_url) = if let Some(video) = form.uploaded_video() {
        let prefix = format!("episode_{index}");
        let ext = extension_or_default(&video.file_name);
        let video_url = state.layout.store_video(&prefix, &ext, &video.bytes).await?;
        (prefix, video_url)
    } else if let Some(name) = form
        .video_filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        let file_name = sanitize_file_name(name)
            .ok_or_else(|| EchoLineError::invalid("Invalid video file name"))?;
        if state.layout.existing_video(&file_name).await.is_none() {
            return Err(EchoLineError::invalid(format!(
                "Video file not found on server: {file_name}"
            )));
        }
        (file_stem(&file_name), state.layout.video_url(&file_name))
    } else {
        return Err(EchoLineError::invalid(
            "Either a video upload or the name of a video in the videos directory is required",
        ));
    };

    let mut tracks = SubtitleTracks::default();
    for track in [TrackKind::Primary, TrackKind::Secondary] {
        if let Some(file) = form.transcript(track) {
            let url = state.layout.store_subtitle(&prefix, track, &file.text()).await?;
            set_track(&mut tracks, track, url);
        }
    }

    let title = non_blank(form.title.as_deref()).unwrap_or_else(|| default_title(index));
    let subtitle = non_blank(form.subtitle.as_deref()).unwrap_or_else(|| title.clone());
    let subtitle_mode = if tracks.primary.is_some() {
        Some(DisplayMode::Primary)
    } else if tracks.secondary.is_some() {
        Some(DisplayMode::Secondary)
    } else {
        None
    };

    let thumb_url = state.thumbnails.generate(&state.layout, &video_url).await;

    let episode = Episode {
        title,
        subtitle: Some(subtitle),
        video_url,
        thumb_url,
        subtitles: (!tracks.is_empty()).then_some(tracks),
        subtitle_mode,
    };

    transaction.episodes.push(episode.clone());
    transaction.commit().await?;
    info!("➕ Added episode {}: {}", index, episode.title);

    Ok(AddEpisodeResponse {
        ok: true,
        index,
        episode,
    })
}

/// Edit an episode; only the parts present in the form change
pub async fn update_episode(
    state: &AppState,
    index: usize,
    form: EpisodeForm,
) -> Result<UpdateEpisodeResponse> {
    let mut transaction = state.catalog.begin().await;
    let episode = transaction
        .episodes
        .get_mut(index)
        .ok_or(EchoLineError::NotFound(index))?;
    let prefix = format!("episode_{index}");
    state.layout.ensure_dirs().await?;

    if let Some(title) = non_blank(form.title.as_deref()) {
        episode.title = title;
    }
    if let Some(subtitle) = form.subtitle.as_deref() {
        episode.subtitle = Some(non_blank(Some(subtitle)).unwrap_or_else(|| episode.title.clone()));
    }

    if let Some(video) = form.uploaded_video() {
        if !episode.video_url.is_empty() {
            state.layout.remove_asset(&episode.video_url).await;
        }
        let ext = extension_or_default(&video.file_name);
        episode.video_url = state.layout.store_video(&prefix, &ext, &video.bytes).await?;
        if let Some(thumb_url) = state.thumbnails.generate(&state.layout, &episode.video_url).await {
            episode.thumb_url = Some(thumb_url);
        }
    }

    for track in [TrackKind::Primary, TrackKind::Secondary] {
        if let Some(file) = form.transcript(track) {
            let url = state.layout.store_subtitle(&prefix, track, &file.text()).await?;
            set_track(episode.subtitles.get_or_insert_with(Default::default), track, url);
        }
    }

    let episode = episode.clone();
    transaction.commit().await?;
    info!("✏️ Updated episode {}: {}", index, episode.title);

    Ok(UpdateEpisodeResponse { ok: true, episode })
}

/// Remove an episode and the files it references
pub async fn delete_episode(state: &AppState, index: usize) -> Result<Value> {
    let mut transaction = state.catalog.begin().await;
    if index >= transaction.episodes.len() {
        return Err(EchoLineError::NotFound(index));
    }

    let episode = transaction.episodes.remove(index);
    for path in episode.asset_paths() {
        state.layout.remove_asset(path).await;
    }

    transaction.commit().await?;
    info!("🗑️ Deleted episode {}: {}", index, episode.title);

    Ok(serde_json::json!({ "ok": true }))
}

/// Regenerate previews for every episode with a video
pub async fn generate_thumbnails(state: &AppState) -> Result<ThumbnailReport> {
    let mut transaction = state.catalog.begin().await;
    let mut generated = 0;

    for episode in transaction.episodes.iter_mut() {
        if episode.video_url.is_empty() {
            continue;
        }
        if let Some(thumb_url) = state.thumbnails.generate(&state.layout, &episode.video_url).await {
            episode.thumb_url = Some(thumb_url);
            generated += 1;
        }
    }

    let total = transaction.episodes.len();
    transaction.commit().await?;
    info!("🖼️ Generated {} of {} thumbnails", generated, total);

    Ok(ThumbnailReport {
        ok: true,
        generated,
        total,
    })
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn set_track(tracks: &mut SubtitleTracks, track: TrackKind, url: String) {
    match track {
        TrackKind::Primary => tracks.primary = Some(url),
        TrackKind::Secondary => tracks.secondary = Some(url),
    }
}
