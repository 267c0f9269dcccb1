//! API data models

use serde::{Deserialize, Serialize};

use crate::catalog::Episode;
use crate::media::TrackKind;

/// File part of a multipart request
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Fields accepted by the add and edit endpoints; every part is optional
#[derive(Debug, Clone, Default)]
pub struct EpisodeForm {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub video: Option<UploadedFile>,
    /// Name of a file already present in the videos directory
    pub video_filename: Option<String>,
    pub primary_srt: Option<UploadedFile>,
    pub secondary_srt: Option<UploadedFile>,
}

impl EpisodeForm {
    /// Record one multipart part by field name. Unknown names are ignored.
    pub fn accept(&mut self, name: &str, file_name: Option<String>, bytes: Vec<u8>) {
        match name {
            "title" => self.title = Some(field_text(&bytes)),
            "subtitle" => self.subtitle = Some(field_text(&bytes)),
            "videoFilename" => self.video_filename = Some(field_text(&bytes)),
            "video" => self.video = Some(upload(file_name, bytes)),
            "srtEn" | "srtPrimary" => self.primary_srt = Some(upload(file_name, bytes)),
            "srtZh" | "srtSecondary" => self.secondary_srt = Some(upload(file_name, bytes)),
            _ => {}
        }
    }

    /// Uploaded video with a non-empty body
    pub fn uploaded_video(&self) -> Option<&UploadedFile> {
        self.video.as_ref().filter(|file| !file.is_empty())
    }

    /// Non-empty transcript upload for `track`
    pub fn transcript(&self, track: TrackKind) -> Option<&UploadedFile> {
        let file = match track {
            TrackKind::Primary => self.primary_srt.as_ref(),
            TrackKind::Secondary => self.secondary_srt.as_ref(),
        };
        file.filter(|file| !file.is_empty())
    }
}

fn field_text(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    let line = raw.strip_suffix('\n').unwrap_or(&raw);
    line.strip_suffix('\r').unwrap_or(line).to_string()
}

fn upload(file_name: Option<String>, bytes: Vec<u8>) -> UploadedFile {
    UploadedFile {
        file_name: file_name.unwrap_or_default(),
        bytes,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddEpisodeResponse {
    pub ok: bool,
    pub index: usize,
    pub episode: Episode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEpisodeResponse {
    pub ok: bool,
    pub episode: Episode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThumbnailReport {
    pub ok: bool,
    pub generated: usize,
    pub total: usize,
}

/// Error body returned with every non-2xx API status
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
