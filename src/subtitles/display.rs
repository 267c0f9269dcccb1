use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::merge::MergedCue;

/// Which language(s) a transcript line shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    #[serde(alias = "en")]
    Primary,
    #[serde(alias = "zh")]
    Secondary,
    Both,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "en" => Ok(Self::Primary),
            "secondary" | "zh" => Ok(Self::Secondary),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown display mode `{other}`")),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Both => "both",
        };
        f.write_str(name)
    }
}

fn present(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.is_empty())
}

/// Text to render for a cue. Never blank when any language has text.
pub fn resolve_text(cue: &MergedCue, mode: DisplayMode) -> String {
    let primary = present(&cue.text_primary);
    let secondary = present(&cue.text_secondary);

    match mode {
        DisplayMode::Primary => primary.unwrap_or_default().to_string(),
        DisplayMode::Secondary => secondary.or(primary).unwrap_or_default().to_string(),
        DisplayMode::Both => {
            let primary = primary.unwrap_or_default();
            match secondary {
                Some(secondary) => format!("{primary}\n{secondary}"),
                None => primary.to_string(),
            }
        }
    }
}

/// `MM:SS` label shown beside a transcript line
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{:02}:{:02}", minutes, secs)
}

/// One row of the rendered transcript list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptLine {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub timestamp: String,
    pub text: String,
    /// Second line of a two-line rendering
    pub translation: Option<String>,
}

/// Render every cue for the transcript panel.
pub fn render_transcript(cues: &[MergedCue], mode: DisplayMode) -> Vec<TranscriptLine> {
    cues.iter()
        .enumerate()
        .map(|(index, cue)| {
            let resolved = resolve_text(cue, mode);
            let (text, translation) = match resolved.split_once('\n') {
                Some((first, rest)) => {
                    let second = rest.split('\n').next().unwrap_or_default();
                    (first.to_string(), Some(second.to_string()))
                }
                None => (resolved, None),
            };

            TranscriptLine {
                index,
                start: cue.start,
                end: cue.end,
                timestamp: format_timestamp(cue.start),
                text,
                translation,
            }
        })
        .collect()
}
