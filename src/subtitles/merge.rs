//! Dual-track alignment.
//!
//! Pairs each primary cue with the secondary cue under a single forward
//! cursor when their start times are within [`MERGE_TOLERANCE_SECONDS`].
//! The walk never backtracks: an extra leading secondary cue, or one large
//! gap, leaves every later primary cue unpaired. That greedy behaviour is
//! kept as-is for tracks cut from the same timeline.

use serde::{Deserialize, Serialize};

use super::srt::Cue;

/// Maximum start-time distance for two cues to be paired
pub const MERGE_TOLERANCE_SECONDS: f64 = 2.0;

/// A cue carrying both languages aligned to one time envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedCue {
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text_primary: Option<String>,
    pub text_secondary: Option<String>,
}

impl MergedCue {
    /// Primary-only cue
    pub fn primary(cue: &Cue) -> Self {
        Self {
            id: cue.id,
            start: cue.start,
            end: cue.end,
            text_primary: Some(cue.text.clone()),
            text_secondary: None,
        }
    }

    /// Secondary-only cue, used when an episode has no primary track
    pub fn secondary(cue: &Cue) -> Self {
        Self {
            id: cue.id,
            start: cue.start,
            end: cue.end,
            text_primary: None,
            text_secondary: Some(cue.text.clone()),
        }
    }

    /// Primary envelope with the secondary text attached
    pub fn paired(primary: &Cue, secondary: &Cue) -> Self {
        Self {
            text_secondary: Some(secondary.text.clone()),
            ..Self::primary(primary)
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Merge two tracks using the default tolerance.
pub fn merge_tracks(primary: &[Cue], secondary: &[Cue]) -> Vec<MergedCue> {
    merge_tracks_with_tolerance(primary, secondary, MERGE_TOLERANCE_SECONDS)
}

/// Merge two tracks; every primary cue is emitted exactly once, in order.
pub fn merge_tracks_with_tolerance(
    primary: &[Cue],
    secondary: &[Cue],
    tolerance: f64,
) -> Vec<MergedCue> {
    if secondary.is_empty() {
        return primary.iter().map(MergedCue::primary).collect();
    }

    let mut merged = Vec::with_capacity(primary.len());
    let mut cursor = 0;

    for cue in primary {
        match secondary.get(cursor) {
            Some(candidate) if (candidate.start - cue.start).abs() < tolerance => {
                merged.push(MergedCue::paired(cue, candidate));
                cursor += 1;
            }
            _ => merged.push(MergedCue::primary(cue)),
        }
    }

    merged
}

/// Wrap a lone secondary track so it can drive the player on its own.
pub fn secondary_only(secondary: &[Cue]) -> Vec<MergedCue> {
    secondary.iter().map(MergedCue::secondary).collect()
}
