pub mod display;
pub mod merge;
pub mod srt;

pub use display::{format_timestamp, render_transcript, resolve_text, DisplayMode, TranscriptLine};
pub use merge::{merge_tracks, merge_tracks_with_tolerance, secondary_only, MergedCue, MERGE_TOLERANCE_SECONDS};
pub use srt::{format_srt_timestamp, parse_srt, parse_timestamp, to_srt, Cue};
