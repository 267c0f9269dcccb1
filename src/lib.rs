/// EchoLine - bilingual subtitle player core
///
/// Parses and merges two transcript tracks, drives a subtitle sync state
/// machine against a playback clock, and serves the episode catalog that
/// the player browses.

pub mod catalog;
pub mod config;
pub mod error;
pub mod media;
pub mod session;
pub mod subtitles;
pub mod sync;
pub mod video;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::catalog::{CatalogStore, Episode, SubtitleTracks};
pub use crate::config::{Config, ConfigSource, LoadedConfig};
pub use crate::error::{EchoLineError, Result};
pub use crate::media::MediaLayout;
pub use crate::session::{FsFetcher, HttpFetcher, PlaybackSession, ResourceFetcher, SessionOptions};
pub use crate::subtitles::{merge_tracks, parse_srt, resolve_text, Cue, DisplayMode, MergedCue};
pub use crate::sync::{LoopMode, ManualClock, PlaybackClock, SideEffect, SyncCommand, SyncController};
pub use crate::video::ThumbnailGenerator;
