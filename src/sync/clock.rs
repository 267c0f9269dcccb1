//! Narrow view of the video element the sync controller drives.

/// Playback speeds offered by the player, 0.5x to 2.0x in 0.1 steps
pub const PLAYBACK_RATES: [f64; 16] = [
    0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7, 1.8, 1.9, 2.0,
];

/// Snap an arbitrary rate to the closest offered speed.
pub fn nearest_rate(rate: f64) -> f64 {
    if !rate.is_finite() {
        return 1.0;
    }

    PLAYBACK_RATES
        .iter()
        .copied()
        .min_by(|a, b| (a - rate).abs().total_cmp(&(b - rate).abs()))
        .unwrap_or(1.0)
}

/// Clock adapter over a media element
pub trait PlaybackClock {
    /// Current media position in seconds
    fn current_time(&self) -> f64;

    /// Jump to a position without changing play state
    fn seek(&mut self, seconds: f64);

    /// Resume playback
    fn play(&mut self);

    fn playback_rate(&self) -> f64;

    /// Set the speed; implementations snap to [`PLAYBACK_RATES`]
    fn set_playback_rate(&mut self, rate: f64);
}

/// In-memory clock advanced explicitly by the caller.
///
/// Used for scripted playback in tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: f64,
    rate: f64,
    playing: bool,
    seeks: Vec<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            rate: 1.0,
            playing: false,
            seeks: Vec::new(),
        }
    }

    /// Clock already positioned at `seconds`
    pub fn at(seconds: f64) -> Self {
        Self {
            time: seconds.max(0.0),
            ..Self::new()
        }
    }

    /// Move to an absolute position, as the media element would while playing
    pub fn set_time(&mut self, seconds: f64) {
        self.time = seconds.max(0.0);
    }

    /// Advance by wall time; scaled by the playback rate while playing
    pub fn advance(&mut self, wall_seconds: f64) {
        if self.playing {
            self.time = (self.time + wall_seconds * self.rate).max(0.0);
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Every position passed to [`PlaybackClock::seek`], oldest first
    pub fn seek_history(&self) -> &[f64] {
        &self.seeks
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for ManualClock {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, seconds: f64) {
        self.time = seconds.max(0.0);
        self.seeks.push(self.time);
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = nearest_rate(rate);
    }
}
