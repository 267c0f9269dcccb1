pub mod clock;
pub mod controller;

pub use clock::{nearest_rate, ManualClock, PlaybackClock, PLAYBACK_RATES};
pub use controller::{
    apply_to_clock, find_index_by_time, transition, LoopMode, SideEffect, SyncCommand,
    SyncController, SyncSettings, SyncState, AUTO_SCROLL_QUIET_PERIOD, LOOP_TAIL_SECONDS,
};
