//! Subtitle sync state machine.
//!
//! Every input (clock tick, cue click, mode button, loop bound button, manual
//! scroll) is a [`SyncCommand`]. [`transition`] is pure: it takes the current
//! [`SyncState`] and returns the next one together with the side effects the
//! caller must carry out. [`SyncController`] owns one cue sequence and its
//! state for a single playback session.

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::clock::PlaybackClock;
use crate::subtitles::MergedCue;

/// Auto-scroll stays suppressed this long after a manual scroll
pub const AUTO_SCROLL_QUIET_PERIOD: Duration = Duration::from_millis(1500);

/// How far past a cue's end the clock may run before a loop rewinds
pub const LOOP_TAIL_SECONDS: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LoopMode {
    #[default]
    Normal,
    /// Replay the active cue indefinitely
    SingleRepeat,
    /// Replay the cues between the A and B bounds
    RangeRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SyncState {
    pub mode: LoopMode,
    pub current_index: Option<usize>,
    pub loop_start: Option<usize>,
    pub loop_end: Option<usize>,
    /// Session-relative instant of the last manual transcript scroll
    pub last_user_scroll: Option<Duration>,
}

impl SyncState {
    /// Both bounds, ordered low to high
    pub fn loop_range(&self) -> Option<(usize, usize)> {
        match (self.loop_start, self.loop_end) {
            (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
            _ => None,
        }
    }

    fn auto_scroll_allowed(&self, at: Duration, quiet_period: Duration) -> bool {
        match self.last_user_scroll {
            Some(scrolled) => at.saturating_sub(scrolled) > quiet_period,
            None => true,
        }
    }
}

/// Timing knobs for the state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    pub scroll_quiet_period: Duration,
    pub loop_tail_seconds: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            scroll_quiet_period: AUTO_SCROLL_QUIET_PERIOD,
            loop_tail_seconds: LOOP_TAIL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncCommand {
    /// Periodic clock update; `at` is the session-relative wall instant
    ClockTick { time: f64, at: Duration },
    /// Cue clicked in the transcript
    GoToIndex(usize),
    SetMode(LoopMode),
    /// Mode button press: activates `mode`, or returns to normal if already active
    ToggleMode(LoopMode),
    SetLoopStart,
    SetLoopEnd,
    UserScroll { at: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SideEffect {
    SeekClock(f64),
    Play,
    Highlight(usize),
    ScrollTo(usize),
    ModeChanged(LoopMode),
    LoopBoundsChanged {
        start: Option<usize>,
        end: Option<usize>,
    },
}

/// Index of the cue to highlight at `time`.
///
/// First cue containing `time`; otherwise the last cue starting at or before
/// it, clamped to the first and last cue. `None` only for an empty list.
pub fn find_index_by_time(cues: &[MergedCue], time: f64) -> Option<usize> {
    if let Some(index) = cues.iter().position(|cue| cue.contains(time)) {
        return Some(index);
    }

    match cues.iter().position(|cue| cue.start > time) {
        Some(later) => Some(later.saturating_sub(1)),
        None => cues.len().checked_sub(1),
    }
}

/// Apply one command to a state.
pub fn transition(
    state: &SyncState,
    cues: &[MergedCue],
    settings: &SyncSettings,
    command: SyncCommand,
) -> (SyncState, Vec<SideEffect>) {
    let mut next = *state;
    let mut effects = Vec::new();

    match command {
        SyncCommand::ClockTick { time, at } => {
            on_clock_tick(&mut next, &mut effects, cues, settings, time, at);
        }
        SyncCommand::GoToIndex(index) => {
            on_go_to_index(&mut next, &mut effects, cues, index);
        }
        SyncCommand::SetMode(mode) => {
            change_mode(&mut next, &mut effects, mode);
        }
        SyncCommand::ToggleMode(mode) => {
            let target = if next.mode == mode {
                LoopMode::Normal
            } else {
                mode
            };
            change_mode(&mut next, &mut effects, target);
        }
        SyncCommand::SetLoopStart => {
            if let Some(current) = next.current_index {
                next.loop_start = toggle_bound(next.loop_start, current);
                normalize_bounds(&mut next);
                effects.push(bounds_changed(&next));
            }
        }
        SyncCommand::SetLoopEnd => {
            if let Some(current) = next.current_index {
                next.loop_end = toggle_bound(next.loop_end, current);
                normalize_bounds(&mut next);
                effects.push(bounds_changed(&next));
            }
        }
        SyncCommand::UserScroll { at } => {
            next.last_user_scroll = Some(at);
        }
    }

    (next, effects)
}

fn on_clock_tick(
    state: &mut SyncState,
    effects: &mut Vec<SideEffect>,
    cues: &[MergedCue],
    settings: &SyncSettings,
    time: f64,
    at: Duration,
) {
    if cues.is_empty() {
        return;
    }

    if state.mode == LoopMode::SingleRepeat {
        if let Some(cue) = state.current_index.and_then(|i| cues.get(i)) {
            if time > cue.end + settings.loop_tail_seconds {
                effects.push(SideEffect::SeekClock(cue.start));
            }
            return;
        }
    }

    if let Some(active) = find_index_by_time(cues, time) {
        if state.current_index != Some(active) {
            state.current_index = Some(active);
            effects.push(SideEffect::Highlight(active));
            if state.auto_scroll_allowed(at, settings.scroll_quiet_period) {
                effects.push(SideEffect::ScrollTo(active));
            }
        }
    }

    if state.mode == LoopMode::RangeRepeat {
        if let Some((low, high)) = state.loop_range() {
            if let (Some(first), Some(last)) = (cues.get(low), cues.get(high)) {
                if time > last.end + settings.loop_tail_seconds {
                    effects.push(SideEffect::SeekClock(first.start));
                }
            }
        }
    }
}

fn on_go_to_index(
    state: &mut SyncState,
    effects: &mut Vec<SideEffect>,
    cues: &[MergedCue],
    index: usize,
) {
    let Some(cue) = cues.get(index) else {
        return;
    };

    match state.mode {
        LoopMode::SingleRepeat => change_mode(state, effects, LoopMode::Normal),
        LoopMode::RangeRepeat => {
            if let Some((low, high)) = state.loop_range() {
                if index < low || index > high {
                    change_mode(state, effects, LoopMode::Normal);
                }
            }
        }
        LoopMode::Normal => {}
    }

    state.current_index = Some(index);
    effects.push(SideEffect::SeekClock(cue.start));
    effects.push(SideEffect::Play);
    effects.push(SideEffect::Highlight(index));
    effects.push(SideEffect::ScrollTo(index));
}

fn change_mode(state: &mut SyncState, effects: &mut Vec<SideEffect>, mode: LoopMode) {
    if state.mode == mode {
        return;
    }

    debug!("Loop mode {:?} -> {:?}", state.mode, mode);
    state.mode = mode;
    effects.push(SideEffect::ModeChanged(mode));

    if state.loop_start.is_some() || state.loop_end.is_some() {
        state.loop_start = None;
        state.loop_end = None;
        effects.push(bounds_changed(state));
    }
}

fn toggle_bound(bound: Option<usize>, current: usize) -> Option<usize> {
    if bound == Some(current) {
        None
    } else {
        Some(current)
    }
}

fn normalize_bounds(state: &mut SyncState) {
    if let (Some(a), Some(b)) = (state.loop_start, state.loop_end) {
        if a > b {
            state.loop_start = Some(b);
            state.loop_end = Some(a);
        }
    }
}

fn bounds_changed(state: &SyncState) -> SideEffect {
    SideEffect::LoopBoundsChanged {
        start: state.loop_start,
        end: state.loop_end,
    }
}

/// Session-scoped owner of a cue sequence and its sync state
#[derive(Debug, Clone, Default)]
pub struct SyncController {
    cues: Vec<MergedCue>,
    state: SyncState,
    settings: SyncSettings,
}

impl SyncController {
    pub fn new(cues: Vec<MergedCue>) -> Self {
        Self::with_settings(cues, SyncSettings::default())
    }

    pub fn with_settings(cues: Vec<MergedCue>, settings: SyncSettings) -> Self {
        debug!("Sync controller initialized with {} cues", cues.len());
        Self {
            cues,
            state: SyncState::default(),
            settings,
        }
    }

    /// Replace the working set; nothing carries over
    pub fn reset(&mut self, cues: Vec<MergedCue>) {
        self.cues = cues;
        self.state = SyncState::default();
    }

    pub fn dispatch(&mut self, command: SyncCommand) -> Vec<SideEffect> {
        let (next, effects) = transition(&self.state, &self.cues, &self.settings, command);
        self.state = next;
        effects
    }

    /// Read the clock, run one tick, and apply clock effects back to it.
    pub fn tick(&mut self, clock: &mut dyn PlaybackClock, at: Duration) -> Vec<SideEffect> {
        let effects = self.dispatch(SyncCommand::ClockTick {
            time: clock.current_time(),
            at,
        });
        apply_to_clock(&effects, clock);
        effects
    }

    /// Cue click: seek and resume on `clock`.
    pub fn go_to_index(&mut self, index: usize, clock: &mut dyn PlaybackClock) -> Vec<SideEffect> {
        let effects = self.dispatch(SyncCommand::GoToIndex(index));
        apply_to_clock(&effects, clock);
        effects
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn mode(&self) -> LoopMode {
        self.state.mode
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.current_index
    }

    pub fn loop_bounds(&self) -> (Option<usize>, Option<usize>) {
        (self.state.loop_start, self.state.loop_end)
    }

    pub fn cues(&self) -> &[MergedCue] {
        &self.cues
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }
}

/// Carry out the clock-facing side effects; UI effects are left to the caller.
pub fn apply_to_clock(effects: &[SideEffect], clock: &mut dyn PlaybackClock) {
    for effect in effects {
        match effect {
            SideEffect::SeekClock(seconds) => clock.seek(*seconds),
            SideEffect::Play => clock.play(),
            _ => {}
        }
    }
}
