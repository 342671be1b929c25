//! Client-side playback controller, restated as a pure state machine.
//!
//! The controller owns the transport state of a single viewing session: it
//! receives user commands and media-element events, and answers with requests
//! for the hosting element (play, pause, seek) and one-shot signals for the
//! surrounding application (the watch milestone). It performs no I/O and
//! reads no clocks; callers pass `Instant`s in, which keeps the auto-hide
//! timer deterministic under test.

use std::time::{Duration, Instant};

/// Playback position after which the session counts as watched.
pub const WATCHED_THRESHOLD_SECS: f64 = 30.0;

/// Controls disappear this long after the last pointer motion while playing.
pub const CONTROLS_HIDE_AFTER: Duration = Duration::from_secs(3);

/// Relative seek step for the skip back/forward commands.
pub const SEEK_STEP_SECS: f64 = 10.0;

/// Transport phase. `Error` is terminal for the session; the player is
/// recovered by tearing it down and starting a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Playing,
    Paused,
    Error(String),
}

/// Request for the hosting media element. The controller never assumes a
/// request succeeded; the element reports back through events.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportRequest {
    Play,
    Pause,
    SeekTo(f64),
    SetVolume(f64),
    SetMuted(bool),
    EnterFullscreen,
    ExitFullscreen,
}

/// One-shot signal for the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSignal {
    /// Fired exactly once per session, the first time playback position
    /// exceeds [`WATCHED_THRESHOLD_SECS`].
    Watched,
}

#[derive(Debug)]
pub struct PlaybackController {
    phase: Phase,
    /// Stall overlay; orthogonal to the transport phase.
    buffering: bool,
    /// Host fullscreen state, synced from fullscreen-change notifications.
    fullscreen: bool,
    controls_visible: bool,
    hide_controls_at: Option<Instant>,
    duration: f64,
    position: f64,
    volume: f64,
    muted: bool,
    /// Volume before the last mute, restored exactly on unmute.
    pre_mute_volume: Option<f64>,
    watched_emitted: bool,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            buffering: false,
            fullscreen: false,
            controls_visible: true,
            hide_controls_at: None,
            duration: 0.0,
            position: 0.0,
            volume: 1.0,
            muted: false,
            pre_mute_volume: None,
            watched_emitted: false,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.phase, Phase::Playing)
    }

    #[must_use]
    pub const fn is_buffering(&self) -> bool {
        self.buffering
    }

    #[must_use]
    pub const fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Controls are always shown while not playing.
    #[must_use]
    pub const fn controls_visible(&self) -> bool {
        if self.is_playing() { self.controls_visible } else { true }
    }

    #[must_use]
    pub const fn position(&self) -> f64 {
        self.position
    }

    #[must_use]
    pub const fn duration(&self) -> f64 {
        self.duration
    }

    #[must_use]
    pub const fn volume(&self) -> f64 {
        self.volume
    }

    /// Volume of exactly zero displays as muted even without an explicit
    /// mute command.
    #[must_use]
    pub fn displays_muted(&self) -> bool {
        self.muted || self.volume == 0.0
    }

    /// Fraction of the movie played, for a progress track.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    const fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Error(_))
    }

    // ------------------------------------------------------------------
    // Source resolution
    // ------------------------------------------------------------------

    /// The media source resolved (possibly to a time-limited URL).
    pub fn source_resolved(&mut self) {
        if matches!(self.phase, Phase::Loading) {
            self.phase = Phase::Ready;
        }
    }

    /// Source resolution failed; the session is over.
    pub fn source_failed(&mut self, message: impl Into<String>) {
        self.phase = Phase::Error(message.into());
        self.buffering = false;
    }

    // ------------------------------------------------------------------
    // User commands
    // ------------------------------------------------------------------

    /// Play/pause toggle. Buffering does not block the request.
    pub fn toggle_play(&mut self) -> Option<TransportRequest> {
        match self.phase {
            Phase::Playing => Some(TransportRequest::Pause),
            Phase::Ready | Phase::Paused => Some(TransportRequest::Play),
            Phase::Loading | Phase::Error(_) => None,
        }
    }

    /// Absolute seek from a fractional click position along the progress
    /// track. Out-of-range fractions clamp instead of erroring.
    pub fn seek_to_fraction(&mut self, fraction: f64) -> Option<TransportRequest> {
        if self.is_terminal() {
            return None;
        }
        let target = (fraction * self.duration).clamp(0.0, self.duration);
        self.position = target;
        Some(TransportRequest::SeekTo(target))
    }

    /// Relative seek (e.g. ±10 s), clamped to `[0, duration]`.
    pub fn seek_relative(&mut self, delta_secs: f64) -> Option<TransportRequest> {
        if self.is_terminal() {
            return None;
        }
        let target = (self.position + delta_secs).clamp(0.0, self.duration);
        self.position = target;
        Some(TransportRequest::SeekTo(target))
    }

    /// Continuous volume in `[0, 1]`; zero is an implicit mute for display
    /// purposes but does not overwrite the stored pre-mute volume.
    pub fn set_volume(&mut self, volume: f64) -> Option<TransportRequest> {
        if self.is_terminal() {
            return None;
        }
        self.volume = volume.clamp(0.0, 1.0);
        if self.volume > 0.0 {
            self.muted = false;
        }
        Some(TransportRequest::SetVolume(self.volume))
    }

    /// Mute stores the pre-mute volume; unmute restores it exactly.
    pub fn toggle_mute(&mut self) -> Vec<TransportRequest> {
        if self.is_terminal() {
            return Vec::new();
        }
        if self.muted {
            let restored = self.pre_mute_volume.take().unwrap_or(1.0);
            self.muted = false;
            self.volume = restored;
            vec![
                TransportRequest::SetMuted(false),
                TransportRequest::SetVolume(restored),
            ]
        } else {
            self.pre_mute_volume = Some(self.volume);
            self.muted = true;
            self.volume = 0.0;
            vec![TransportRequest::SetMuted(true)]
        }
    }

    /// Fullscreen request against the host. State is not flipped here; it
    /// resyncs from [`Self::host_fullscreen_changed`].
    pub fn toggle_fullscreen(&mut self) -> TransportRequest {
        if self.fullscreen {
            TransportRequest::ExitFullscreen
        } else {
            TransportRequest::EnterFullscreen
        }
    }

    /// Pointer motion shows the controls and re-arms the hide timer.
    pub fn pointer_moved(&mut self, now: Instant) {
        self.controls_visible = true;
        self.hide_controls_at = Some(now + CONTROLS_HIDE_AFTER);
    }

    /// Periodic tick driving the auto-hide timer.
    pub fn tick(&mut self, now: Instant) {
        if self.is_playing()
            && let Some(deadline) = self.hide_controls_at
            && now >= deadline
        {
            self.controls_visible = false;
            self.hide_controls_at = None;
        }
    }

    // ------------------------------------------------------------------
    // Media element / host events
    // ------------------------------------------------------------------

    pub fn metadata_loaded(&mut self, duration_secs: f64) {
        if !self.is_terminal() {
            self.duration = duration_secs.max(0.0);
        }
    }

    pub fn element_playing(&mut self) {
        if !self.is_terminal() && !matches!(self.phase, Phase::Loading) {
            self.phase = Phase::Playing;
        }
        self.buffering = false;
    }

    pub fn element_paused(&mut self) {
        if matches!(self.phase, Phase::Playing) {
            self.phase = Phase::Paused;
            self.controls_visible = true;
        }
    }

    /// Underlying stall signal; an overlay, not a phase change.
    pub fn element_stalled(&mut self) {
        if !self.is_terminal() {
            self.buffering = true;
        }
    }

    pub fn element_error(&mut self, message: impl Into<String>) {
        self.source_failed(message);
    }

    /// Position report from the element. Returns the watch milestone the
    /// first time position crosses the threshold; never again afterwards.
    pub fn time_update(&mut self, position_secs: f64) -> Option<PlayerSignal> {
        if self.is_terminal() {
            return None;
        }
        self.position = if self.duration > 0.0 {
            position_secs.clamp(0.0, self.duration)
        } else {
            position_secs.max(0.0)
        };

        if self.position > WATCHED_THRESHOLD_SECS && !self.watched_emitted {
            self.watched_emitted = true;
            return Some(PlayerSignal::Watched);
        }
        None
    }

    /// Host-level fullscreen-change notification; the single source of truth
    /// for fullscreen state.
    pub fn host_fullscreen_changed(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }
}
