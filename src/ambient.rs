//! Ambient effects: noise tracks, the chime and the Pomodoro clock.
//!
//! The session only records what the user asked for ([`AmbientState`]). The
//! actual sound and timers live behind [`PlaybackSurface`], implemented by the
//! presentation layer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_CHIME_SECS: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmbientError {
    #[error("track file not found: {0}")]
    MissingTrack(String),

    #[error("player could not start: {0}")]
    Player(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseTrack {
    WhiteNoise,
    Rain,
    BrownNoise,
}

impl NoiseTrack {
    pub const ALL: [NoiseTrack; 3] = [NoiseTrack::WhiteNoise, NoiseTrack::Rain, NoiseTrack::BrownNoise];

    pub fn label(&self) -> &'static str {
        match self {
            NoiseTrack::WhiteNoise => "White Noise",
            NoiseTrack::Rain => "Rain",
            NoiseTrack::BrownNoise => "Brown Noise",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            NoiseTrack::WhiteNoise => "white-noise.mp3",
            NoiseTrack::Rain => "calming-rain.mp3",
            NoiseTrack::BrownNoise => "soft-brown-noise.mp3",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PomodoroSettings {
    pub work_mins: u32,
    pub break_mins: u32,
    pub rounds: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_mins: 25,
            break_mins: 5,
            rounds: 4,
        }
    }
}

impl PomodoroSettings {
    pub const WORK_RANGE: (u32, u32) = (1, 120);
    pub const BREAK_RANGE: (u32, u32) = (1, 60);
    pub const ROUNDS_RANGE: (u32, u32) = (1, 12);

    pub fn validate(&self) -> Result<(), String> {
        let check = |name: &str, value: u32, (lo, hi): (u32, u32)| {
            if (lo..=hi).contains(&value) {
                Ok(())
            } else {
                Err(format!("{name} must be between {lo} and {hi}, got {value}"))
            }
        };
        check("Work minutes", self.work_mins, Self::WORK_RANGE)?;
        check("Break minutes", self.break_mins, Self::BREAK_RANGE)?;
        check("Rounds", self.rounds, Self::ROUNDS_RANGE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PomodoroPhase {
    Work { remaining_secs: u64, round: u32 },
    Break { remaining_secs: u64, round: u32 },
    Complete,
}

impl PomodoroPhase {
    /// Breathing period of the orb for this phase: calm in work, slow in breaks.
    pub fn breath_period(&self) -> Duration {
        match self {
            PomodoroPhase::Break { .. } => Duration::from_secs(8),
            _ => Duration::from_secs(5),
        }
    }
}

/// Phase of a Pomodoro run `elapsed` after it started. Each round is one work
/// block followed by one break; the run completes after the last break.
pub fn pomodoro_phase(settings: PomodoroSettings, elapsed: Duration) -> PomodoroPhase {
    let work = u64::from(settings.work_mins) * 60;
    let pause = u64::from(settings.break_mins) * 60;
    let round_len = work + pause;
    if round_len == 0 {
        return PomodoroPhase::Complete;
    }
    let secs = elapsed.as_secs();
    let round_idx = secs / round_len;
    if round_idx >= u64::from(settings.rounds) {
        return PomodoroPhase::Complete;
    }
    let round = round_idx as u32 + 1;
    let into_round = secs % round_len;
    if into_round < work {
        PomodoroPhase::Work {
            remaining_secs: work - into_round,
            round,
        }
    } else {
        PomodoroPhase::Break {
            remaining_secs: round_len - into_round,
            round,
        }
    }
}

/// Orb scale in `[0, 1]`: grows for half the period, shrinks for the other half.
pub fn breath_ratio(period: Duration, elapsed: Duration) -> f64 {
    let period_ms = period.as_millis().max(1);
    let pos = (elapsed.as_millis() % period_ms) as f64 / period_ms as f64;
    if pos < 0.5 { pos * 2.0 } else { (1.0 - pos) * 2.0 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueKind {
    Noise,
    Chime,
    Pomodoro,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cue {
    Noise(NoiseTrack),
    Chime { duration_secs: u32 },
    Pomodoro(PomodoroSettings),
}

impl Cue {
    pub fn kind(&self) -> CueKind {
        match self {
            Cue::Noise(_) => CueKind::Noise,
            Cue::Chime { .. } => CueKind::Chime,
            Cue::Pomodoro(_) => CueKind::Pomodoro,
        }
    }
}

/// Where sounds and timers actually happen.
pub trait PlaybackSurface {
    fn start(&mut self, cue: Cue) -> Result<(), AmbientError>;
    fn stop(&mut self, kind: CueKind);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmbientState {
    pub noise_playing: bool,
    pub noise_track: NoiseTrack,
    pub chime_playing: bool,
    pub chime_duration_secs: u32,
    pub pomodoro: Option<PomodoroSettings>,
}

impl Default for AmbientState {
    fn default() -> Self {
        Self {
            noise_playing: false,
            noise_track: NoiseTrack::WhiteNoise,
            chime_playing: false,
            chime_duration_secs: DEFAULT_CHIME_SECS,
            pomodoro: None,
        }
    }
}

/// Resolve a track to its file under `sounds_dir`.
pub fn track_path(sounds_dir: &std::path::Path, track: NoiseTrack) -> Result<PathBuf, AmbientError> {
    let path = sounds_dir.join(track.file_name());
    if path.is_file() {
        Ok(path)
    } else {
        Err(AmbientError::MissingTrack(path.display().to_string()))
    }
}
