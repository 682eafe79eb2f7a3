// Terminal implementation of the playback surface.
//
// Noise tracks play through an external player process, the chime rings the
// terminal bell once per period, and the Pomodoro clock is kept here so the
// session only ever records on/off intent.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::ambient::{self, AmbientError, Cue, CueKind, PlaybackSurface, PomodoroPhase, PomodoroSettings};

struct ChimeClock {
    period: Duration,
    next_ring: Instant,
}

/// Something the clocks or the player did on their own since the last tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    Bell,
    NoiseEnded(String),
}

pub struct TerminalSurface {
    sounds_dir: PathBuf,
    player: Vec<String>,
    noise: Option<Child>,
    chime: Option<ChimeClock>,
    pomodoro: Option<(PomodoroSettings, Instant)>,
}

impl TerminalSurface {
    pub fn new(sounds_dir: PathBuf, player: Vec<String>) -> Self {
        Self {
            sounds_dir,
            player,
            noise: None,
            chime: None,
            pomodoro: None,
        }
    }

    /// Advance the clocks and reap a player that exited by itself.
    pub fn tick(&mut self, now: Instant) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        if let Some(child) = self.noise.as_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                warn!(%status, "noise player exited");
                self.noise = None;
                events.push(SurfaceEvent::NoiseEnded(format!("noise player stopped ({status})")));
            }
        }
        if let Some(clock) = self.chime.as_mut() {
            if now >= clock.next_ring {
                clock.next_ring = now + clock.period;
                events.push(SurfaceEvent::Bell);
            }
        }
        events
    }

    pub fn pomodoro_status(&self, now: Instant) -> Option<(PomodoroPhase, Duration)> {
        self.pomodoro.map(|(settings, started)| {
            let elapsed = now.saturating_duration_since(started);
            (ambient::pomodoro_phase(settings, elapsed), elapsed)
        })
    }

    pub fn noise_running(&self) -> bool {
        self.noise.is_some()
    }

    fn stop_noise(&mut self) {
        if let Some(mut child) = self.noise.take() {
            if let Err(err) = child.kill() {
                debug!(error = %err, "noise player already gone");
            }
            let _ = child.wait();
        }
    }
}

impl PlaybackSurface for TerminalSurface {
    fn start(&mut self, cue: Cue) -> Result<(), AmbientError> {
        match cue {
            Cue::Noise(track) => {
                let path = ambient::track_path(&self.sounds_dir, track)?;
                self.stop_noise();
                let (program, args) = self
                    .player
                    .split_first()
                    .ok_or_else(|| AmbientError::Player("no player configured".to_string()))?;
                let child = Command::new(program)
                    .args(args)
                    .arg(&path)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| {
                        warn!(error = %e, program = %program, "could not start noise player");
                        AmbientError::Player(format!("{program}: {e}"))
                    })?;
                self.noise = Some(child);
            }
            Cue::Chime { duration_secs } => {
                self.chime = Some(ChimeClock {
                    period: Duration::from_secs(u64::from(duration_secs.max(1))),
                    next_ring: Instant::now(),
                });
            }
            Cue::Pomodoro(settings) => {
                self.pomodoro = Some((settings, Instant::now()));
            }
        }
        Ok(())
    }

    fn stop(&mut self, kind: CueKind) {
        match kind {
            CueKind::Noise => self.stop_noise(),
            CueKind::Chime => self.chime = None,
            CueKind::Pomodoro => self.pomodoro = None,
        }
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.stop_noise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::NoiseTrack;

    fn surface(player: &[&str]) -> (tempfile::TempDir, TerminalSurface) {
        let dir = tempfile::tempdir().unwrap();
        let s = TerminalSurface::new(dir.path().to_path_buf(), player.iter().map(|p| p.to_string()).collect());
        (dir, s)
    }

    #[test]
    fn chime_rings_once_per_period() {
        let (_dir, mut s) = surface(&[]);
        assert!(s.tick(Instant::now()).is_empty());

        s.start(Cue::Chime { duration_secs: 10 }).unwrap();
        let t0 = Instant::now();
        assert_eq!(s.tick(t0), vec![SurfaceEvent::Bell]);
        assert!(s.tick(t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(s.tick(t0 + Duration::from_secs(10)), vec![SurfaceEvent::Bell]);

        s.stop(CueKind::Chime);
        assert!(s.tick(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn restarting_noise_replaces_the_running_player() {
        let (dir, mut s) = surface(&["tail", "-f"]);
        std::fs::write(dir.path().join(NoiseTrack::Rain.file_name()), b"ID3").unwrap();
        s.start(Cue::Noise(NoiseTrack::Rain)).unwrap();
        s.start(Cue::Noise(NoiseTrack::Rain)).unwrap();
        assert!(s.noise_running());
        s.stop(CueKind::Noise);
        assert!(!s.noise_running());
    }

    #[test]
    fn player_that_exits_is_reported_once() {
        let (dir, mut s) = surface(&["false"]);
        std::fs::write(dir.path().join(NoiseTrack::WhiteNoise.file_name()), b"ID3").unwrap();
        s.start(Cue::Noise(NoiseTrack::WhiteNoise)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
            events = s.tick(Instant::now());
        }
        assert!(matches!(events.as_slice(), [SurfaceEvent::NoiseEnded(reason)] if reason.contains("noise player stopped")));
        assert!(!s.noise_running());
        assert!(s.tick(Instant::now()).is_empty());
    }

    #[test]
    fn missing_track_is_unavailable() {
        let (_dir, mut s) = surface(&["true"]);
        let err = s.start(Cue::Noise(NoiseTrack::WhiteNoise)).unwrap_err();
        assert!(matches!(err, AmbientError::MissingTrack(_)));
        assert!(!s.noise_running());
    }

    #[test]
    fn missing_player_is_unavailable() {
        let (dir, mut s) = surface(&["globalwell-no-such-player"]);
        std::fs::write(dir.path().join(NoiseTrack::Rain.file_name()), b"ID3").unwrap();
        let err = s.start(Cue::Noise(NoiseTrack::Rain)).unwrap_err();
        assert!(matches!(err, AmbientError::Player(_)));
    }

    #[test]
    fn pomodoro_clock_reports_phase() {
        let (_dir, mut s) = surface(&[]);
        assert!(s.pomodoro_status(Instant::now()).is_none());
        s.start(Cue::Pomodoro(PomodoroSettings::default())).unwrap();
        let (phase, _) = s.pomodoro_status(Instant::now()).unwrap();
        assert!(matches!(phase, PomodoroPhase::Work { round: 1, .. }));
        s.stop(CueKind::Pomodoro);
        assert!(s.pomodoro_status(Instant::now()).is_none());
    }
}
