//! Time providers for the sync engine

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Playback position as seen by the sync engine.
///
/// Implementations only report; they never tell the engine about pauses or
/// seeks. The engine infers both by sampling.
pub trait TimeSource: Send + Sync {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;
    /// Whether media is actively playing
    fn is_playing(&self) -> bool;
}

/// Shared playback position fed by the media player's events.
///
/// Writers (the player event handler) and the sampler task may live on
/// different threads, so state is kept in atomics.
#[derive(Debug, Default)]
pub struct PlaybackClock {
    position_bits: AtomicU64,
    playing: AtomicBool,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.position_bits.store(seconds.to_bits(), Ordering::Release);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    /// Back to the start, stopped
    pub fn reset(&self) {
        self.set_playing(false);
        self.set_position(0.0);
    }
}

impl TimeSource for PlaybackClock {
    fn current_time(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::Acquire))
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_defaults_to_stopped_at_zero() {
        let clock = PlaybackClock::new();
        assert_eq!(clock.current_time(), 0.0);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_clock_sanitizes_positions() {
        let clock = PlaybackClock::new();
        clock.set_position(12.75);
        assert_eq!(clock.current_time(), 12.75);
        clock.set_position(-3.0);
        assert_eq!(clock.current_time(), 0.0);
        clock.set_position(f64::NAN);
        assert_eq!(clock.current_time(), 0.0);
    }

    #[test]
    fn test_clock_reset() {
        let clock = PlaybackClock::new();
        clock.set_position(40.0);
        clock.set_playing(true);
        clock.reset();
        assert_eq!(clock.current_time(), 0.0);
        assert!(!clock.is_playing());
    }
}
