//! Playback sync engine
//!
//! Maps a sampled playback position onto the active lyric line. Lookups are a
//! binary search over the time-sorted lines, so they stay correct when the
//! position jumps around on seeks and cost O(log n) per sample.

pub mod clock;
pub mod sampler;

pub use clock::{PlaybackClock, TimeSource};
pub use sampler::Sampler;

use crate::lyrics::{LyricLine, ParsedLyrics};
use std::sync::Arc;

/// Greatest index whose line starts at or before `t`.
///
/// `None` when `t` is before the first line, the slice is empty or `t` is NaN.
pub fn locate(lines: &[LyricLine], t: f64) -> Option<usize> {
    if t.is_nan() {
        return None;
    }
    lines.partition_point(|l| l.time <= t).checked_sub(1)
}

/// Why the active line changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    /// Normal forward (or jitter) progression
    Advance,
    /// Discontinuity larger than the seek tolerance, or an explicit seek
    Seek,
    /// Player position fell back to the start without a seek
    Restart,
    /// New lyrics were loaded or lyrics were cleared
    Load,
}

/// Active line notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
    /// Playback time that produced the change
    pub time: f64,
    pub cause: ChangeCause,
}

/// Per-session playback state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackCursor {
    pub current_index: Option<usize>,
    pub last_observed_time: f64,
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self {
            current_index: None,
            last_observed_time: 0.0,
        }
    }
}

/// Discontinuity thresholds, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncOptions {
    pub seek_tolerance: f64,
    pub restart_threshold: f64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            seek_tolerance: 2.0,
            restart_threshold: 0.1,
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncEngine {
    lyrics: Option<Arc<ParsedLyrics>>,
    cursor: PlaybackCursor,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            lyrics: None,
            cursor: PlaybackCursor::default(),
            options,
        }
    }

    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    /// Replace the lyrics wholesale. The cursor always starts over, and a
    /// highlighted line is reported as cleared.
    pub fn load(&mut self, lyrics: Arc<ParsedLyrics>) -> Option<LineChange> {
        tracing::debug!(lines = lyrics.len(), "sync: lyrics loaded");
        self.lyrics = Some(lyrics);
        self.clear()
    }

    /// Drop the lyrics; sampling becomes a no-op.
    pub fn unload(&mut self) -> Option<LineChange> {
        self.lyrics = None;
        self.clear()
    }

    /// Sample the time source once. No lookups happen while paused or
    /// without lyrics, and the last known index is kept.
    pub fn sample(&mut self, source: &dyn TimeSource) -> Option<LineChange> {
        if !source.is_playing() || !self.has_lines() {
            return None;
        }
        self.observe(source.current_time())
    }

    /// Feed one playback position.
    pub fn observe(&mut self, t: f64) -> Option<LineChange> {
        if !t.is_finite() || !self.has_lines() {
            return None;
        }

        let reported = self.cursor.current_index;
        let last = self.cursor.last_observed_time;
        let threshold = self.options.restart_threshold;

        let cause = if t <= threshold && last > threshold {
            tracing::debug!(from = last, "sync: playback restarted");
            self.cursor = PlaybackCursor::default();
            ChangeCause::Restart
        } else if (t - last).abs() > self.options.seek_tolerance {
            tracing::debug!(from = last, to = t, "sync: discontinuity");
            self.cursor = PlaybackCursor::default();
            ChangeCause::Seek
        } else {
            ChangeCause::Advance
        };

        self.relocate(t, reported, cause)
    }

    /// Explicit seek: reset the cursor and relocate at `t`.
    pub fn seek(&mut self, t: f64) -> Option<LineChange> {
        let reported = self.cursor.current_index;
        self.cursor = PlaybackCursor::default();
        if !t.is_finite() {
            return self.report(reported, None, 0.0, ChangeCause::Seek);
        }
        self.relocate(t, reported, ChangeCause::Seek)
    }

    fn has_lines(&self) -> bool {
        self.lyrics.as_ref().is_some_and(|l| !l.is_empty())
    }

    fn clear(&mut self) -> Option<LineChange> {
        let reported = self.cursor.current_index;
        self.cursor = PlaybackCursor::default();
        self.report(reported, None, 0.0, ChangeCause::Load)
    }

    fn relocate(&mut self, t: f64, reported: Option<usize>, cause: ChangeCause) -> Option<LineChange> {
        let index = self
            .lyrics
            .as_ref()
            .and_then(|lyrics| locate(lyrics.lines(), t));
        self.cursor.last_observed_time = t;
        self.report(reported, index, t, cause)
    }

    /// Commit `index` and notify only if it differs from what was last reported.
    fn report(
        &mut self,
        reported: Option<usize>,
        index: Option<usize>,
        time: f64,
        cause: ChangeCause,
    ) -> Option<LineChange> {
        self.cursor.current_index = index;
        if index == reported {
            return None;
        }
        tracing::trace!(?reported, ?index, time, "sync: active line changed");
        Some(LineChange {
            previous: reported,
            current: index,
            time,
            cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lyrics_at(times: &[f64]) -> Arc<ParsedLyrics> {
        Arc::new(ParsedLyrics::from_lines(
            times
                .iter()
                .enumerate()
                .map(|(i, t)| LyricLine::new(*t, format!("line {i}")))
                .collect(),
        ))
    }

    fn playing_clock(t: f64) -> PlaybackClock {
        let clock = PlaybackClock::new();
        clock.set_playing(true);
        clock.set_position(t);
        clock
    }

    #[test]
    fn test_locate() {
        let lyrics = lyrics_at(&[0.0, 5.0, 10.0]);
        let lines = lyrics.lines();
        assert_eq!(locate(lines, 4.9), Some(0));
        assert_eq!(locate(lines, 5.0), Some(1));
        assert_eq!(locate(lines, -1.0), None);
        assert_eq!(locate(lines, 999.0), Some(2));
        assert_eq!(locate(lines, f64::NAN), None);
        assert_eq!(locate(&[], 3.0), None);
    }

    #[test]
    fn test_locate_before_first_line() {
        let lyrics = lyrics_at(&[2.5, 7.0]);
        assert_eq!(locate(lyrics.lines(), 0.0), None);
        assert_eq!(locate(lyrics.lines(), 2.4999), None);
        assert_eq!(locate(lyrics.lines(), 2.5), Some(0));
    }

    #[test]
    fn test_locate_picks_last_of_simultaneous_lines() {
        let lyrics = lyrics_at(&[1.0, 4.0, 4.0, 4.0, 9.0]);
        assert_eq!(locate(lyrics.lines(), 4.0), Some(3));
        assert_eq!(locate(lyrics.lines(), 3.99), Some(0));
    }

    #[test]
    fn test_monotonic_sampling_notifies_once_per_line() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0, 5.0, 10.0]));

        let mut changes = Vec::new();
        for tick in 0..=10 {
            let clock = playing_clock(tick as f64);
            if let Some(change) = engine.sample(&clock) {
                changes.push((tick, change.current));
            }
        }

        assert_eq!(changes, vec![(0, Some(0)), (5, Some(1)), (10, Some(2))]);
    }

    #[test]
    fn test_fine_grained_sampling_has_no_duplicates() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0, 5.0, 10.0]));

        let clock = playing_clock(0.0);
        let mut count = 0;
        for frame in 0..=720 {
            // ~60 samples per second for 12 seconds
            clock.set_position(frame as f64 / 60.0);
            if engine.sample(&clock).is_some() {
                count += 1;
            }
        }
        assert_eq!(count, 3);
        assert_eq!(engine.cursor().current_index, Some(2));
    }

    #[test]
    fn test_backward_seek_relocates_with_one_notification() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0, 5.0, 10.0]));
        for tick in 0..=10 {
            engine.sample(&playing_clock(tick as f64));
        }
        assert_eq!(engine.cursor().current_index, Some(2));

        let change = engine.sample(&playing_clock(3.0)).unwrap();
        assert_eq!(change.previous, Some(2));
        assert_eq!(change.current, Some(0));
        assert_eq!(change.cause, ChangeCause::Seek);

        assert!(engine.sample(&playing_clock(3.05)).is_none());
        assert_eq!(engine.cursor().last_observed_time, 3.05);
    }

    #[test]
    fn test_forward_seek_skips_intermediate_lines() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0, 5.0, 10.0, 15.0, 20.0]));
        engine.sample(&playing_clock(1.0));

        let change = engine.sample(&playing_clock(17.0)).unwrap();
        assert_eq!(change.previous, Some(0));
        assert_eq!(change.current, Some(3));
        assert!(engine.sample(&playing_clock(17.1)).is_none());
    }

    #[test]
    fn test_seek_within_same_line_is_silent() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0, 30.0]));
        engine.sample(&playing_clock(1.0));
        assert!(engine.sample(&playing_clock(20.0)).is_none());
        assert_eq!(engine.cursor().current_index, Some(0));
    }

    #[test]
    fn test_explicit_seek() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[1.0, 5.0, 10.0]));
        engine.sample(&playing_clock(6.0));

        let change = engine.seek(0.5).unwrap();
        assert_eq!(change.current, None);
        assert_eq!(change.cause, ChangeCause::Seek);
        assert_eq!(engine.cursor(), PlaybackCursor { current_index: None, last_observed_time: 0.5 });

        let change = engine.seek(11.0).unwrap();
        assert_eq!(change.current, Some(2));
    }

    #[test]
    fn test_restart_to_zero_resets_cursor() {
        let mut engine = SyncEngine::new(SyncOptions {
            seek_tolerance: 100.0,
            restart_threshold: 0.1,
        });
        engine.load(lyrics_at(&[0.5, 1.0]));
        engine.sample(&playing_clock(1.2));
        assert_eq!(engine.cursor().current_index, Some(1));

        let change = engine.sample(&playing_clock(0.0)).unwrap();
        assert_eq!(change.cause, ChangeCause::Restart);
        assert_eq!(change.current, None);
        assert_eq!(engine.cursor(), PlaybackCursor::default());
    }

    #[test]
    fn test_paused_source_is_a_noop() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0, 5.0]));
        engine.sample(&playing_clock(6.0));

        let paused = PlaybackClock::new();
        paused.set_position(0.5);
        assert!(engine.sample(&paused).is_none());
        assert_eq!(engine.cursor().current_index, Some(1));
        assert_eq!(engine.cursor().last_observed_time, 6.0);
    }

    #[test]
    fn test_no_lyrics_is_a_noop() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        assert!(engine.sample(&playing_clock(3.0)).is_none());

        engine.load(Arc::new(ParsedLyrics::default()));
        assert!(engine.sample(&playing_clock(3.0)).is_none());
        assert!(engine.observe(3.0).is_none());
        assert_eq!(engine.cursor().current_index, None);
    }

    #[test]
    fn test_song_switch_resets_index() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0, 5.0, 10.0]));
        engine.sample(&playing_clock(12.0));
        assert_eq!(engine.cursor().current_index, Some(2));

        let change = engine.load(lyrics_at(&[20.0, 30.0])).unwrap();
        assert_eq!(change.previous, Some(2));
        assert_eq!(change.current, None);
        assert_eq!(change.cause, ChangeCause::Load);
        assert_eq!(engine.cursor(), PlaybackCursor::default());

        // Nothing active yet, so a second switch has nothing to report
        assert!(engine.load(lyrics_at(&[1.0])).is_none());
        assert_eq!(engine.cursor().current_index, None);
    }

    #[test]
    fn test_unload_clears_active_line() {
        let mut engine = SyncEngine::new(SyncOptions::default());
        engine.load(lyrics_at(&[0.0]));
        engine.sample(&playing_clock(1.0));
        let change = engine.unload().unwrap();
        assert_eq!(change.current, None);
        assert!(engine.sample(&playing_clock(2.0)).is_none());
    }

    #[test]
    fn test_raw_and_preparsed_inputs_sync_identically() {
        let raw = "[00:00.00]a\n[00:05.00][00:12.00]b\n[00:09.50]c";
        let parsed = ParsedLyrics::parse(raw);
        let stored: Vec<LyricLine> =
            serde_json::from_str(&serde_json::to_string(&parsed).unwrap()).unwrap();

        let mut from_raw = SyncEngine::new(SyncOptions::default());
        from_raw.load(Arc::new(parsed));
        let mut from_stored = SyncEngine::new(SyncOptions::default());
        from_stored.load(Arc::new(ParsedLyrics::from_lines(stored)));

        for tick in 0..=30 {
            let clock = playing_clock(tick as f64 * 0.5);
            assert_eq!(from_raw.sample(&clock), from_stored.sample(&clock));
        }
    }
}
