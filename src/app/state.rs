use crate::lyrics::ParsedLyrics;
use crate::storage::SongRecord;
use crate::sync::LineChange;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub created_at: Instant,
}

impl Toast {
    const TTL: Duration = Duration::from_secs(4);

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Error)
    }

    fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            created_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= Self::TTL
    }
}

/// A library song ready to play
#[derive(Debug, Clone)]
pub struct LoadedSong {
    pub record: SongRecord,
    pub lyrics: Arc<ParsedLyrics>,
}

impl LoadedSong {
    pub fn new(record: SongRecord) -> Self {
        let lyrics = Arc::new(record.lyrics());
        Self { record, lyrics }
    }
}

pub struct KaraokeState {
    pub should_quit: bool,

    pub songs: Vec<LoadedSong>,
    pub current: usize,

    // Playback
    pub paused: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: u8,

    /// Highlighted lyric line, as last reported by the sampler
    pub active_line: Option<usize>,
    /// Bumped on every song switch; sync events from older lyrics are ignored
    pub lyrics_generation: u64,

    pub toast: Option<Toast>,
}

impl KaraokeState {
    pub fn new(songs: Vec<LoadedSong>, volume: u8) -> Self {
        Self {
            should_quit: false,
            songs,
            current: 0,
            paused: true,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume,
            active_line: None,
            lyrics_generation: 0,
            toast: None,
        }
    }

    pub fn song(&self) -> Option<&LoadedSong> {
        self.songs.get(self.current)
    }

    pub fn lyrics(&self) -> Option<&ParsedLyrics> {
        self.song().map(|s| s.lyrics.as_ref())
    }

    /// Move to another song; returns false when `index` is out of range
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.songs.len() {
            return false;
        }
        self.current = index;
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
        self.active_line = None;
        self.lyrics_generation = self.lyrics_generation.wrapping_add(1);
        true
    }

    pub fn next_index(&self) -> Option<usize> {
        let next = self.current + 1;
        (next < self.songs.len()).then_some(next)
    }

    pub fn prev_index(&self) -> Option<usize> {
        self.current.checked_sub(1)
    }

    pub fn apply_line_change(&mut self, generation: u64, change: LineChange) {
        // Sampled before the sampler switched to the current song
        if generation != self.lyrics_generation {
            return;
        }
        let len = self.lyrics().map_or(0, ParsedLyrics::len);
        self.active_line = change.current.filter(|&i| i < len);
    }

    pub fn volume_up(&mut self) {
        self.volume = self.volume.saturating_add(5).min(100);
    }

    pub fn volume_down(&mut self) {
        self.volume = self.volume.saturating_sub(5);
    }
}
