//! Lyrics module for fetching and parsing synchronized lyrics
//!
//! This module provides:
//! - LRCLIB API client for searching lyrics
//! - LRC format parser for synchronized lyrics
//! - Resolution of stored lyrics (pre-parsed or raw) into one sequence

pub mod lrclib;
pub mod parser;

pub use lrclib::{LrclibClient, LrclibRecord, SearchQuery};
pub use parser::{LyricLine, ParsedLyrics, format_timestamp, parse_metadata};

/// Where a song's lyrics come from
#[derive(Debug, Clone)]
pub enum LyricsSource {
    /// Raw LRC text, parsed on load
    Raw(String),
    /// Records stored from an earlier parse
    Parsed(Vec<LyricLine>),
}

impl LyricsSource {
    /// Prefer the pre-parsed form, fall back to raw text, else nothing.
    pub fn pick(parsed: Option<Vec<LyricLine>>, raw: Option<&str>) -> Option<Self> {
        match (parsed, raw) {
            (Some(lines), _) => Some(Self::Parsed(lines)),
            (None, Some(raw)) => Some(Self::Raw(raw.to_string())),
            (None, None) => None,
        }
    }

    pub fn into_lyrics(self) -> ParsedLyrics {
        match self {
            Self::Raw(raw) => ParsedLyrics::parse(&raw),
            Self::Parsed(lines) => ParsedLyrics::from_lines(lines),
        }
    }
}
