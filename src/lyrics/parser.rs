//! LRC format parser
//!
//! Parses synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.00][01:15.00] Chorus sung twice
//!
//! A tag is strictly `[minutes:seconds]` where minutes is a run of digits and
//! seconds is digits with an optional fractional part. Anything else in
//! brackets (ID tags like `[ti:Title]`, `[00:1x]`, ...) is plain text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TIME_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d+):(\d+(?:\.\d+)?)\]").expect("valid LRC time tag pattern")
});

static ID_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\[([A-Za-z]+):([^\]]*)\]\s*$").expect("valid LRC id tag pattern")
});

/// A single line of lyrics with timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Seconds from the start of the track
    pub time: f64,
    /// The lyrics text, never empty
    pub text: String,
}

impl LyricLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// Time-ordered lyric lines for one song.
///
/// Built once per song load and never mutated; loading another song replaces
/// the whole value. Both the raw-text and the pre-parsed construction paths
/// go through the same normalization, so the sync engine sees identical
/// sequences either way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<LyricLine>", into = "Vec<LyricLine>")]
pub struct ParsedLyrics {
    lines: Vec<LyricLine>,
}

impl ParsedLyrics {
    /// Parse LRC formatted lyrics. Never fails; the worst case is an empty result.
    pub fn parse(content: &str) -> Self {
        let mut lines = Vec::new();

        for raw_line in content.lines() {
            let stamps: Vec<f64> = TIME_TAG
                .captures_iter(raw_line)
                .filter_map(|caps| {
                    let minutes: f64 = caps[1].parse().ok()?;
                    let seconds: f64 = caps[2].parse().ok()?;
                    Some(minutes * 60.0 + seconds)
                })
                .collect();

            // Metadata and plain lines carry no tag
            if stamps.is_empty() {
                continue;
            }

            let text = TIME_TAG.replace_all(raw_line, "");
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            lines.extend(stamps.into_iter().map(|time| LyricLine::new(time, text)));
        }

        Self::from_lines(lines)
    }

    /// Build from already-parsed records (e.g. the persisted JSON form).
    pub fn from_lines(records: Vec<LyricLine>) -> Self {
        let mut lines: Vec<LyricLine> = records
            .into_iter()
            .filter(|l| l.time.is_finite() && l.time >= 0.0)
            .filter_map(|l| {
                let text = l.text.trim();
                if text.is_empty() {
                    None
                } else if text.len() == l.text.len() {
                    Some(l)
                } else {
                    Some(LyricLine::new(l.time, text))
                }
            })
            .collect();

        // Stable: simultaneous tags keep their source order
        lines.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self { lines }
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render back to LRC text, one tag per line.
    pub fn to_lrc(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("[{}]{}", format_timestamp(l.time), l.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<LyricLine>> for ParsedLyrics {
    fn from(records: Vec<LyricLine>) -> Self {
        Self::from_lines(records)
    }
}

impl From<ParsedLyrics> for Vec<LyricLine> {
    fn from(lyrics: ParsedLyrics) -> Self {
        lyrics.lines
    }
}

/// ID tags found in an LRC file (`[ti:]`, `[ar:]`, `[al:]`, `[length:]`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LrcMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Declared track length in seconds
    pub length: Option<f64>,
}

/// Collect ID tags. The first occurrence of each tag wins; unknown tags are ignored.
pub fn parse_metadata(content: &str) -> LrcMetadata {
    let mut meta = LrcMetadata::default();

    for line in content.lines() {
        let Some(caps) = ID_TAG.captures(line) else {
            continue;
        };
        let value = caps[2].trim();
        if value.is_empty() {
            continue;
        }

        let slot = match caps[1].to_ascii_lowercase().as_str() {
            "ti" => &mut meta.title,
            "ar" => &mut meta.artist,
            "al" => &mut meta.album,
            "length" => {
                if meta.length.is_none() {
                    meta.length = parse_length(value);
                }
                continue;
            }
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    meta
}

/// `[length:]` is `mm:ss` (sometimes with a fraction) or plain seconds
fn parse_length(value: &str) -> Option<f64> {
    match value.split_once(':') {
        Some((min, sec)) => {
            let min: f64 = min.trim().parse().ok()?;
            let sec: f64 = sec.trim().parse().ok()?;
            Some(min * 60.0 + sec)
        }
        None => value.parse().ok(),
    }
}

/// Format seconds as `mm:ss.xx`
pub fn format_timestamp(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let min = centis / 6000;
    let sec = (centis % 6000) / 100;
    let cs = centis % 100;
    format!("{:02}:{:02}.{:02}", min, sec, cs)
}
