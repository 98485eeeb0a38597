//! Audio object store
//!
//! Uploaded audio files live under one root directory, keyed by
//! `{artist-slug}/{track-slug}/{unix-time}-original.{ext}`.

use anyhow::Context;
use deunicode::deunicode;
use std::path::{Component, Path, PathBuf};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "oga", "opus", "m4a", "aac", "wma", "webm"];

#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Copy `source` into the store and return its key.
    pub fn put(&self, source: &Path, artist: &str, track: &str, now_unix: i64) -> anyhow::Result<String> {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            anyhow::bail!(
                "{} is not an audio file (expected one of: {})",
                source.display(),
                AUDIO_EXTENSIONS.join(", ")
            );
        }

        let key = format!(
            "{}/{}/{}-original.{}",
            slug_or(artist, "artist"),
            slug_or(track, "track"),
            now_unix,
            ext
        );
        let dest = self.path_for(&key)?;
        if dest.exists() {
            anyhow::bail!("audio object {key} already exists");
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        std::fs::copy(source, &dest)
            .with_context(|| format!("copy {} to {}", source.display(), dest.display()))?;

        tracing::info!(key = %key, "stored audio");
        Ok(key)
    }

    /// Filesystem path of an object. Keys that would escape the root are rejected.
    pub fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        let safe = !key.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            anyhow::bail!("invalid audio key {key:?}");
        }
        Ok(self.root.join(rel))
    }

    /// Remove an object. A missing object is not an error.
    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(key = %key, "removed audio");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
}

/// ASCII, lowercase, non-alphanumeric runs collapsed to `-`, no edge dashes.
pub fn slugify(s: &str) -> String {
    let ascii = deunicode(s).to_ascii_lowercase();
    let mut out = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}

fn slug_or(s: &str, fallback: &str) -> String {
    let slug = slugify(s);
    if slug.is_empty() { fallback.to_string() } else { slug }
}
