pub mod audio;

pub use audio::AudioStore;

use crate::lyrics::{LrclibRecord, LyricLine, LyricsSource, ParsedLyrics};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

/// A song in the library
#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub id: i64,
    pub lrclib_id: Option<String>,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub duration_seconds: Option<f64>,
    pub lrc_text: Option<String>,
    /// JSON array of `{time, text}` written at import time
    pub lrc_parsed: Option<String>,
    /// Object key in the [`AudioStore`]
    pub audio_original_path: Option<String>,
    pub created_at: i64,
}

impl SongRecord {
    /// The song's lyrics: the stored parse when it decodes, else the raw text.
    pub fn lyrics(&self) -> ParsedLyrics {
        let parsed = self.lrc_parsed.as_deref().and_then(|json| {
            match serde_json::from_str::<Vec<LyricLine>>(json) {
                Ok(lines) => Some(lines),
                Err(e) => {
                    tracing::warn!(song = self.id, "ignoring stored lyrics parse: {e}");
                    None
                }
            }
        });

        LyricsSource::pick(parsed, self.lrc_text.as_deref())
            .map(LyricsSource::into_lyrics)
            .unwrap_or_default()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            lrclib_id: row.get(1)?,
            track_name: row.get(2)?,
            artist_name: row.get(3)?,
            album_name: row.get(4)?,
            duration_seconds: row.get(5)?,
            lrc_text: row.get(6)?,
            lrc_parsed: row.get(7)?,
            audio_original_path: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

/// Descriptor for a song imported from a local LRC file
#[derive(Debug, Clone, Default)]
pub struct NewSong {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub duration_seconds: Option<f64>,
    pub lrc_text: String,
    pub audio_original_path: Option<String>,
}

const SONG_COLUMNS: &str = "id, lrclib_id, track_name, artist_name, album_name, duration_seconds, \
     lrc_text, lrc_parsed, audio_original_path, created_at";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let s = Self {
            conn: Connection::open_in_memory().context("open in-memory db")?,
        };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS songs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  lrclib_id TEXT UNIQUE,
  track_name TEXT NOT NULL,
  artist_name TEXT NOT NULL,
  album_name TEXT,
  duration_seconds REAL,
  lrc_text TEXT,
  lrc_parsed TEXT,
  audio_original_path TEXT,
  created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_songs_created_at ON songs(created_at DESC);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    /// Insert or refresh a song found on LRCLIB, keyed by its LRCLIB id.
    ///
    /// The synced lyrics are stored raw and parsed so playback never has to
    /// re-parse. An existing audio path is kept when `audio_path` is `None`.
    pub fn upsert_from_lrclib(
        &self,
        record: &LrclibRecord,
        audio_path: Option<&str>,
        now_unix: i64,
    ) -> anyhow::Result<i64> {
        let lrc_parsed = serialize_lines(&record.parsed())?;
        let lrclib_id = record.id.to_string();
        self.conn
            .execute(
                r#"
INSERT INTO songs(lrclib_id, track_name, artist_name, album_name, duration_seconds,
                  lrc_text, lrc_parsed, audio_original_path, created_at)
VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT(lrclib_id) DO UPDATE SET
  track_name=excluded.track_name,
  artist_name=excluded.artist_name,
  album_name=excluded.album_name,
  duration_seconds=excluded.duration_seconds,
  lrc_text=excluded.lrc_text,
  lrc_parsed=excluded.lrc_parsed,
  audio_original_path=COALESCE(excluded.audio_original_path, songs.audio_original_path)
"#,
                params![
                    lrclib_id,
                    record.track_name,
                    record.artist_name,
                    record.album_name,
                    record.duration,
                    record.synced_lyrics,
                    lrc_parsed,
                    audio_path,
                    now_unix
                ],
            )
            .context("upsert song")?;
        let id = self
            .conn
            .query_row(
                "SELECT id FROM songs WHERE lrclib_id=?1",
                params![lrclib_id],
                |row| row.get(0),
            )
            .context("read upserted song id")?;
        Ok(id)
    }

    /// Insert a song that did not come from LRCLIB
    pub fn insert_song(&self, song: &NewSong, now_unix: i64) -> anyhow::Result<i64> {
        let lrc_parsed = serialize_lines(&ParsedLyrics::parse(&song.lrc_text))?;
        self.conn
            .execute(
                r#"
INSERT INTO songs(track_name, artist_name, album_name, duration_seconds,
                  lrc_text, lrc_parsed, audio_original_path, created_at)
VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#,
                params![
                    song.track_name,
                    song.artist_name,
                    song.album_name,
                    song.duration_seconds,
                    song.lrc_text,
                    lrc_parsed,
                    song.audio_original_path,
                    now_unix
                ],
            )
            .context("insert song")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_song(&self, id: i64) -> anyhow::Result<Option<SongRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id=?1"),
                params![id],
                SongRecord::from_row,
            )
            .optional()
            .context("get song")
    }

    /// All songs, newest first
    pub fn list_songs(&self) -> anyhow::Result<Vec<SongRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SONG_COLUMNS} FROM songs ORDER BY created_at DESC, id DESC"
            ))
            .context("prepare list songs")?;
        let songs = stmt
            .query_map([], SongRecord::from_row)
            .context("list songs")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read song row")?;
        Ok(songs)
    }

    /// Returns whether a row was removed
    pub fn delete_song(&self, id: i64) -> anyhow::Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM songs WHERE id=?1", params![id])
            .context("delete song")?;
        Ok(n > 0)
    }
}

fn serialize_lines(lyrics: &ParsedLyrics) -> anyhow::Result<String> {
    serde_json::to_string(lyrics).context("serialize parsed lyrics")
}

pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> LrclibRecord {
        LrclibRecord {
            id,
            track_name: "Song".into(),
            artist_name: "Band".into(),
            album_name: Some("Album".into()),
            duration: Some(180.0),
            instrumental: false,
            plain_lyrics: Some("a\nb".into()),
            synced_lyrics: Some("[00:02.00]b\n[00:01.00]a".into()),
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage
            .upsert_from_lrclib(&record(42), Some("band/song/1-original.mp3"), 100)
            .unwrap();

        let song = storage.get_song(id).unwrap().unwrap();
        assert_eq!(song.lrclib_id.as_deref(), Some("42"));
        assert_eq!(song.track_name, "Song");
        assert_eq!(song.duration_seconds, Some(180.0));
        assert_eq!(song.audio_original_path.as_deref(), Some("band/song/1-original.mp3"));
        assert_eq!(
            song.lrc_parsed.as_deref(),
            Some(r#"[{"time":1.0,"text":"a"},{"time":2.0,"text":"b"}]"#)
        );
        assert_eq!(song.lyrics().len(), 2);
    }

    #[test]
    fn test_upsert_same_lrclib_id_updates_in_place() {
        let storage = Storage::open_in_memory().unwrap();
        let first = storage
            .upsert_from_lrclib(&record(7), Some("a.mp3"), 100)
            .unwrap();

        let mut changed = record(7);
        changed.track_name = "Song (Remastered)".into();
        let second = storage.upsert_from_lrclib(&changed, None, 200).unwrap();

        assert_eq!(first, second);
        let songs = storage.list_songs().unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].track_name, "Song (Remastered)");
        assert_eq!(songs[0].audio_original_path.as_deref(), Some("a.mp3"));
        assert_eq!(songs[0].created_at, 100);
    }

    #[test]
    fn test_insert_list_delete() {
        let storage = Storage::open_in_memory().unwrap();
        let old = storage
            .insert_song(
                &NewSong {
                    track_name: "Old".into(),
                    artist_name: "X".into(),
                    lrc_text: "[00:01]old".into(),
                    ..Default::default()
                },
                10,
            )
            .unwrap();
        let new = storage
            .insert_song(
                &NewSong {
                    track_name: "New".into(),
                    artist_name: "Y".into(),
                    lrc_text: "no tags here".into(),
                    ..Default::default()
                },
                20,
            )
            .unwrap();

        let names: Vec<String> = storage
            .list_songs()
            .unwrap()
            .into_iter()
            .map(|s| s.track_name)
            .collect();
        assert_eq!(names, vec!["New", "Old"]);

        assert!(storage.get_song(new).unwrap().unwrap().lyrics().is_empty());

        assert!(storage.delete_song(old).unwrap());
        assert!(!storage.delete_song(old).unwrap());
        assert!(storage.get_song(old).unwrap().is_none());
    }

    #[test]
    fn test_lyrics_falls_back_to_raw_text() {
        let storage = Storage::open_in_memory().unwrap();
        let id = storage.upsert_from_lrclib(&record(1), None, 1).unwrap();
        let mut song = storage.get_song(id).unwrap().unwrap();
        let expected = song.lyrics();

        song.lrc_parsed = Some("not json".into());
        assert_eq!(song.lyrics(), expected);

        song.lrc_parsed = None;
        assert_eq!(song.lyrics(), expected);

        song.lrc_text = None;
        assert!(song.lyrics().is_empty());
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("library.sqlite3");
        let storage = Storage::open(&path).unwrap();
        storage.upsert_from_lrclib(&record(3), None, 1).unwrap();
        drop(storage);

        let reopened = Storage::open(&path).unwrap();
        assert_eq!(reopened.list_songs().unwrap().len(), 1);
    }
}
