mod app;
mod config;
mod input;
mod lyrics;
mod player;
mod storage;
mod sync;
mod tui;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lyrics::{LrclibClient, LrclibRecord, ParsedLyrics, SearchQuery};
use std::io::Read;
use std::path::{Path, PathBuf};
use storage::{AudioStore, NewSong, SongRecord, Storage};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "singalong", version, about = "Terminal karaoke with synchronized LRC lyrics")]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search LRCLIB and print matching records.
    Search {
        track: String,
        artist: String,
        #[arg(long)]
        album: Option<String>,
        /// Track length in seconds.
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Dump raw LRCLIB search JSON to stdout.
    SearchJson {
        track: String,
        artist: String,
        #[arg(long)]
        album: Option<String>,
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Parse an LRC file (`-` for stdin) and print its timed lines.
    Parse {
        file: PathBuf,
        /// Print normalized LRC instead of JSON.
        #[arg(long)]
        lrc: bool,
    },
    /// Add a song to the library.
    Add {
        /// Import lyrics from this LRCLIB record.
        #[arg(long, conflicts_with = "lrc", required_unless_present = "lrc")]
        lrclib_id: Option<i64>,
        /// Import lyrics from a local LRC file.
        #[arg(long)]
        lrc: Option<PathBuf>,
        /// Track name (defaults to the file's [ti:] tag).
        #[arg(long)]
        track: Option<String>,
        /// Artist name (defaults to the file's [ar:] tag).
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        /// Audio file to copy into the library.
        #[arg(long)]
        audio: Option<PathBuf>,
    },
    /// List library songs, newest first.
    Library,
    /// Delete a song and its stored audio.
    Delete { id: i64 },
    /// Open the karaoke view for one or more library songs.
    Play {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;
    let cfg_path = match cli.config.clone() {
        Some(p) => p,
        None => config::default_config_path().context("default config path")?,
    };
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    match cli.command {
        Command::Play { ids } => {
            // The TUI owns the terminal; log to a file instead.
            init_file_logging(&cfg.log_file(), level)?;
            let storage = Storage::open(&cfg.library_db())?;
            let songs = ids
                .iter()
                .map(|&id| {
                    storage
                        .get_song(id)?
                        .with_context(|| format!("no song with id {id}"))
                })
                .collect::<anyhow::Result<Vec<SongRecord>>>()?;
            drop(storage);

            let mut app = app::KaraokeApp::new(cfg, cfg_path, songs)?;
            let mut terminal = tui::TerminalGuard::enter().context("init terminal")?;
            app.run(terminal.terminal_mut()).await?;
        }
        command => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_max_level(level)
                .with_target(false)
                .with_level(true)
                .init();
            run_headless(command, &cfg).await?;
        }
    }

    Ok(())
}

fn init_file_logging(path: &Path, level: Level) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .init();
    Ok(())
}

async fn run_headless(command: Command, cfg: &config::Config) -> anyhow::Result<()> {
    match command {
        Command::Search { track, artist, album, duration } => {
            let client = make_client(cfg)?;
            let query = search_query(track, artist, album, duration);
            let records = client.search(&query).await?;
            if records.is_empty() {
                println!("No matches.");
            }
            for r in &records {
                print_record(r);
            }
        }
        Command::SearchJson { track, artist, album, duration } => {
            let client = make_client(cfg)?;
            let query = search_query(track, artist, album, duration);
            let v = client.search_raw(&query).await?;
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        Command::Parse { file, lrc } => {
            let content = read_input(&file)?;
            let lyrics = ParsedLyrics::parse(&content);
            if lrc {
                print!("{}", lyrics.to_lrc());
            } else {
                println!("{}", serde_json::to_string_pretty(&lyrics)?);
            }
        }
        Command::Add { lrclib_id, lrc, track, artist, album, audio } => {
            let storage = Storage::open(&cfg.library_db())?;
            let audio_store = AudioStore::new(cfg.audio_dir());
            let now = storage::now_unix();

            let id = match (lrclib_id, lrc) {
                (Some(lrclib_id), _) => {
                    let client = make_client(cfg)?;
                    let record = client
                        .get_by_id(lrclib_id)
                        .await?
                        .with_context(|| format!("LRCLIB has no record {lrclib_id}"))?;
                    if !record.has_synced() {
                        tracing::warn!(lrclib_id, "record has no synced lyrics");
                    }
                    let key = store_audio(&audio_store, audio.as_deref(), &record.artist_name, &record.track_name, now)?;
                    let res = storage.upsert_from_lrclib(&record, key.as_deref(), now);
                    finish_add(&audio_store, key.as_deref(), res)?
                }
                (None, Some(path)) => {
                    let content = read_input(&path)?;
                    let meta = lyrics::parse_metadata(&content);
                    let song = NewSong {
                        track_name: track
                            .or(meta.title)
                            .context("--track is required (the file has no [ti:] tag)")?,
                        artist_name: artist
                            .or(meta.artist)
                            .context("--artist is required (the file has no [ar:] tag)")?,
                        album_name: album.or(meta.album),
                        duration_seconds: meta.length,
                        lrc_text: content,
                        audio_original_path: None,
                    };
                    let key = store_audio(&audio_store, audio.as_deref(), &song.artist_name, &song.track_name, now)?;
                    let song = NewSong { audio_original_path: key.clone(), ..song };
                    let res = storage.insert_song(&song, now);
                    finish_add(&audio_store, key.as_deref(), res)?
                }
                (None, None) => anyhow::bail!("pass --lrclib-id or --lrc"),
            };

            let song = storage.get_song(id)?.context("song vanished after insert")?;
            println!(
                "Added #{} {} - {} ({} lines)",
                song.id,
                song.artist_name,
                song.track_name,
                song.lyrics().len()
            );
        }
        Command::Library => {
            let storage = Storage::open(&cfg.library_db())?;
            let songs = storage.list_songs()?;
            if songs.is_empty() {
                println!("Library is empty.");
            }
            for s in &songs {
                print_song(s);
            }
        }
        Command::Delete { id } => {
            let storage = Storage::open(&cfg.library_db())?;
            let song = storage
                .get_song(id)?
                .with_context(|| format!("no song with id {id}"))?;
            if let Some(key) = song.audio_original_path.as_deref() {
                AudioStore::new(cfg.audio_dir()).remove(key)?;
            }
            storage.delete_song(id)?;
            tracing::info!(song = id, "deleted song");
            println!("Deleted #{id} {} - {}", song.artist_name, song.track_name);
        }
        Command::Play { .. } => anyhow::bail!("play needs the interactive terminal"),
    }
    Ok(())
}

fn make_client(cfg: &config::Config) -> anyhow::Result<LrclibClient> {
    LrclibClient::new(&cfg.lrclib.base_url, cfg.lrclib.timeout())
}

fn search_query(
    track: String,
    artist: String,
    album: Option<String>,
    duration: Option<u32>,
) -> SearchQuery {
    SearchQuery {
        album_name: album,
        duration_secs: duration,
        ..SearchQuery::new(track, artist)
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn store_audio(
    store: &AudioStore,
    audio: Option<&Path>,
    artist: &str,
    track: &str,
    now: i64,
) -> anyhow::Result<Option<String>> {
    audio
        .map(|src| store.put(src, artist, track, now))
        .transpose()
}

/// Drop a freshly stored audio object when the row could not be written.
fn finish_add(store: &AudioStore, key: Option<&str>, res: anyhow::Result<i64>) -> anyhow::Result<i64> {
    if res.is_err()
        && let Some(key) = key
    {
        let _ = store.remove(key);
    }
    res
}

fn print_record(r: &LrclibRecord) {
    let kind = if r.instrumental {
        "instrumental"
    } else if r.has_synced() {
        "synced"
    } else {
        "plain"
    };
    let album = r.album_name.as_deref().map(|a| format!(" ({a})")).unwrap_or_default();
    let length = r.duration.map(lyrics::format_timestamp).unwrap_or_default();
    println!(
        "{:>9}  {} - {}{}  {}  [{}]",
        r.id, r.artist_name, r.track_name, album, length, kind
    );
}

fn print_song(s: &SongRecord) {
    let added = time::OffsetDateTime::from_unix_timestamp(s.created_at)
        .map(|t| t.date().to_string())
        .unwrap_or_else(|_| "?".into());
    let audio = if s.audio_original_path.is_some() { "audio" } else { "no audio" };
    println!(
        "{:>4}. {} - {}  {} lines, {}  (added {})",
        s.id,
        s.artist_name,
        s.track_name,
        s.lyrics().len(),
        audio,
        added
    );
}
