pub mod actions;
pub mod events;
pub mod state;

use crate::config::Config;
use crate::input;
use crate::player::MpvHandle;
use crate::storage::{AudioStore, SongRecord};
use crate::sync::{PlaybackClock, Sampler, SyncEngine, TimeSource};
use crate::tui::{self, TuiTerminal};
use actions::Action;
use events::{Event, PlayerEvent};
use state::{KaraokeState, LoadedSong, Toast};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Interactive karaoke session over one or more library songs
pub struct KaraokeApp {
    cfg: Config,
    config_path: PathBuf,
    state: KaraokeState,
    audio: AudioStore,
    clock: Arc<PlaybackClock>,
    mpv: Option<MpvHandle>,
    sampler: Option<Sampler>,
}

impl KaraokeApp {
    pub fn new(cfg: Config, config_path: PathBuf, songs: Vec<SongRecord>) -> anyhow::Result<Self> {
        if songs.is_empty() {
            anyhow::bail!("no songs to play");
        }
        let songs = songs.into_iter().map(LoadedSong::new).collect();
        let state = KaraokeState::new(songs, cfg.player.volume.min(100));
        let audio = AudioStore::new(cfg.audio_dir());

        Ok(Self {
            cfg,
            config_path,
            state,
            audio,
            clock: Arc::new(PlaybackClock::new()),
            mpv: None,
            sampler: None,
        })
    }

    pub async fn run(&mut self, terminal: &mut TuiTerminal) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        let input_stop = Arc::new(AtomicBool::new(false));
        input::spawn_input_task(tx.clone(), input_stop.clone());

        // Playback is best-effort: lyrics still render without mpv.
        let mpv_log = self.cfg.mpv_log_file();
        match MpvHandle::spawn(tx.clone(), self.cfg.player.audio_device.as_deref(), Some(&mpv_log))
            .await
        {
            Ok(h) => {
                let _ = h.set_volume(self.state.volume).await;
                self.mpv = Some(h);
            }
            Err(e) => {
                tracing::warn!("mpv unavailable: {e:#}");
                self.state.toast = Some(Toast::error(format!("mpv disabled: {e:#}")));
            }
        }

        let clock: Arc<dyn TimeSource> = self.clock.clone();
        self.sampler = Some(Sampler::spawn(
            SyncEngine::new(self.cfg.sync.options()),
            clock,
            self.cfg.sync.sample_interval(),
            tx.clone(),
        ));

        self.start_current_song().await;
        tui::draw(terminal, &mut self.state)?;

        while let Some(ev) = rx.recv().await {
            match ev {
                Event::Input(input_ev) => {
                    if let Some(action) =
                        input::map_input_to_action(input_ev, self.cfg.player.seek_step_secs)
                    {
                        self.handle_action(action).await;
                    }
                }
                Event::Player(pe) => self.handle_player(pe).await,
                Event::Sync { generation, change } => {
                    tracing::debug!(
                        previous = ?change.previous,
                        current = ?change.current,
                        time = change.time,
                        cause = ?change.cause,
                        "active line changed"
                    );
                    self.state.apply_line_change(generation, change);
                }
            }

            if self.state.should_quit {
                break;
            }

            tui::draw(terminal, &mut self.state)?;
        }

        if let Some(sampler) = self.sampler.take() {
            sampler.stop();
        }
        self.mpv = None;
        input_stop.store(true, Ordering::Relaxed);
        self.save_state_on_quit();

        Ok(())
    }

    fn save_state_on_quit(&mut self) {
        self.cfg.player.volume = self.state.volume;
        if let Err(e) = crate::config::save(&self.cfg, Some(&self.config_path)) {
            tracing::warn!("save config: {e:#}");
        }
    }

    async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.state.should_quit = true,
            Action::Resize => {}
            Action::TogglePause => {
                if let Some(mpv) = &self.mpv {
                    let _ = mpv.toggle_pause().await;
                }
            }
            Action::Seek(delta) => {
                let target = seek_target(self.state.position_secs, delta, self.state.duration_secs);
                self.state.position_secs = target;
                self.clock.set_position(target);
                if let Some(sampler) = &self.sampler {
                    sampler.seek(target);
                }
                if let Some(mpv) = &self.mpv {
                    let _ = mpv.seek_absolute(target).await;
                }
            }
            Action::VolumeUp => {
                self.state.volume_up();
                self.push_volume().await;
            }
            Action::VolumeDown => {
                self.state.volume_down();
                self.push_volume().await;
            }
            Action::NextSong => {
                if let Some(i) = self.state.next_index() {
                    self.switch_song(i).await;
                }
            }
            Action::PrevSong => {
                if let Some(i) = self.state.prev_index() {
                    self.switch_song(i).await;
                }
            }
        }
    }

    async fn push_volume(&self) {
        if let Some(mpv) = &self.mpv {
            let _ = mpv.set_volume(self.state.volume).await;
        }
    }

    async fn handle_player(&mut self, pe: PlayerEvent) {
        match pe {
            PlayerEvent::Started => {
                self.state.paused = false;
                self.clock.set_playing(true);
            }
            PlayerEvent::Paused => {
                self.state.paused = true;
                self.clock.set_playing(false);
            }
            PlayerEvent::Position { seconds } => {
                self.state.position_secs = seconds;
                self.clock.set_position(seconds);
            }
            PlayerEvent::Duration { seconds } => self.state.duration_secs = seconds,
            PlayerEvent::Ended => {
                self.clock.set_playing(false);
                self.state.paused = true;
                match self.state.next_index() {
                    Some(i) => self.switch_song(i).await,
                    None => self.state.toast = Some(Toast::success("End of playlist")),
                }
            }
            PlayerEvent::Error(e) => {
                tracing::warn!("player error: {e}");
                self.state.toast = Some(Toast::error(format!("Player error: {e}")));
            }
        }
    }

    async fn switch_song(&mut self, index: usize) {
        if self.state.select(index) {
            self.start_current_song().await;
        }
    }

    /// Hand the current song's lyrics to the sampler and its audio to mpv.
    async fn start_current_song(&mut self) {
        let Some(song) = self.state.song().cloned() else {
            return;
        };

        // Only the position starts over; the playing flag follows the player
        self.clock.set_position(0.0);
        let generation = self.state.lyrics_generation;
        if let Some(sampler) = &self.sampler {
            if song.lyrics.is_empty() {
                sampler.unload(generation);
            } else {
                sampler.load(song.lyrics.clone(), generation);
            }
        }
        tracing::info!(
            song = song.record.id,
            lines = song.lyrics.len(),
            "loading {} - {}",
            song.record.artist_name,
            song.record.track_name
        );

        let Some(key) = song.record.audio_original_path.as_deref() else {
            self.stop_playback().await;
            self.state.toast = Some(Toast::error("No audio for this song"));
            return;
        };
        let Some(mpv) = &self.mpv else {
            return;
        };

        let result = async {
            let path = self.audio.path_for(key)?;
            mpv.load_file(&path).await?;
            mpv.set_pause(false).await
        }
        .await;
        match result {
            // mpv only reports pause changes, and it may already be unpaused
            Ok(()) => self.clock.set_playing(true),
            Err(e) => {
                tracing::warn!(song = song.record.id, "load audio: {e:#}");
                self.stop_playback().await;
                self.state.toast = Some(Toast::error(format!("Could not load audio: {e:#}")));
            }
        }
    }

    /// Silence the previous song so its position stops feeding the clock.
    async fn stop_playback(&mut self) {
        if let Some(mpv) = &self.mpv
            && let Err(e) = mpv.stop().await
        {
            tracing::warn!("stop mpv: {e:#}");
        }
        self.clock.reset();
        self.state.paused = true;
        self.state.position_secs = 0.0;
    }
}

/// Where a relative seek lands, kept inside the track when its length is known.
fn seek_target(position: f64, delta: f64, duration: f64) -> f64 {
    let target = (position + delta).max(0.0);
    if duration > 0.0 { target.min(duration) } else { target }
}
