//! Recurring sampling task
//!
//! Drives a [`SyncEngine`] from a tokio interval. The engine (and its cursor)
//! lives inside the task; the handle only sends commands. Dropping the handle
//! cancels the task.

use super::{LineChange, SyncEngine, TimeSource};
use crate::app::events::Event;
use crate::lyrics::ParsedLyrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const MIN_INTERVAL: Duration = Duration::from_millis(10);
pub const MAX_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
enum Command {
    Load(Arc<ParsedLyrics>, u64),
    Unload(u64),
    Seek(f64),
}

#[derive(Debug)]
pub struct Sampler {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Sampler {
    /// Start sampling `clock` every `interval` (clamped to 10..=200ms).
    pub fn spawn(
        engine: SyncEngine,
        clock: Arc<dyn TimeSource>,
        interval: Duration,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        let interval = interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(sample_loop(engine, clock, interval, command_rx, event_tx));
        tracing::debug!(interval_ms = interval.as_millis() as u64, "sampler started");
        Self { commands, task }
    }

    /// Switch to another song's lyrics. Every later `Event::Sync` carries
    /// `generation` until the next load or unload.
    pub fn load(&self, lyrics: Arc<ParsedLyrics>, generation: u64) {
        let _ = self.commands.send(Command::Load(lyrics, generation));
    }

    /// Drop the lyrics; sampling stays idle until the next load
    pub fn unload(&self, generation: u64) {
        let _ = self.commands.send(Command::Unload(generation));
    }

    /// Report an explicit seek so the engine relocates right away
    pub fn seek(&self, seconds: f64) {
        let _ = self.commands.send(Command::Seek(seconds));
    }

    /// Cancel the sampling task
    pub fn stop(self) {
        // Drop does the work
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!("sampler stopped");
    }
}

async fn sample_loop(
    mut engine: SyncEngine,
    clock: Arc<dyn TimeSource>,
    interval: Duration,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<Event>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut generation = 0;

    loop {
        let change = tokio::select! {
            _ = ticker.tick() => engine.sample(clock.as_ref()),
            cmd = command_rx.recv() => match cmd {
                Some(Command::Load(lyrics, g)) => {
                    generation = g;
                    engine.load(lyrics)
                }
                Some(Command::Unload(g)) => {
                    generation = g;
                    engine.unload()
                }
                Some(Command::Seek(t)) => engine.seek(t),
                None => break,
            },
        };

        if let Some(change) = change
            && !emit(&event_tx, generation, change).await
        {
            break;
        }
    }
    tracing::debug!(cursor = ?engine.cursor(), "sampler loop finished");
}

async fn emit(event_tx: &mpsc::Sender<Event>, generation: u64, change: LineChange) -> bool {
    event_tx.send(Event::Sync { generation, change }).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::LyricLine;
    use crate::sync::{ChangeCause, PlaybackClock, SyncOptions};

    const WAIT: Duration = Duration::from_secs(2);

    fn lyrics() -> Arc<ParsedLyrics> {
        Arc::new(ParsedLyrics::from_lines(vec![
            LyricLine::new(0.0, "one"),
            LyricLine::new(5.0, "two"),
            LyricLine::new(10.0, "three"),
        ]))
    }

    async fn next_tagged(rx: &mut mpsc::Receiver<Event>) -> (u64, LineChange) {
        match tokio::time::timeout(WAIT, rx.recv()).await {
            Ok(Some(Event::Sync { generation, change })) => (generation, change),
            other => panic!("expected a sync event, got {other:?}"),
        }
    }

    async fn next_change(rx: &mut mpsc::Receiver<Event>) -> LineChange {
        next_tagged(rx).await.1
    }

    #[tokio::test]
    async fn test_sampler_reports_active_line() {
        let clock = Arc::new(PlaybackClock::new());
        let (tx, mut rx) = mpsc::channel(16);
        let sampler = Sampler::spawn(
            SyncEngine::new(SyncOptions::default()),
            clock.clone(),
            Duration::from_millis(10),
            tx,
        );
        sampler.load(lyrics(), 0);

        clock.set_position(6.0);
        clock.set_playing(true);
        let change = next_change(&mut rx).await;
        assert_eq!(change.current, Some(1));

        clock.set_position(11.0);
        let change = next_change(&mut rx).await;
        assert_eq!(change.previous, Some(1));
        assert_eq!(change.current, Some(2));

        sampler.seek(1.0);
        clock.set_position(1.0);
        let change = next_change(&mut rx).await;
        assert_eq!(change.current, Some(0));
        assert_eq!(change.cause, ChangeCause::Seek);
    }

    #[tokio::test]
    async fn test_sampler_song_switch_clears_line() {
        let clock = Arc::new(PlaybackClock::new());
        clock.set_position(6.0);
        clock.set_playing(true);
        let (tx, mut rx) = mpsc::channel(16);
        let sampler = Sampler::spawn(
            SyncEngine::new(SyncOptions::default()),
            clock.clone(),
            Duration::from_millis(10),
            tx,
        );
        sampler.load(lyrics(), 0);
        assert_eq!(next_change(&mut rx).await.current, Some(1));

        clock.set_playing(false);
        sampler.load(lyrics(), 1);
        let (generation, change) = next_tagged(&mut rx).await;
        assert_eq!(generation, 1);
        assert_eq!(change.cause, ChangeCause::Load);
        assert_eq!(change.current, None);
    }

    #[tokio::test]
    async fn test_events_carry_current_generation() {
        let clock = Arc::new(PlaybackClock::new());
        clock.set_position(6.0);
        clock.set_playing(true);
        let (tx, mut rx) = mpsc::channel(16);
        let sampler = Sampler::spawn(
            SyncEngine::new(SyncOptions::default()),
            clock.clone(),
            Duration::from_millis(10),
            tx,
        );
        sampler.load(lyrics(), 7);
        let (generation, change) = next_tagged(&mut rx).await;
        assert_eq!((generation, change.current), (7, Some(1)));

        sampler.unload(8);
        let (generation, change) = next_tagged(&mut rx).await;
        assert_eq!((generation, change.current), (8, None));

        // Nothing loaded: further ticks stay quiet
        clock.set_position(11.0);
        let res = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_sampler_is_quiet_while_paused() {
        let clock = Arc::new(PlaybackClock::new());
        clock.set_position(6.0);
        let (tx, mut rx) = mpsc::channel(16);
        let sampler = Sampler::spawn(
            SyncEngine::new(SyncOptions::default()),
            clock.clone(),
            Duration::from_millis(10),
            tx,
        );
        sampler.load(lyrics(), 0);

        let res = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(res.is_err(), "no events expected while paused");
    }

    #[tokio::test]
    async fn test_dropping_sampler_cancels_task() {
        let clock = Arc::new(PlaybackClock::new());
        let (tx, mut rx) = mpsc::channel(16);
        let sampler = Sampler::spawn(
            SyncEngine::new(SyncOptions::default()),
            clock,
            Duration::from_millis(10),
            tx,
        );
        assert!(!sampler.task.is_finished());
        sampler.stop();

        // The task owned the only sender; the channel closes once it is gone
        let res = tokio::time::timeout(WAIT, rx.recv()).await;
        assert!(matches!(res, Ok(None)));
    }

    #[tokio::test]
    async fn test_task_exits_when_receiver_closes() {
        let clock = Arc::new(PlaybackClock::new());
        clock.set_playing(true);
        clock.set_position(1.0);
        let (tx, rx) = mpsc::channel(16);
        let sampler = Sampler::spawn(
            SyncEngine::new(SyncOptions::default()),
            clock,
            Duration::from_millis(10),
            tx,
        );
        drop(rx);
        sampler.load(lyrics(), 0);

        let deadline = tokio::time::Instant::now() + WAIT;
        while !sampler.task.is_finished() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(sampler.task.is_finished());
    }
}
