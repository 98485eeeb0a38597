use crate::app::actions::Action;
use crate::app::events::{Event, InputEvent};
use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Reads terminal input on a blocking thread until `stop` is set or the
/// app channel closes.
pub fn spawn_input_task(tx: mpsc::Sender<Event>, stop: Arc<AtomicBool>) {
    tokio::task::spawn_blocking(move || {
        while !stop.load(Ordering::Relaxed) {
            if !event::poll(std::time::Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let ev = match event::read() {
                Ok(CtEvent::Key(k)) if k.kind == KeyEventKind::Press => InputEvent::Key(k),
                Ok(CtEvent::Resize(_, _)) => InputEvent::Resize,
                _ => continue,
            };
            if tx.blocking_send(Event::Input(ev)).is_err() {
                break;
            }
        }
    });
}

pub fn map_input_to_action(ev: InputEvent, seek_step: f64) -> Option<Action> {
    match ev {
        InputEvent::Resize => Some(Action::Resize),
        InputEvent::Key(k) => map_key(k, seek_step),
    }
}

fn map_key(k: KeyEvent, seek_step: f64) -> Option<Action> {
    match k.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePause),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::Seek(-seek_step)),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::Seek(seek_step)),
        KeyCode::Char('n') => Some(Action::NextSong),
        KeyCode::Char('p') => Some(Action::PrevSong),
        KeyCode::Char('=') | KeyCode::Char('+') => Some(Action::VolumeUp),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(Action::VolumeDown),
        _ => None,
    }
}
