use crate::sync::LineChange;

#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Player(PlayerEvent),
    /// Active line change, tagged with the lyrics generation it belongs to
    Sync { generation: u64, change: LineChange },
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(crossterm::event::KeyEvent),
    Resize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Started,
    Paused,
    Position { seconds: f64 },
    Duration { seconds: f64 },
    Ended,
    Error(String),
}
