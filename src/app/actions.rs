#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    TogglePause,
    /// Relative seek in seconds
    Seek(f64),
    VolumeUp,
    VolumeDown,
    NextSong,
    PrevSong,
    Resize,
}
