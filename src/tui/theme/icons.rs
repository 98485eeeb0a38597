//! Plain unicode glyphs; no special font needed

#[derive(Debug, Clone)]
pub struct Icons {
    pub play: &'static str,
    pub pause: &'static str,
    pub music: &'static str,
    pub success: &'static str,
    pub error: &'static str,
    pub progress_full: &'static str,
    pub progress_empty: &'static str,
    pub progress_head: &'static str,
}

impl Icons {
    pub fn unicode() -> Self {
        Self {
            play: "▶",
            pause: "⏸",
            music: "♪",
            success: "✓",
            error: "✗",
            progress_full: "━",
            progress_empty: "─",
            progress_head: "●",
        }
    }
}
