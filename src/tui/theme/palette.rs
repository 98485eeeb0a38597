//! Color palette

use ratatui::style::Color;

/// Lyrics fade from the active line outwards
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub active: Color,
    pub near: Color,
    pub far: Color,
    pub status: Color,
    pub accent: Color,
    pub border: Color,
    pub error: Color,
}

impl Palette {
    pub const STAGE: Self = Self {
        active: Color::Rgb(255, 255, 255),
        near: Color::Rgb(160, 160, 160),
        far: Color::Rgb(80, 80, 80),
        status: Color::Rgb(136, 136, 136),
        accent: Color::Rgb(255, 255, 255),
        border: Color::Rgb(64, 64, 64),
        error: Color::Rgb(230, 90, 90),
    };
}

impl Default for Palette {
    fn default() -> Self {
        Self::STAGE
    }
}
