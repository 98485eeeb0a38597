//! Theme configuration - monochrome karaoke stage

pub mod icons;
pub mod palette;

pub use icons::Icons;
pub use palette::Palette;

use ratatui::symbols::border;

#[derive(Debug, Clone)]
pub struct Theme {
    pub palette: Palette,
    pub icons: Icons,
}

impl Theme {
    pub fn new() -> Self {
        Self {
            palette: Palette::STAGE,
            icons: Icons::unicode(),
        }
    }

    pub fn border_set(&self) -> border::Set<'static> {
        border::ROUNDED
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}
