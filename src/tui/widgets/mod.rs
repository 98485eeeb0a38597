pub mod lyrics;
pub mod now_playing;
