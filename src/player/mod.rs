//! Media playback collaborator

pub mod mpv;

pub use mpv::MpvHandle;
