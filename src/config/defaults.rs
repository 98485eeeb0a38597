use super::{Config, LrclibConfig, PathsConfig, PlayerConfig, SyncConfig};

pub fn defaults() -> Config {
    Config {
        paths: PathsConfig {
            data_dir: super::default_data_dir(),
        },
        lrclib: LrclibConfig {
            base_url: crate::lyrics::LrclibClient::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        },
        player: PlayerConfig {
            audio_device: None,
            volume: 80,
            seek_step_secs: 5.0,
        },
        sync: SyncConfig {
            sample_interval_ms: 50,
            seek_tolerance_secs: 2.0,
            restart_threshold_secs: 0.1,
        },
    }
}
