use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod defaults;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub lrclib: LrclibConfig,
    pub player: PlayerConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Library database, audio objects and logs live here
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrclibConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// mpv audio device name (see `mpv --audio-device=help`)
    pub audio_device: Option<String>,
    /// Volume level (0-100)
    pub volume: u8,
    /// Seconds skipped by the seek keys
    pub seek_step_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How often the playback position is sampled
    pub sample_interval_ms: u64,
    /// Position jumps larger than this are treated as seeks
    pub seek_tolerance_secs: f64,
    /// Positions at or below this after playing further count as a restart
    pub restart_threshold_secs: f64,
}

impl Config {
    pub fn library_db(&self) -> PathBuf {
        self.paths.data_dir.join("library.sqlite3")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.paths.data_dir.join("audio")
    }

    pub fn log_file(&self) -> PathBuf {
        self.paths.data_dir.join("singalong.log")
    }

    pub fn mpv_log_file(&self) -> PathBuf {
        self.paths.data_dir.join("mpv.log")
    }
}

impl LrclibConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl SyncConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
            .clamp(crate::sync::sampler::MIN_INTERVAL, crate::sync::sampler::MAX_INTERVAL)
    }

    pub fn options(&self) -> crate::sync::SyncOptions {
        let fallback = crate::sync::SyncOptions::default();
        let pick = |v: f64, d: f64| if v.is_finite() && v >= 0.0 { v } else { d };
        crate::sync::SyncOptions {
            seek_tolerance: pick(self.seek_tolerance_secs, fallback.seek_tolerance),
            restart_threshold: pick(self.restart_threshold_secs, fallback.restart_threshold),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        defaults::defaults()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        defaults::defaults().paths
    }
}

impl Default for LrclibConfig {
    fn default() -> Self {
        defaults::defaults().lrclib
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        defaults::defaults().player
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        defaults::defaults().sync
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "singalong", "singalong")
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = project_dirs().context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("singalong"))
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    write_config(cfg, &path)
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        write_config(&cfg, &path)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn write_config(cfg: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let cfg = load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg, defaults::defaults());
        assert_eq!(load(Some(&path)).unwrap(), cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync]\nsample_interval_ms = 20\n\n[player]\nvolume = 55\n").unwrap();

        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.sync.sample_interval_ms, 20);
        assert_eq!(cfg.sync.seek_tolerance_secs, 2.0);
        assert_eq!(cfg.player.volume, 55);
        assert_eq!(cfg.lrclib.base_url, "https://lrclib.net/api");
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = defaults::defaults();
        cfg.player.audio_device = Some("pulse/speakers".into());
        cfg.paths.data_dir = dir.path().join("data");

        save(&cfg, Some(&path)).unwrap();
        assert_eq!(load(Some(&path)).unwrap(), cfg);
    }

    #[test]
    fn test_sample_interval_is_clamped() {
        let mut sync = SyncConfig::default();
        sync.sample_interval_ms = 1000;
        assert_eq!(sync.sample_interval(), Duration::from_millis(200));
        sync.sample_interval_ms = 0;
        assert_eq!(sync.sample_interval(), Duration::from_millis(10));
        sync.sample_interval_ms = 50;
        assert_eq!(sync.sample_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_thresholds_fall_back() {
        let mut sync = SyncConfig::default();
        sync.seek_tolerance_secs = -1.0;
        sync.restart_threshold_secs = f64::NAN;
        assert_eq!(sync.options(), crate::sync::SyncOptions::default());
    }
}
