//! LRCLIB API client
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ParsedLyrics;

/// One LRCLIB lyrics record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibRecord {
    pub id: i64,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    /// Track length in seconds
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
}

impl LrclibRecord {
    pub fn has_synced(&self) -> bool {
        self.synced_lyrics
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Parsed synced lyrics; empty when the record only has plain text
    pub fn parsed(&self) -> ParsedLyrics {
        self.synced_lyrics
            .as_deref()
            .map(ParsedLyrics::parse)
            .unwrap_or_default()
    }
}

/// Search parameters; track and artist are required
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    pub duration_secs: Option<u32>,
}

impl SearchQuery {
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            ..Default::default()
        }
    }

    fn to_url(&self, base_url: &str) -> anyhow::Result<String> {
        let track = self.track_name.trim();
        let artist = self.artist_name.trim();
        if track.is_empty() || artist.is_empty() {
            anyhow::bail!("track_name and artist_name are required");
        }

        let mut url = format!(
            "{}/search?track_name={}&artist_name={}",
            base_url,
            urlencoding::encode(track),
            urlencoding::encode(artist)
        );

        if let Some(album) = self.album_name.as_deref().map(str::trim)
            && !album.is_empty()
        {
            url.push_str(&format!("&album_name={}", urlencoding::encode(album)));
        }

        if let Some(duration) = self.duration_secs {
            url.push_str(&format!("&duration={}", duration));
        }

        Ok(url)
    }
}

/// LRCLIB API client
#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://lrclib.net/api";
    const USER_AGENT: &'static str = concat!("singalong/", env!("CARGO_PKG_VERSION"));

    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search for lyrics records matching track and artist
    pub async fn search(&self, query: &SearchQuery) -> anyhow::Result<Vec<LrclibRecord>> {
        let raw = self.search_raw(query).await?;
        let records: Vec<LrclibRecord> =
            serde_json::from_value(raw).context("decode LRCLIB search results")?;
        tracing::debug!(count = records.len(), "LRCLIB search");
        Ok(records)
    }

    /// Raw search response, for debugging
    pub async fn search_raw(&self, query: &SearchQuery) -> anyhow::Result<serde_json::Value> {
        let url = query.to_url(&self.base_url)?;
        let response = self.client.get(&url).send().await.context("LRCLIB search")?;

        if response.status().is_success() {
            Ok(response.json().await.context("read LRCLIB search body")?)
        } else {
            anyhow::bail!("LRCLIB search error: {}", response.status());
        }
    }

    /// Fetch a single record by its LRCLIB id
    pub async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<LrclibRecord>> {
        let url = format!("{}/get/{}", self.base_url, id);
        let response = self.client.get(&url).send().await.context("LRCLIB get")?;

        if response.status().is_success() {
            let record: LrclibRecord = response.json().await.context("decode LRCLIB record")?;
            Ok(Some(record))
        } else if response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            anyhow::bail!("LRCLIB API error: {}", response.status());
        }
    }
}
