//! Application-level configuration loading: song catalogue, NFC tag mapping and flow timings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{info, warn};

use crate::state::vote::VoteValue;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SOUND_VOTE_CONFIG_PATH";
/// Song shown before the catalogue pick completes and when nothing else is known.
pub const DEFAULT_SONG: &str = "Frog Noises";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Songs the now-playing loader picks from.
    pub songs: Vec<String>,
    /// Song displayed while loading and used as the last-resort fallback.
    pub default_song: String,
    /// Static association between physical NFC tag ids and vote values.
    pub nfc_tags: IndexMap<String, VoteValue>,
    /// Viewports at or below this width (CSS pixels) are treated as mobile.
    pub mobile_breakpoint: u32,
    /// Artificial delay before the now-playing song is known.
    pub song_load_delay: Duration,
    /// Artificial delay between accepting a vote and recording it.
    pub submission_delay: Duration,
    /// Age after which an in-flight submission is considered abandoned.
    pub submission_timeout: Duration,
    /// Minimum spacing between two votes from the same voter.
    pub throttle_period: Duration,
    /// Sessions not seen for this long are forgotten.
    pub session_idle_timeout: Duration,
    /// How often idle sessions and expired throttle entries are swept.
    pub sweep_interval: Duration,
    /// Base URL the vote submitter reports as its target.
    pub api_base_url: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        songs = app_config.songs.len(),
                        tags = app_config.nfc_tags.len(),
                        "loaded voting config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Vote value bound to an NFC tag, if the tag is registered.
    pub fn vote_for_tag(&self, tag_id: &str) -> Option<VoteValue> {
        self.nfc_tags.get(tag_id).copied()
    }

    /// Whether a viewport of `width` pixels gets the mobile layout.
    pub fn is_mobile_width(&self, width: u32) -> bool {
        width <= self.mobile_breakpoint
    }

    /// Same configuration with every artificial delay removed.
    pub fn without_delays(mut self) -> Self {
        self.song_load_delay = Duration::ZERO;
        self.submission_delay = Duration::ZERO;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            songs: default_songs(),
            default_song: DEFAULT_SONG.to_string(),
            nfc_tags: default_nfc_tags(),
            mobile_breakpoint: 768,
            song_load_delay: Duration::from_millis(500),
            submission_delay: Duration::from_millis(800),
            submission_timeout: Duration::from_secs(10),
            throttle_period: Duration::from_secs(60),
            session_idle_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            api_base_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every field is optional; missing ones keep their built-in value.
struct RawConfig {
    songs: Option<Vec<String>>,
    default_song: Option<String>,
    nfc_tags: Option<IndexMap<String, VoteValue>>,
    mobile_breakpoint: Option<u32>,
    song_load_delay_ms: Option<u64>,
    submission_delay_ms: Option<u64>,
    submission_timeout_ms: Option<u64>,
    throttle_period_secs: Option<u64>,
    session_idle_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    api_base_url: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let songs = raw
            .songs
            .filter(|songs| !songs.is_empty())
            .unwrap_or(defaults.songs);

        Self {
            songs,
            default_song: raw.default_song.unwrap_or(defaults.default_song),
            nfc_tags: raw.nfc_tags.unwrap_or(defaults.nfc_tags),
            mobile_breakpoint: raw.mobile_breakpoint.unwrap_or(defaults.mobile_breakpoint),
            song_load_delay: raw
                .song_load_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.song_load_delay),
            submission_delay: raw
                .submission_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.submission_delay),
            submission_timeout: raw
                .submission_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.submission_timeout),
            throttle_period: raw
                .throttle_period_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.throttle_period),
            session_idle_timeout: raw
                .session_idle_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_timeout),
            sweep_interval: raw
                .sweep_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            api_base_url: raw
                .api_base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in catalogue shipped with the binary.
fn default_songs() -> Vec<String> {
    ["Frog Noises", "Ocean Waves", "Rain Sounds", "Forest Ambience"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_nfc_tags() -> IndexMap<String, VoteValue> {
    IndexMap::from([
        ("1234567".to_string(), VoteValue::UP),
        ("1234568".to_string(), VoteValue::DOWN),
    ])
}
