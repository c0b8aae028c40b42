//! Now-playing loader. There is no real player yet: a song is drawn from the catalogue
//! after a short delay so the page goes through its loading phase.

use rand::seq::IndexedRandom;
use tokio::time::sleep;
use tracing::debug;

use crate::config::AppConfig;

/// Wait the configured load delay, then pick a song.
pub async fn load_song(config: &AppConfig) -> String {
    sleep(config.song_load_delay).await;
    let song = pick_song(&config.songs, &config.default_song);
    debug!(song = %song, "now playing");
    song
}

/// Uniform pick from `songs`, or `fallback` when the catalogue is empty.
pub fn pick_song(songs: &[String], fallback: &str) -> String {
    songs
        .choose(&mut rand::rng())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}
