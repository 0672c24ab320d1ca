use anyhow::{bail, Context, Result};
use lyricsync::ViewMode;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MPD_HOST: &str = "127.0.0.1";
const DEFAULT_MPD_PORT: u16 = 6600;

pub const POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const SONG_CHECK_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct Config {
    pub mpd_addr: String,
    pub lyrics_dir: PathBuf,
    pub view_mode: ViewMode,
    /// Show this file instead of following the current MPD song.
    pub fixed_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("MPD_HOST").unwrap_or_else(|_| DEFAULT_MPD_HOST.to_string());
        let port = match std::env::var("MPD_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .with_context(|| format!("MPD_PORT is not a port number: {:?}", port))?,
            Err(_) => DEFAULT_MPD_PORT,
        };

        let lyrics_dir = match std::env::var_os("LYRICS_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Music")
                .join("Lyrics"),
        };

        let view_mode = match std::env::var("LYRICS_VIEW") {
            Ok(name) => match ViewMode::from_name(&name) {
                Some(mode) => mode,
                None => bail!("LYRICS_VIEW must be default, mini or full, got {:?}", name),
            },
            Err(_) => ViewMode::Default,
        };

        let fixed_file = std::env::args_os().nth(1).map(PathBuf::from);

        Ok(Self {
            mpd_addr: format!("{}:{}", host, port),
            lyrics_dir,
            view_mode,
            fixed_file,
        })
    }

    /// `<lyrics dir>/<Artist> - <Title>.lrc`
    pub fn lyrics_path(&self, artist: &str, title: &str) -> PathBuf {
        self.lyrics_dir.join(format!("{} - {}.lrc", artist, title))
    }
}
