use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LyricsError, Result};

/// Seconds from the start of playback.
pub type Seconds = f64;

/// An inline `[m:ss.ff]` token found anywhere in a line.
pub(crate) static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+):(\d+\.\d+)\]").expect("invalid timestamp token regex"));

static EXACT_TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+):(\d+\.\d+)\]$").expect("invalid timestamp token regex"));

/// Decode a single bracketed token such as `[2:17.88]` into seconds.
///
/// The whole input must be one token. Anything else is rejected instead of
/// being coerced into a number.
pub fn decode(token: &str) -> Result<Seconds> {
    let malformed = || LyricsError::MalformedTimestamp {
        token: token.to_string(),
    };

    let captures = EXACT_TOKEN_REGEX.captures(token).ok_or_else(malformed)?;
    let minutes: u64 = captures[1].parse().map_err(|_| malformed())?;
    let seconds: f64 = captures[2].parse().map_err(|_| malformed())?;

    Ok(minutes as f64 * 60.0 + seconds)
}

/// Render seconds back into the token grammar, e.g. `137.88` -> `[2:17.88]`.
pub fn encode(seconds: Seconds) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0).floor() as u64;
    let rest = seconds - mins as f64 * 60.0;
    format!("[{}:{:05.2}]", mins, rest)
}
