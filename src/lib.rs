//! Lyrics synchronized to a playback clock.
//!
//! Text annotated with inline `[m:ss.ff]` tokens is parsed into timed lines,
//! the lines whose window contains the playback position are marked active,
//! and the container is eased toward the active block on every change.

pub mod error;
pub mod index;
pub mod lyrics;
pub mod parser;
pub mod scroll;
pub mod sync;
pub mod timestamp;

pub use error::LyricsError;
pub use index::{LineIndex, LyricsLine, EMPTY_LINE_TEXT};
pub use lyrics::{Lyrics, LyricsOptions, LyricsView, TimeSource, ViewMode};
pub use scroll::{ManualScheduler, ScrollAnimator, ScrollSurface, Scheduler, TaskHandle};
pub use sync::{SyncEngine, SyncOutcome};
pub use timestamp::Seconds;
