use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::{debug, warn};

use crate::error::Result;
use crate::index::{LineIndex, LyricsLine};
use crate::parser;
use crate::scroll::{
    ScrollAnimator, ScrollSurface, Scheduler, DEFAULT_STEP_INTERVAL, DEFAULT_TOTAL_DURATION,
};
use crate::sync::{SyncEngine, SyncOutcome};
use crate::timestamp::{self, Seconds};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Default,
    Mini,
    Full,
}

impl ViewMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" | "" => Some(Self::Default),
            "mini" => Some(Self::Mini),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    /// Style class for the container, if the mode needs one.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Mini => Some("lyrics-mini"),
            Self::Full => Some("lyrics-full"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LyricsOptions {
    pub view_mode: ViewMode,
    /// Passed through to the view untouched.
    pub alignment: Option<String>,
    pub step_interval: Duration,
    pub total_duration: Duration,
}

impl Default for LyricsOptions {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Default,
            alignment: None,
            step_interval: DEFAULT_STEP_INTERVAL,
            total_duration: DEFAULT_TOTAL_DURATION,
        }
    }
}

impl LyricsOptions {
    pub fn view_mode(mut self, mode: ViewMode) -> Self {
        self.view_mode = mode;
        self
    }

    pub fn alignment(mut self, alignment: impl Into<String>) -> Self {
        self.alignment = Some(alignment.into());
        self
    }

    pub fn step_interval(mut self, step: Duration) -> Self {
        self.step_interval = step;
        self
    }

    pub fn total_duration(mut self, total: Duration) -> Self {
        self.total_duration = total;
        self
    }
}

/// The container the lyrics are rendered into.
///
/// The view only mirrors the model: it is told what to draw and reports
/// geometry back, it never decides which line is active.
pub trait LyricsView: ScrollSurface {
    /// Raw text the container currently holds.
    fn text_content(&self) -> String;

    /// Lines a previous parse already rendered here, empty if none.
    fn rendered_lines(&self) -> Vec<LyricsLine>;

    /// Replace the container's content with one node per line, in order.
    fn render(&self, lines: &[LyricsLine]);

    fn set_line_active(&self, index: usize, active: bool);

    /// Top and bottom edge of a rendered line, in scroll coordinates.
    fn line_extent(&self, index: usize) -> Option<(f64, f64)>;

    fn apply_view_mode(&self, _mode: ViewMode) {}

    fn apply_alignment(&self, _alignment: &str) {}

    /// Scroll offset that brings a content position into view.
    fn offset_for_midpoint(&self, midpoint: f64) -> f64 {
        midpoint
    }
}

/// Playback clock of the media being followed.
pub trait TimeSource {
    fn position(&self) -> Seconds;

    /// Register a callback fired whenever playback time advances.
    fn connect_time_update(&self, callback: Box<dyn Fn()>);
}

struct Inner<V, S: Scheduler> {
    view: Option<Rc<V>>,
    time_source: Option<Rc<dyn TimeSource>>,
    engine: RefCell<SyncEngine>,
    animator: RefCell<ScrollAnimator<S>>,
    enabled: Cell<bool>,
}

/// Lyrics display synchronized to a playback clock.
///
/// A missing view turns every operation into a no-op; a missing time source
/// only disables time-driven updates, explicit line selection still works.
pub struct Lyrics<V: LyricsView + 'static, S: Scheduler + 'static> {
    inner: Rc<Inner<V, S>>,
}

impl<V: LyricsView + 'static, S: Scheduler + 'static> Clone for Lyrics<V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: LyricsView + 'static, S: Scheduler + 'static> Lyrics<V, S> {
    /// Build the widget, parse the container's text and start following the
    /// time source if there is one.
    pub fn new(
        view: Option<Rc<V>>,
        time_source: Option<Rc<dyn TimeSource>>,
        scheduler: S,
        options: LyricsOptions,
    ) -> Self {
        if let Some(view) = &view {
            view.apply_view_mode(options.view_mode);
            if let Some(alignment) = &options.alignment {
                view.apply_alignment(alignment);
            }
        } else {
            warn!("no lyrics container given, lyrics display disabled");
        }

        let animator = ScrollAnimator::new(scheduler, options.step_interval, options.total_duration);
        let lyrics = Self {
            inner: Rc::new(Inner {
                view,
                time_source,
                engine: RefCell::new(SyncEngine::default()),
                animator: RefCell::new(animator),
                enabled: Cell::new(false),
            }),
        };

        lyrics.parse();
        lyrics.enable();
        lyrics
    }

    pub fn decode_timestamp(token: &str) -> Result<Seconds> {
        timestamp::decode(token)
    }

    /// Build the line index from the container text and render it.
    ///
    /// Skipped when the container already shows rendered lines and holds no
    /// multi-line text, so re-initializing over rendered output is harmless.
    pub fn parse(&self) {
        let Some(view) = &self.inner.view else {
            return;
        };

        let raw = view.text_content();
        let rendered = view.rendered_lines();
        let mut engine = self.inner.engine.borrow_mut();

        if !raw.trim().contains('\n') && !rendered.is_empty() {
            debug!(
                "container already holds {} rendered lines, not parsing again",
                rendered.len()
            );
            if engine.index().is_empty() {
                engine.reset(LineIndex::new(rendered));
            }
            return;
        }

        let lines = parser::parse(&raw);
        view.render(&lines);
        engine.reset(LineIndex::new(lines));
        self.inner.animator.borrow_mut().cancel();
    }

    /// Start reacting to the time source. Calling it again does nothing.
    pub fn enable(&self) {
        if self.inner.enabled.get() {
            return;
        }
        let Some(source) = &self.inner.time_source else {
            warn!("no time source available, lyrics will not follow playback");
            return;
        };
        if self.inner.view.is_none() {
            return;
        }

        let weak: Weak<Inner<V, S>> = Rc::downgrade(&self.inner);
        source.connect_time_update(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Lyrics { inner }.on_time_update();
            }
        }));
        self.inner.enabled.set(true);
    }

    pub fn on_time_update(&self) {
        let (Some(_), Some(source)) = (&self.inner.view, &self.inner.time_source) else {
            return;
        };
        let position = source.position();
        let outcome = self.inner.engine.borrow_mut().on_time_update(position);
        self.present(&outcome);
    }

    /// Force `index` to be the active line regardless of playback time.
    pub fn goto_line(&self, index: usize) -> Result<()> {
        if self.inner.view.is_none() {
            return Ok(());
        }
        let outcome = self
            .inner
            .engine
            .borrow_mut()
            .goto_line(index)
            .inspect_err(|err| warn!("ignoring line selection: {}", err))?;
        self.present(&outcome);
        Ok(())
    }

    pub fn clear_line_selection(&self) {
        if self.inner.view.is_none() {
            return;
        }
        let outcome = self.inner.engine.borrow_mut().clear_selection();
        self.present(&outcome);
    }

    pub fn lines(&self) -> Vec<LyricsLine> {
        self.inner.engine.borrow().index().lines().to_vec()
    }

    pub fn active_lines(&self) -> Vec<usize> {
        self.inner.engine.borrow().index().active_indices()
    }

    pub fn selected_line(&self) -> Option<usize> {
        self.inner.engine.borrow().selected_line()
    }

    pub fn is_scrolling(&self) -> bool {
        self.inner.animator.borrow().is_running()
    }

    pub fn scroll_target(&self) -> Option<f64> {
        self.inner.animator.borrow().target()
    }

    /// Ease the container towards the middle of the active lines using their
    /// current geometry. Hosts call this after the lines were laid out again.
    pub fn scroll_to_active(&self) {
        let active = self.active_lines();
        self.scroll_to(&active);
    }

    fn present(&self, outcome: &SyncOutcome) {
        let Some(view) = &self.inner.view else {
            return;
        };
        if !outcome.changed {
            return;
        }

        for line in self.inner.engine.borrow().index() {
            view.set_line_active(line.index, line.active);
        }

        if outcome.wants_scroll() {
            self.scroll_to(&outcome.active);
        }
    }

    fn scroll_to(&self, active: &[usize]) {
        let Some(view) = &self.inner.view else {
            return;
        };
        let (Some(&first), Some(&last)) = (active.first(), active.last()) else {
            return;
        };
        let (Some((top, _)), Some((_, bottom))) = (view.line_extent(first), view.line_extent(last))
        else {
            debug!("active lines {}..={} have no geometry yet", first, last);
            return;
        };

        let target = view.offset_for_midpoint((top + bottom) / 2.0);
        let surface: Rc<dyn ScrollSurface> = view.clone();
        self.inner.animator.borrow_mut().arm(surface, target);
    }
}
