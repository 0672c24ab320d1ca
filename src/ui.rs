use gtk::prelude::*;
use gtk::{
    Align, Application, ApplicationWindow, Box as GtkBox, Label, Orientation, PolicyType,
    ScrolledWindow,
};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use lyricsync::{
    Lyrics, LyricsLine, LyricsOptions, LyricsView, Scheduler, ScrollSurface, TaskHandle,
    TimeSource, ViewMode,
};

use crate::config::{Config, POLL_INTERVAL, SONG_CHECK_INTERVAL};
use crate::mpd_client::{format_time, MpdTimeSource};

/// Runs scroll ticks as glib timeouts on the main loop.
#[derive(Clone, Copy, Default)]
pub struct GlibScheduler;

pub struct GlibTask {
    id: Option<glib::SourceId>,
    finished: Rc<Cell<bool>>,
}

impl Scheduler for GlibScheduler {
    type Handle = GlibTask;

    fn every(&self, interval: Duration, mut task: Box<dyn FnMut() -> ControlFlow<()>>) -> GlibTask {
        let finished = Rc::new(Cell::new(false));
        let finished_clone = finished.clone();
        let id = glib::timeout_add_local(interval, move || {
            if task().is_break() {
                finished_clone.set(true);
                glib::ControlFlow::Break
            } else {
                glib::ControlFlow::Continue
            }
        });
        GlibTask { id: Some(id), finished }
    }
}

impl TaskHandle for GlibTask {
    fn cancel(mut self) {
        // Removing a source that already returned Break would panic.
        if let Some(id) = self.id.take() {
            if !self.finished.get() {
                id.remove();
            }
        }
    }
}

/// Scrolled column of labels, one per lyric line.
pub struct LyricsPane {
    scroll: ScrolledWindow,
    lines_box: GtkBox,
    source_text: RefCell<String>,
    rendered: RefCell<Vec<LyricsLine>>,
    halign: Cell<Align>,
}

impl LyricsPane {
    pub fn new() -> Rc<Self> {
        let scroll = ScrolledWindow::new(None::<&gtk::Adjustment>, None::<&gtk::Adjustment>);
        scroll.set_policy(PolicyType::Never, PolicyType::External);
        scroll.style_context().add_class("lyrics-scroll");

        let lines_box = GtkBox::new(Orientation::Vertical, 2);
        lines_box.set_halign(Align::Center);
        lines_box.set_valign(Align::Start);
        lines_box.set_margin_top(16);
        lines_box.set_margin_bottom(40);
        lines_box.set_margin_start(20);
        lines_box.set_margin_end(20);
        scroll.add(&lines_box);

        Rc::new(Self {
            scroll,
            lines_box,
            source_text: RefCell::new(String::new()),
            rendered: RefCell::new(Vec::new()),
            halign: Cell::new(Align::Center),
        })
    }

    pub fn widget(&self) -> &ScrolledWindow {
        &self.scroll
    }

    /// Drop whatever is shown and hold `text` for the next parse.
    pub fn set_text(&self, text: &str) {
        for child in self.lines_box.children() {
            self.lines_box.remove(&child);
        }
        self.rendered.borrow_mut().clear();
        *self.source_text.borrow_mut() = text.to_string();
        self.scroll.vadjustment().set_value(0.0);
    }

    fn line_markup(line: &LyricsLine) -> String {
        if line.is_placeholder() {
            return "<span size='small'>\u{a0}</span>".to_string();
        }
        let escaped = glib::markup_escape_text(&line.text);
        if line.active {
            format!("<span size='medium' weight='bold'>{}</span>", escaped)
        } else {
            format!("<span size='medium'>{}</span>", escaped)
        }
    }
}

impl ScrollSurface for LyricsPane {
    fn scroll_offset(&self) -> f64 {
        self.scroll.vadjustment().value()
    }

    fn set_scroll_offset(&self, offset: f64) {
        self.scroll.vadjustment().set_value(offset);
    }
}

impl LyricsView for LyricsPane {
    fn text_content(&self) -> String {
        let rendered = self.rendered.borrow();
        if rendered.is_empty() {
            self.source_text.borrow().clone()
        } else {
            rendered.iter().map(|line| line.text.as_str()).collect()
        }
    }

    fn rendered_lines(&self) -> Vec<LyricsLine> {
        self.rendered.borrow().clone()
    }

    fn render(&self, lines: &[LyricsLine]) {
        for child in self.lines_box.children() {
            self.lines_box.remove(&child);
        }

        for line in lines {
            let label = Label::new(None);
            label.set_markup(&Self::line_markup(line));
            label.set_line_wrap(true);
            label.set_line_wrap_mode(gtk::pango::WrapMode::WordChar);
            label.set_justify(match self.halign.get() {
                Align::Start => gtk::Justification::Left,
                Align::End => gtk::Justification::Right,
                _ => gtk::Justification::Center,
            });
            label.set_halign(self.halign.get());
            label.set_margin_top(4);
            label.set_margin_bottom(4);
            label
                .style_context()
                .add_class(if line.active { "lyrics-active" } else { "lyrics-dim" });
            self.lines_box.pack_start(&label, false, false, 0);
        }

        if lines.is_empty() {
            self.scroll.hide();
        } else {
            self.scroll.show();
            self.lines_box.show_all();
        }
        *self.rendered.borrow_mut() = lines.to_vec();
    }

    fn set_line_active(&self, index: usize, active: bool) {
        let mut rendered = self.rendered.borrow_mut();
        let Some(line) = rendered.get_mut(index) else {
            return;
        };
        if line.active == active {
            return;
        }
        line.active = active;

        if let Some(child) = self.lines_box.children().get(index) {
            let ctx = child.style_context();
            if active {
                ctx.remove_class("lyrics-dim");
                ctx.add_class("lyrics-active");
            } else {
                ctx.remove_class("lyrics-active");
                ctx.add_class("lyrics-dim");
            }
            if let Some(lbl) = child.downcast_ref::<Label>() {
                lbl.set_markup(&Self::line_markup(line));
            }
        }
    }

    fn line_extent(&self, index: usize) -> Option<(f64, f64)> {
        let children = self.lines_box.children();
        let child = children.get(index)?;
        let alloc = child.allocation();
        let top = alloc.y() as f64;
        Some((top, top + alloc.height() as f64))
    }

    fn apply_view_mode(&self, mode: ViewMode) {
        if let Some(class) = mode.css_class() {
            self.scroll.style_context().add_class(class);
        }
    }

    fn apply_alignment(&self, alignment: &str) {
        let align = match alignment {
            "left" | "start" => Align::Start,
            "right" | "end" => Align::End,
            "center" => Align::Center,
            other => {
                warn!("unknown lyrics alignment {:?}, keeping center", other);
                return;
            }
        };
        self.halign.set(align);
        self.lines_box.set_halign(align);
    }

    fn offset_for_midpoint(&self, midpoint: f64) -> f64 {
        let scroll_h = self.scroll.allocated_height() as f64;
        (midpoint - scroll_h / 2.0).max(0.0)
    }
}

pub struct LyricsWindow {
    window: ApplicationWindow,
    song_title: Label,
    song_artist: Label,
    time_label: Label,
    pane: Rc<LyricsPane>,
    lyrics: Lyrics<LyricsPane, GlibScheduler>,
    time_source: Option<Rc<MpdTimeSource>>,
    config: Config,
}

impl LyricsWindow {
    pub fn new(app: &Application, config: Config) -> Self {
        let window = ApplicationWindow::builder()
            .application(app)
            .title("Lyrics")
            .default_width(380)
            .default_height(650)
            .build();

        Self::load_css();

        let root = GtkBox::new(Orientation::Vertical, 4);
        root.style_context().add_class("lyrics-window");

        let song_title = Label::new(None);
        song_title.style_context().add_class("song-title");
        let song_artist = Label::new(None);
        song_artist.style_context().add_class("song-artist");
        let time_label = Label::new(Some("0:00"));
        time_label.style_context().add_class("time-label");

        root.pack_start(&song_title, false, false, 0);
        root.pack_start(&song_artist, false, false, 0);
        root.pack_start(&time_label, false, false, 0);

        let pane = LyricsPane::new();
        root.pack_start(pane.widget(), true, true, 0);
        window.add(&root);

        if let Some(path) = &config.fixed_file {
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    song_title.set_text(&path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default());
                    pane.set_text(&text);
                }
                Err(err) => warn!("cannot read {}: {}", path.display(), err),
            }
        }

        let time_source = MpdTimeSource::discover(&config.mpd_addr);
        if let Some(source) = &time_source {
            source.start_polling(POLL_INTERVAL);
        }

        let lyrics = Lyrics::new(
            Some(pane.clone()),
            time_source.clone().map(|s| s as Rc<dyn TimeSource>),
            GlibScheduler,
            LyricsOptions::default().view_mode(config.view_mode),
        );

        let lyrics_window = Self {
            window,
            song_title,
            song_artist,
            time_label,
            pane,
            lyrics,
            time_source,
            config,
        };

        lyrics_window.connect_signals();
        lyrics_window.connect_relayout();
        lyrics_window.start_time_label();
        if lyrics_window.config.fixed_file.is_none() {
            lyrics_window.start_song_watch();
        }

        lyrics_window
    }

    /// Arrow keys step through lines, Escape goes back to following playback.
    fn connect_signals(&self) {
        let lyrics = self.lyrics.clone();
        self.window.connect_key_press_event(move |_, event| {
            let key = event.keyval();
            let len = lyrics.lines().len();
            if len == 0 {
                return glib::Propagation::Proceed;
            }
            let current = lyrics
                .selected_line()
                .or_else(|| lyrics.active_lines().first().copied());

            let next = if key == gdk::keys::constants::Down {
                current.map_or(0, |i| (i + 1).min(len - 1))
            } else if key == gdk::keys::constants::Up {
                current.map_or(0, |i| i.saturating_sub(1))
            } else if key == gdk::keys::constants::Escape {
                lyrics.clear_line_selection();
                return glib::Propagation::Stop;
            } else {
                return glib::Propagation::Proceed;
            };

            if lyrics.goto_line(next).is_ok() {
                debug!("selected lyric line {}", next);
            }
            glib::Propagation::Stop
        });
    }

    /// Re-centre the active lines when the viewport changes height.
    fn connect_relayout(&self) {
        let lyrics = self.lyrics.clone();
        let last_height = Cell::new(0);
        self.pane.scroll.connect_size_allocate(move |_, allocation| {
            if allocation.height() != last_height.replace(allocation.height()) {
                lyrics.scroll_to_active();
            }
        });
    }

    fn start_time_label(&self) {
        let Some(source) = self.time_source.clone() else {
            return;
        };
        let time_label = self.time_label.clone();
        let weak = Rc::downgrade(&source);
        source.connect_time_update(Box::new(move || {
            if let Some(source) = weak.upgrade() {
                time_label.set_text(&format_time(source.position()));
            }
        }));
    }

    /// Reload lyrics whenever MPD moves on to another song.
    fn start_song_watch(&self) {
        let Some(source) = &self.time_source else {
            return;
        };
        let mpd = source.client();
        let lyrics = self.lyrics.clone();
        let pane = self.pane.clone();
        let config = self.config.clone();
        let song_title = self.song_title.clone();
        let song_artist = self.song_artist.clone();
        let current_song_file: RefCell<Option<String>> = RefCell::new(None);

        glib::timeout_add_local(SONG_CHECK_INTERVAL, move || {
            let song = match mpd.try_borrow_mut() {
                Ok(mut mpd) => match mpd.current_song() {
                    Ok(song) => song,
                    Err(err) => {
                        debug!("MPD current song failed, keeping lyrics: {:#}", err);
                        return glib::ControlFlow::Continue;
                    }
                },
                Err(_) => return glib::ControlFlow::Continue,
            };

            let file = song.as_ref().map(|s| s.file.clone());
            if file == *current_song_file.borrow() {
                return glib::ControlFlow::Continue;
            }
            *current_song_file.borrow_mut() = file;

            let (title, artist) = match &song {
                Some(song) => (
                    song.title.as_deref().unwrap_or("Unknown"),
                    song.artist.as_deref().unwrap_or("Unknown Artist"),
                ),
                None => ("", ""),
            };
            song_title.set_text(title);
            song_artist.set_text(artist);

            let text = if song.is_some() {
                Self::read_lyrics(&config.lyrics_path(artist, title))
            } else {
                String::new()
            };
            pane.set_text(&text);
            lyrics.parse();
            // The new labels have no allocation until GTK's resize pass, which
            // runs before default-priority idle callbacks.
            let lyrics = lyrics.clone();
            glib::idle_add_local_once(move || lyrics.on_time_update());

            glib::ControlFlow::Continue
        });
    }

    fn read_lyrics(path: &Path) -> String {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                info!("loaded lyrics from {}", path.display());
                text
            }
            Err(err) => {
                debug!("no lyrics at {}: {}", path.display(), err);
                String::new()
            }
        }
    }

    fn load_css() {
        let css_provider = gtk::CssProvider::new();
        let css = include_str!("../style.css");
        if let Err(err) = css_provider.load_from_data(css.as_bytes()) {
            warn!("stylesheet rejected: {}", err);
            return;
        }
        match gdk::Screen::default() {
            Some(screen) => gtk::StyleContext::add_provider_for_screen(
                &screen,
                &css_provider,
                gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
            ),
            None => warn!("no default screen, running unstyled"),
        }
    }

    pub fn show(&self) {
        self.window.show_all();
        if self.lyrics.lines().is_empty() {
            self.pane.widget().hide();
        }
    }
}
