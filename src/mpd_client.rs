use anyhow::{Context, Result};
use log::{debug, warn};
use lyricsync::{Seconds, TimeSource};
use mpd::{Client, Song, Status};
use std::cell::{Cell, RefCell};
use std::net::TcpStream;
use std::rc::Rc;
use std::time::Duration;

pub struct MPDClient {
    client: Client<TcpStream>,
}

impl MPDClient {
    pub fn connect(addr: &str) -> Result<Self> {
        let client = Client::connect(addr).with_context(|| format!("connecting to MPD at {}", addr))?;
        Ok(Self { client })
    }

    pub fn status(&mut self) -> Result<Status> {
        Ok(self.client.status()?)
    }

    pub fn current_song(&mut self) -> Result<Option<Song>> {
        Ok(self.client.currentsong()?)
    }
}

pub fn format_time(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{}:{:02}", mins, secs)
}

/// A paused player reports the same `elapsed` on every poll; only the first
/// reading and actual movement are worth a notification.
fn position_moved(previous: Option<Seconds>, polled: Seconds) -> bool {
    previous != Some(polled)
}

/// Playback clock backed by MPD's `elapsed` status field, polled on the glib
/// main loop. Listeners fire whenever the polled position moves.
pub struct MpdTimeSource {
    client: Rc<RefCell<MPDClient>>,
    /// `None` until the first successful poll.
    position: Cell<Option<Seconds>>,
    listeners: RefCell<Vec<Box<dyn Fn()>>>,
}

impl MpdTimeSource {
    /// Connect to the configured server. `None` means lyrics run without a clock.
    pub fn discover(addr: &str) -> Option<Rc<Self>> {
        match MPDClient::connect(addr) {
            Ok(client) => Some(Rc::new(Self {
                client: Rc::new(RefCell::new(client)),
                position: Cell::new(None),
                listeners: RefCell::new(Vec::new()),
            })),
            Err(err) => {
                warn!("no playback clock: {:#}", err);
                None
            }
        }
    }

    pub fn client(&self) -> Rc<RefCell<MPDClient>> {
        self.client.clone()
    }

    pub fn start_polling(self: &Rc<Self>, interval: Duration) {
        let weak = Rc::downgrade(self);
        glib::timeout_add_local(interval, move || match weak.upgrade() {
            Some(source) => {
                source.poll();
                glib::ControlFlow::Continue
            }
            None => glib::ControlFlow::Break,
        });
    }

    fn poll(&self) {
        let elapsed = {
            let Ok(mut mpd) = self.client.try_borrow_mut() else {
                return;
            };
            match mpd.status() {
                Ok(status) => status.elapsed.map(|e| e.as_secs_f64()),
                Err(err) => {
                    debug!("MPD status failed: {:#}", err);
                    return;
                }
            }
        };

        let position = elapsed.unwrap_or(0.0);
        if !position_moved(self.position.replace(Some(position)), position) {
            return;
        }

        for listener in self.listeners.borrow().iter() {
            listener();
        }
    }
}

impl TimeSource for MpdTimeSource {
    fn position(&self) -> Seconds {
        self.position.get().unwrap_or(0.0)
    }

    fn connect_time_update(&self, callback: Box<dyn Fn()>) {
        self.listeners.borrow_mut().push(callback);
    }
}
