use gtk::prelude::*;
use gtk::Application;

mod config;
mod mpd_client;
mod ui;

use config::Config;
use ui::LyricsWindow;

const APP_ID: &str = "com.lyricsync.viewer";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::from_env()?;

    let app = Application::builder()
        .application_id(APP_ID)
        .build();

    app.connect_activate(move |app| build_ui(app, config.clone()));
    // The lyrics file argument is ours, keep GTK from treating it as a file to open.
    app.run_with_args::<&str>(&[]);
    Ok(())
}

fn build_ui(app: &Application, config: Config) {
    let window = LyricsWindow::new(app, config);
    window.show();
}
