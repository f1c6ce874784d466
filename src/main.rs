mod calculator;
mod config;
mod converter;
mod currency;
mod i18n;
mod rates;
mod refresher;
mod ui;
mod utils;

use gtk::prelude::*;
use gtk::Application;
use log::LevelFilter;

const APP_ID: &str = "com.example.calc_fx";

fn init_logger(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        // HTTP stack chatter
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("rustls", LevelFilter::Warn)
        .format_timestamp_secs()
        .try_init()
        .ok();
}

fn main() -> glib::ExitCode {
    // Load configuration; no file means defaults
    let (config, config_error) = match config::Config::load() {
        Ok(config) => (config, None),
        Err(e) => (config::Config::default(), Some(e.to_string())),
    };

    init_logger(&config.log_level);
    if let Some(e) = config_error {
        log::warn!(
            "ignoring config file {}: {}",
            config::Config::config_path().display(),
            e
        );
    }

    let app = Application::builder()
        .application_id(APP_ID)
        .flags(gio::ApplicationFlags::NON_UNIQUE)
        .build();

    app.connect_activate(move |app| {
        // Check if window already exists
        if let Some(window) = app.active_window() {
            window.present();
            return;
        }

        ui::build_ui(app, config.clone());
    });

    app.run()
}
