use std::fs::File;

use colored::{Color, Colorize};
use log::{Level, LevelFilter};
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

pub const LOG_FILE: &str = "server.log";

/// Installs the global logger writing to stdout and a fresh `server.log`.
///
/// Production keeps `info` and above, development logs everything down to `debug`.
pub fn setup(is_production: bool) -> Result<(), fern::InitError> {
    File::create(LOG_FILE).map_err(fern::InitError::Io)?;

    let level = if is_production {
        LevelFilter::Info
    } else {
        LevelFilter::Debug
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level().to_string().color(level_color(record.level())),
                message
            ))
        })
        .level(level)
        // http client internals drown the request log
        .level_for("hyper", LevelFilter::Off)
        .level_for("hyper_util", LevelFilter::Off)
        .level_for("rustls", LevelFilter::Off)
        .level_for("reqwest", LevelFilter::Info)
        .level_for("sqlx", LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(LOG_FILE)?)
        .apply()?;
    Ok(())
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Magenta,
        Level::Trace => Color::BrightBlack,
    }
}

pub fn middleware() -> LoggerMiddleware {
    LoggerMiddleware::new()
}
