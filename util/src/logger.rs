//! Session logger
//!
//! Every Kibo executable logs to stdout and to `<exec_name>.log` in its session directory. Lines
//! are stamped with the seconds elapsed since the session epoch, debug and trace lines also carry
//! the module they came from.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised while starting the session logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Minimum log level must include INFO, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger is already installed: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Start logging for the executable owning `session`.
///
/// `min_level` must be `Info` or more verbose, the session banner is written at `Info`. Only one
/// logger can be installed per process.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    check_min_level(min_level)?;

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {}",
                prefix(session::get_elapsed_seconds(), record),
                message
            ))
        })
        .level(min_level)
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Kibo {} session started", session.exec_name);
    if let Some(epoch) = session::get_epoch() {
        info!("    epoch:   {}", epoch);
    }
    info!("    level:   {:?}", min_level);
    info!("    session: {:?}", session.session_root);
    info!("    archive: {:?}", session.arch_root);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_min_level(min_level: LevelFilter) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        Err(LoggerInitError::InvalidMinLogLevel(min_level))
    } else {
        Ok(())
    }
}

/// Line prefix, `[elapsed LVL]` with the record's target appended below `Info`.
fn prefix(elapsed_s: f64, record: &Record) -> String {
    let stamp = format!("[{:10.6} {}]", elapsed_s, level_tag(record.level()));

    if record.level() > Level::Info {
        format!("{} {}:", stamp, record.target())
    } else {
        stamp
    }
}

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}
