use std::sync::Mutex;

use slog::Drain;
use slog::{Fuse, LevelFilter};
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Discard, Level, Logger};

/// Builds the root logger: JSON lines on stderr, written from a
/// background thread, dropping anything below `level`.
pub fn initialize_logger(level: Level) -> Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = LevelFilter::new(drain, level).fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!("name" => info::NAME, "version" => info::VERSION, "revision" => info::REVISION, "build_timestamp" => info::BUILD_TIMESTAMP),
    )
}

/// Parses a level name such as `"info"` or `"debug"`, falling back to
/// `Level::Info` for anything unrecognized.
pub fn parse_level(name: &str) -> Level {
    name.parse().unwrap_or(Level::Info)
}

/// A logger that swallows everything, for tests and tools that don't
/// need output.
pub fn discard() -> Logger {
    Logger::root(Discard, o!())
}
