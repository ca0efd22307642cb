//! Log output setup for binaries and tests.
//!
//! The library only emits `tracing` events; nothing is printed until a
//! subscriber is installed. These helpers install a `tracing-subscriber`
//! fmt subscriber filtered by level.

use tracing_subscriber::EnvFilter;

/// Level directive read by [`init_from_env`].
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// When `true`, [`init_from_env`] logs at `debug` whatever `LOG_LEVEL` says.
pub const ENV_DEBUG: &str = "DEBUG";

const DEFAULT_LEVEL: &str = "info";

/// Installs a subscriber logging at `level`, which may be any `EnvFilter`
/// directive such as `"warn"` or `"protodoc_codec=debug"`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|err| {
        eprintln!("invalid log level {level:?} ({err}), using {DEFAULT_LEVEL}");
        EnvFilter::new(DEFAULT_LEVEL)
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// [`init`] with the level taken from `LOG_LEVEL` and `DEBUG`.
pub fn init_from_env() -> bool {
    init(&level_from_lookup(|key| std::env::var(key).ok()))
}

fn level_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> String {
    let debug = lookup(ENV_DEBUG).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    if debug {
        return "debug".to_owned();
    }
    lookup(ENV_LOG_LEVEL)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_owned())
}
