//! Runtime configuration for the session engine.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default and an environment override so
//! deployments can tune behavior without a rebuild. Values are read once
//! at construction; engines copy what they need.

use std::time::Duration;

/// Typing-presence entries expire this long after the last typing event.
/// The upstream protocol relies solely on explicit stop-typing, which
/// leaks entries when a client crashes; the TTL sweep is the fix.
const DEFAULT_TYPING_TTL_MS: u64 = 5_000;

const DEFAULT_PUBLISH_RETRY_LIMIT: u32 = 5;
const DEFAULT_PUBLISH_BACKOFF_INITIAL_MS: u64 = 250;
const DEFAULT_PUBLISH_BACKOFF_MAX_MS: u64 = 4_000;

const DEFAULT_CANVAS_WIDTH: u32 = 800;
const DEFAULT_CANVAS_HEIGHT: u32 = 500;

/// Default stroke color when the caller does not pick one.
pub const DEFAULT_STROKE_COLOR: &str = "#000000";

/// Default stroke width in canvas pixels.
pub const DEFAULT_STROKE_WIDTH: f64 = 3.0;

/// Engine-wide tunables, read from the environment once at startup.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// How long a typing-presence entry lives without a refresh.
    pub typing_ttl: Duration,
    /// Maximum publish attempts before an event is dropped.
    pub publish_retry_limit: u32,
    /// First retry delay; doubles per attempt.
    pub publish_backoff_initial: Duration,
    /// Ceiling for the retry delay.
    pub publish_backoff_max: Duration,
    /// Whiteboard raster width in pixels.
    pub canvas_width: u32,
    /// Whiteboard raster height in pixels.
    pub canvas_height: u32,
}

impl Config {
    /// Build a config from environment variables, falling back to defaults
    /// for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            typing_ttl: Duration::from_millis(env_parse("ROOMSYNC_TYPING_TTL_MS", DEFAULT_TYPING_TTL_MS)),
            publish_retry_limit: env_parse("ROOMSYNC_PUBLISH_RETRY_LIMIT", DEFAULT_PUBLISH_RETRY_LIMIT),
            publish_backoff_initial: Duration::from_millis(env_parse(
                "ROOMSYNC_PUBLISH_BACKOFF_INITIAL_MS",
                DEFAULT_PUBLISH_BACKOFF_INITIAL_MS,
            )),
            publish_backoff_max: Duration::from_millis(env_parse(
                "ROOMSYNC_PUBLISH_BACKOFF_MAX_MS",
                DEFAULT_PUBLISH_BACKOFF_MAX_MS,
            )),
            canvas_width: env_parse("ROOMSYNC_CANVAS_WIDTH", DEFAULT_CANVAS_WIDTH),
            canvas_height: env_parse("ROOMSYNC_CANVAS_HEIGHT", DEFAULT_CANVAS_HEIGHT),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            typing_ttl: Duration::from_millis(DEFAULT_TYPING_TTL_MS),
            publish_retry_limit: DEFAULT_PUBLISH_RETRY_LIMIT,
            publish_backoff_initial: Duration::from_millis(DEFAULT_PUBLISH_BACKOFF_INITIAL_MS),
            publish_backoff_max: Duration::from_millis(DEFAULT_PUBLISH_BACKOFF_MAX_MS),
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
