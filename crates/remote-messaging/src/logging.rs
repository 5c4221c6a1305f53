//! Tracing setup for daemon and client processes.
//!
//! `REMOTE_MESSAGING_LOG` selects the level (debug, warn, error; info otherwise).
//! `RUST_LOG` takes precedence when set. `LOG_FORMAT=json` switches to JSON lines.
//! Output goes to stderr so stdout stays free for the host process.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn level_from(value: Option<&str>) -> &'static str {
    match value {
        Some("debug") => "debug",
        Some("trace") => "trace",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        _ => "info",
    }
}

fn default_filter(level: &str) -> String {
    format!("remote_messaging={level}")
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level_from(std::env::var("REMOTE_MESSAGING_LOG").ok().as_deref());
        EnvFilter::new(default_filter(level))
    });

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}
