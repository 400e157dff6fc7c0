/// Tracing setup for processes that host the engine and its sweeper
///
/// Reads `RUST_LOG` for filtering (default: `brandai_worker=debug,brandai_shared=info`)
/// and `BRANDAI_LOG_FORMAT=json` for JSON log lines.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "brandai_worker=debug,brandai_shared=info";

/// Loads `.env` if present and installs the global subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init() -> anyhow::Result<()> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_FILTER.into()),
    );

    // BRANDAI_LOG_FORMAT=json for log shippers
    let installed = if json_requested() {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

fn json_requested() -> bool {
    std::env::var("BRANDAI_LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_only_once() {
        // Another test may have installed one first; the second call must fail either way
        let _ = init();
        assert!(init().is_err());
    }
}
