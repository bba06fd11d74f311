//! Utilities: logging setup.
//!
//! Logs always go to stderr; in `serve` mode stdout is the MCP channel.
//!
//! Key items:
//!   derive_level (-v / -vv / -q -> level)
//!   init_logging (tracing-subscriber, RUST_LOG overrides)

pub mod logging {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::EnvFilter;

    pub fn derive_level(verbose: u8, quiet: bool) -> LevelFilter {
        if quiet {
            return LevelFilter::ERROR;
        }
        match verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Default filter: our crate at `level`, dependencies at warn (or quieter).
    pub fn default_directives(level: LevelFilter) -> String {
        let deps = level.min(LevelFilter::WARN);
        format!("{deps},{}={level}", env!("CARGO_CRATE_NAME")).to_lowercase()
    }

    pub fn init_logging(level: LevelFilter) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
        // A second init (tests) keeps the first subscriber.
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

}

pub use logging::{derive_level, init_logging};
