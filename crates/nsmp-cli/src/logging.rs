use std::io;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Crates whose events are shown by default.
const CRATES: [&str; 5] = ["nsmp", "nsmp_cox", "nsmp_bayes", "nsmp_training", "nsmp_stats"];

const DEFAULT_LEVEL: &str = "info";

/// Installs the stderr subscriber.
///
/// An explicit `level` wins over `RUST_LOG`; without either, workspace
/// crates log at `info`.
pub fn init(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(directives(level)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(directives(DEFAULT_LEVEL))),
    };
    let fmt_layer = fmt::layer().with_writer(io::stderr).with_target(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_cover_workspace_crates() {
        assert_eq!(
            directives("debug"),
            "nsmp=debug,nsmp_cox=debug,nsmp_bayes=debug,nsmp_training=debug,nsmp_stats=debug"
        );
    }
}
