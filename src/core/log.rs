use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directive used when `RUST_LOG` is unset or unparsable. `--verbose` opens up
/// debug output for this crate and warnings from dependencies.
fn default_directive(verbose: bool) -> &'static str {
    if verbose { "fxconv=debug,warn" } else { "off" }
}

fn build_filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)))
}

/// Installs the global subscriber. Silent by default so command output stays
/// clean.
pub fn init_logging(verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(build_filter(verbose, env.as_deref()))
        .init();
}
