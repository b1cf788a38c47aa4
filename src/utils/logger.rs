use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "testmodule=debug,info"
    } else {
        "testmodule=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn base_layer<S>() -> fmt::Layer<S> {
    fmt::layer().with_target(false).with_file(false).with_line_number(false)
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(base_layer().compact())
        .init();
}

/// JSON lines on stderr, for build tools that scrape diagnostics.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(base_layer().with_writer(std::io::stderr).json())
        .init();
}
