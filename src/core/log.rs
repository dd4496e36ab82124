use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Picks the global filter. A parsable `rust_log` wins outright; otherwise only this crate logs
/// at `level` and warp is capped at INFO.
pub fn filter_layer<S>(
    level: LevelFilter,
    rust_log: Option<&str>,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber,
{
    let env_filter = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok());
    match env_filter {
        Some(filter) => filter.boxed(),
        None => Targets::new()
            .with_target("folioboard", level)
            .with_target("warp", level.min(LevelFilter::INFO))
            .boxed(),
    }
}

/// Installs the global subscriber. Output goes to stderr so tables printed on stdout stay
/// readable.
pub fn init_logging(level: LevelFilter) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(filter_layer(level, rust_log.as_deref()))
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}
