use tracing_subscriber::{fmt, EnvFilter};

fn builder() -> fmt::SubscriberBuilder<fmt::format::DefaultFields, fmt::format::Format, EnvFilter> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
}

/// Installs the global subscriber. Panics if one is already set.
pub fn init() {
    builder().init();
}

/// Installs the global subscriber unless one is already set.
pub fn try_init() -> bool {
    builder().try_init().is_ok()
}
