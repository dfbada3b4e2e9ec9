use fusion_gateway_config::log::{LogFormat, LoggingConfig};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub type DynLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// `filter` wins over `level`. An invalid filter falls back to the level alone.
pub fn create_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_new(config.env_filter_str()).unwrap_or_else(|err| {
        eprintln!(
            "invalid log filter \"{}\" ({}), using level \"{}\"",
            config.env_filter_str(),
            err,
            config.level.as_str()
        );
        EnvFilter::new(config.level.as_str())
    })
}

pub fn build_format_layer(format: LogFormat) -> DynLayer<Registry> {
    let timer = UtcTime::rfc_3339();

    match format {
        LogFormat::PrettyTree => tracing_tree::HierarchicalLayer::new(2)
            .with_bracketed_fields(true)
            .with_deferred_spans(false)
            .with_wraparound(25)
            .with_indent_lines(true)
            .with_timer(tracing_tree::time::Uptime::default())
            .with_thread_names(false)
            .with_thread_ids(false)
            .with_targets(false)
            .boxed(),
        LogFormat::Json => fmt::Layer::<Registry>::default()
            .json()
            .with_timer(timer)
            .with_target(false)
            .flatten_event(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::PrettyCompact => fmt::Layer::<Registry>::default()
            .compact()
            .with_timer(timer)
            .with_target(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    }
}

/// Installs the global subscriber. Later calls are ignored.
pub fn configure_logging(config: &LoggingConfig) {
    let filter = create_env_filter(config);
    let layer = build_format_layer(config.format);

    let registry = tracing_subscriber::registry();
    let registry = registry.with(layer).with(filter);

    if registry.try_init().is_err() {
        tracing::debug!("global logger already configured, keeping the existing one");
    }
}
