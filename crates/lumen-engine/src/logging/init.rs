use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` takes `env_logger` directives (e.g. "warn", "lumen_engine=debug,naga=off") and
/// overrides `RUST_LOG`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,

    /// Log every render loop stage transition and uniform write (`lumen_engine::render` at
    /// trace). Very noisy: several lines per frame.
    pub frame_trace: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            frame_trace: false,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        builder(&config).init();
        log::debug!("logging initialized");
    });
}

fn builder(config: &LoggingConfig) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();

    match config.env_filter.clone().or_else(|| std::env::var("RUST_LOG").ok()) {
        Some(filter) => {
            builder.parse_filters(&filter);
        }
        None => {
            builder
                .filter_level(log::LevelFilter::Info)
                // wgpu logs every resource creation at info.
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn)
                .filter_module("naga", log::LevelFilter::Warn);
        }
    }

    if config.frame_trace {
        builder.filter_module("lumen_engine::render", log::LevelFilter::Trace);
    }

    builder.write_style(config.write_style);
    builder
}
