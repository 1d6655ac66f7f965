// Console logging via tracing; RUST_LOG overrides the CLI level when set
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("warn,crossover_optimizer={level}")))
        .unwrap_or_else(|_| EnvFilter::new("warn,crossover_optimizer=info"));

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // try_init: tests and embedders may have installed a subscriber already
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
