use std::sync::Once;

static INIT: Once = Once::new();

/// Builds the logger. `rust_log` follows the `env_logger` filter syntax
/// (e.g. "debug", "indexed_quad=trace,wgpu_core=warn"); without it the
/// default is info.
fn builder(rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();

    match rust_log {
        Some(filter) => {
            builder.parse_filters(filter);
        }
        None => {
            // wgpu is chatty at info.
            builder
                .filter_level(log::LevelFilter::Info)
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn);
        }
    }

    builder
}

/// Initializes the global logger once from `RUST_LOG`. Later calls are ignored.
pub fn init_logging() {
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        builder(rust_log.as_deref()).init();

        log::debug!("logging initialized");
    });
}
