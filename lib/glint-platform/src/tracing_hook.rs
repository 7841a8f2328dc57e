use std::{
    fs::File,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};
use tracing_error::ErrorLayer;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, EnvFilter, Layer};

/// Default JSON log location, relative to the working directory.
pub const LOG_FILE: &str = "log.jsonl";

/// Environment variable overriding the JSON log location. An empty value disables the JSON log.
pub const LOG_FILE_ENV: &str = "GLINT_LOG_FILE";

/// JSON log location: `GLINT_LOG_FILE` when set, `fallback` otherwise.
pub fn log_file_from_env(fallback: Option<&Path>) -> Option<PathBuf> {
    match std::env::var_os(LOG_FILE_ENV) {
        Some(value) if value.is_empty() => None,
        Some(value) => Some(PathBuf::from(value)),
        None => fallback.map(Path::to_path_buf),
    }
}

/// Installs `color-eyre` and the global subscriber.
///
/// Console output is filtered by `RUST_LOG`. When `log_file` is given, every event and span enter/exit
/// is also written there as JSON lines. The file is created before anything global is installed, so a
/// bad path leaves the process untouched.
pub fn enable(log_file: Option<&Path>) -> Result<()> {
    let writer = log_file
        .map(|path| {
            File::create(path).with_context(|| format!("Cannot create log file {}", path.display()))
        })
        .transpose()?;
    let json_layer = writer.map(|writer| {
        tracing_subscriber::fmt::Layer::default()
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
            .with_writer(writer)
    });
    let console_layer =
        tracing_subscriber::fmt::Layer::default().with_filter(EnvFilter::from_default_env());

    color_eyre::install()?;
    let registry = tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(console_layer)
        .with(json_layer);
    #[cfg(feature = "tracy")]
    let registry = registry.with(tracing_tracy::TracyLayer::new());
    registry
        .try_init()
        .context("A global tracing subscriber is already installed")?;
    Ok(())
}
