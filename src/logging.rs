use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

const LOG_FILE_PREFIX: &str = "regionpulse.log";

/// Filter used when `RUST_LOG` is unset.
fn default_directives(config: &AppConfig) -> &'static str {
    if config.is_development() {
        "debug,sqlx::query=warn,hyper=info,reqwest=info"
    } else {
        "info,sqlx::query=warn"
    }
}

/// Installs the global subscriber: JSON lines into a daily file under
/// `log_dir`, plus stdout (pretty in development, JSON elsewhere so log
/// shippers can parse it).
///
/// The returned guard flushes the file writer on drop and must live as long
/// as the process.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::daily(&config.log_dir, LOG_FILE_PREFIX));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .json();

    let development = config.is_development();
    let pretty_stdout = development.then(|| fmt::layer().with_writer(std::io::stdout));
    let json_stdout = (!development).then(|| fmt::layer().with_writer(std::io::stdout).json());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(pretty_stdout)
        .with(json_stdout)
        .init();

    guard
}
