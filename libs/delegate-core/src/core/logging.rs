use std::sync::{Once, OnceLock};

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, Builder},
};
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, Layer as _};

static INIT_LOG: Once = Once::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global tracing subscriber once per process.
///
/// `RUST_LOG` takes precedence over `filter`. With `log_path` set, output is
/// also written to a daily rolling file in that directory; a file appender
/// that cannot be created is reported on the terminal and skipped.
pub fn log_init(filter: String, log_path: Option<String>, terminal: bool) {
    INIT_LOG.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| filter.into());

        let terminal_layer = terminal.then(|| {
            Layer::new()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .boxed()
        });

        let mut file_error = None;
        let file_layer = log_path.and_then(|directory| {
            match Builder::new()
                .rotation(rolling::Rotation::DAILY)
                .filename_prefix("multicast-delegate")
                .filename_suffix("log")
                .build(&directory)
            {
                Ok(appender) => {
                    let (writer, guard) = tracing_appender::non_blocking(appender);
                    // Keep the worker alive for the program lifetime
                    let _ = LOG_GUARD.set(guard);
                    Some(Layer::new().with_writer(writer).with_ansi(false).boxed())
                }
                Err(err) => {
                    file_error = Some(format!("{}: {}", directory, err));
                    None
                }
            }
        });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(terminal_layer)
            .with(file_layer)
            .init();

        if let Some(err) = file_error {
            tracing::warn!("Failed to open log file appender {}", err);
        }
    });
}

/// Default initialize tracing log.
///
/// Must also import [`delegate_core::core::logging::log_init`] function.
///
/// ## Using
/// ```rust
/// use delegate_core::{core::logging::log_init, init_log};
///
/// init_log!();
/// tracing::info!("Installed proxy on {}", "table view");
/// tracing::debug!("Listeners: {}", 3);
/// ```
///
/// # Configuring
/// Standard `RUST_LOG` environment variable can be used to configure, e.g.:
///
/// ```bash
/// export RUST_LOG="delegate_core=trace"
/// ```
///
/// For more details check [Logging Directives Documentation](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html#directives)
#[macro_export]
macro_rules! init_log {
    () => {
        log_init(format!("{}=info", env!("CARGO_CRATE_NAME")), None, true);
    };
    ($log_path:expr) => {
        log_init(format!("{}=info", env!("CARGO_CRATE_NAME")), $log_path, true);
    };
}
