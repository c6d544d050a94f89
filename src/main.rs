//! speech-relay - routes speech synthesis and audio storage requests received over a Unix socket.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use speech_relay::config::Settings;
use speech_relay::router::Router;
use speech_relay::socket::SocketListener;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

const DEFAULT_CONFIG_PATH: &str = "/etc/speech-relay/relay.toml";

/// Time allowed for in-flight connections after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Help,
    Version,
    Serve { config: PathBuf },
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut config = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "-V" | "--version" => return Ok(Invocation::Version),
            "-c" | "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a path", arg))?;
                config = PathBuf::from(path);
            }
            other => match other.strip_prefix("--config=") {
                Some(path) => config = PathBuf::from(path),
                None => return Err(format!("unrecognized argument '{}'", other)),
            },
        }
    }

    Ok(Invocation::Serve { config })
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let config_path = match parse_args(&args) {
        Ok(Invocation::Help) => {
            print_help();
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Version) => {
            println!("{} {}", NAME, VERSION);
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Serve { config }) => config,
        Err(message) => {
            eprintln!("{}: {}", NAME, message);
            eprintln!("Try '{} --help' for usage.", NAME);
            return ExitCode::from(2);
        }
    };

    let settings = match Settings::load(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);
    info!(
        version = VERSION,
        config = %config_path.display(),
        socket = %settings.socket.path.display(),
        bucket = %settings.storage.bucket,
        "Starting {}",
        NAME
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = runtime.block_on(serve(settings)) {
        error!(error = %e, "Relay failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let router = Arc::new(Router::from_settings(&settings)?);
    let listener = SocketListener::bind(Arc::new(settings), router).await?;
    let shutdown = Arc::new(Notify::new());

    tokio::select! {
        result = listener.run(Arc::clone(&shutdown)) => result?,
        _ = shutdown_signal() => {
            shutdown.notify_waiters();
            info!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "Draining connections");
            if tokio::time::timeout(DRAIN_TIMEOUT, listener.wait_for_drain()).await.is_err() {
                warn!(
                    active = listener.metrics().active(),
                    "Drain timed out, abandoning remaining connections"
                );
            }
        }
    }

    let metrics = listener.metrics();
    info!(
        connections = metrics.total_connections(),
        failed = metrics.failed_connections(),
        "Relay stopped"
    );
    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => info!("SIGINT received"),
        _ = terminate => info!("SIGTERM received"),
    }
}

fn print_help() {
    println!(
        r#"{name} {version}
Routes speech synthesis and audio storage requests received over a Unix socket.

USAGE:
    {name} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {config}]
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        name = NAME,
        version = VERSION,
        config = DEFAULT_CONFIG_PATH
    );
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if settings.logging.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("speech-relay")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(
            parse_args(&args(&[])),
            Ok(Invocation::Serve {
                config: PathBuf::from(DEFAULT_CONFIG_PATH)
            })
        );
    }

    #[test]
    fn test_config_flag_forms() {
        let expected = Ok(Invocation::Serve {
            config: PathBuf::from("/tmp/relay.toml"),
        });
        assert_eq!(parse_args(&args(&["-c", "/tmp/relay.toml"])), expected);
        assert_eq!(parse_args(&args(&["--config", "/tmp/relay.toml"])), expected);
        assert_eq!(parse_args(&args(&["--config=/tmp/relay.toml"])), expected);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_args(&args(&["-h"])), Ok(Invocation::Help));
        assert_eq!(parse_args(&args(&["-c", "x", "--version"])), Ok(Invocation::Version));
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse_args(&args(&["--config"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }
}
