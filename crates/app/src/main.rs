//! Job entry point.

use std::process::ExitCode;

use app::{Config, Driver};
use metrics_exporter_prometheus::PrometheusBuilder;
use pipeline::ConsoleSink;
use store::cassandra_factory;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout only carries the printed pairs.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // No endpoint serves the counters; they are logged when the run ends.
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .inspect_err(|err| tracing::warn!(error = %err, "metrics recorder not installed"))
        .ok();

    let mut driver = Driver::new(cassandra_factory()).with_console(Box::new(ConsoleSink::stdout()));

    let outcome = driver.run(Config::load).await;

    if let Some(handle) = metrics {
        tracing::debug!(metrics = %handle.render(), "final counters");
    }

    match outcome {
        Ok(summary) => {
            tracing::info!(%summary, "word count finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
