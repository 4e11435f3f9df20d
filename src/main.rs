//! Conduit CLI binary

use anyhow::Result;

use conduit::cli::CliApp;

/// Map a `--log-level` value onto a tracing filter level
fn filter_level(level: &str) -> &'static str {
    match level {
        "debug" => "debug",
        "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = CliApp::app().get_matches();

    // Initialize logging
    let level = matches
        .get_one::<String>("log-level")
        .map(|level| filter_level(level))
        .unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!("conduit={level},conduit_catalog={level},conduit_state={level}").into()
                }),
        )
        .with_writer(std::io::stderr)
        .init();

    // Run the CLI application
    CliApp::run(&matches).await
}
