use chatmetrics::app::App;
use chatmetrics::cli::{Args, ServiceName};
use chatmetrics::config::Config;
use chatmetrics::logging::setup_logging;
use clap::Parser;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Always run all services
    let enabled_services = ServiceName::all();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        enabled_services = ?enabled_services,
        "services configuration loaded"
    );

    // Log application startup context
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting chatmetrics"
    );

    // Create and initialize the application
    let mut app = App::new(config)
        .await
        .expect("Failed to initialize application");

    // Setup services (web, jobs)
    app.setup_services(&enabled_services)
        .expect("Failed to setup services");

    // Start all services and run the application
    app.start_services();
    app.run().await
}
