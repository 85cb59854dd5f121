use std::path::PathBuf;

use clap::Parser;

use aquarians_rs::app::Application;
use aquarians_rs::{config, telemetry};

#[derive(Parser, Debug)]
#[command(name = "aqd", version, about = "Aquarians simulation compute server")]
struct Cli {
    /// Properties file path.
    #[arg(value_name = "PROPERTIES", default_value = config::DEFAULT_PROPERTIES_FILE)]
    properties: PathBuf,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    let config = match config::Config::load(&cli.properties) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error loading properties file: {err}");
            return 1;
        }
    };

    let _telemetry_guard = match telemetry::init(cli.verbose, config.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("error initializing logging: {err}");
            return 1;
        }
    };

    let application = Application::new(config);
    if let Err(err) = application.install_signal_handlers() {
        tracing::error!("error installing signal handlers: {err}");
        return 1;
    }
    if let Err(err) = application.init() {
        tracing::error!("error starting application: {err}");
        application.cleanup();
        return 1;
    }
    tracing::info!("application started");

    application.run();
    application.cleanup();
    tracing::info!("application stopped");
    0
}
