//! Outlier report - joins two database tables and reports IQR outliers.

use outlier_report::chart::ChartMode;
use outlier_report::cli::Cli;
use outlier_report::config::Config;
use outlier_report::error::Result;
use outlier_report::{logging, pipeline};
use std::io;
use tracing::{error, info};

fn main() {
    logging::init_stderr_logging();

    let (config, chart_mode) = match load() {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let status = runtime.block_on(pipeline::run(&config, chart_mode, &mut io::stdout()));
    std::process::exit(status.exit_code());
}

/// Resolves the configuration: defaults, then config file, then CLI.
fn load() -> Result<(Config, ChartMode)> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_to(&mut config)?;

    Ok((config, cli.chart))
}
