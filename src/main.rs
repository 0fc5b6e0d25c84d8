//! `tw` binary: parse the command line, set up logging and the runtime,
//! then hand over to the chosen front end.

use std::sync::Arc;

use clap::Parser;
use tokio::runtime::Runtime;

use taskweather::cli::Cli;
use taskweather::cmd::*;
use taskweather::config::WeatherConfig;
use taskweather::logging;
use taskweather::session::AppState;
use taskweather::weather::{OpenWeatherClient, WeatherCache};

fn build_state(config: &WeatherConfig, runtime: &Runtime) -> AppState {
    let provider = Arc::new(OpenWeatherClient::new(config));
    AppState::new(WeatherCache::new(provider, config, runtime.handle().clone()))
}

fn main() {
    let cli = Cli::parse();

    // Completions need neither logging nor a runtime
    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    let quiet = matches!(cli.command, Commands::Ui { .. });
    if let Err(e) = logging::init(&cli.log_level, cli.log_file.as_deref(), quiet) {
        eprintln!("Failed to open log file: {e}");
        std::process::exit(1);
    }

    let config = match cli.weather_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    if config.api_key.is_none() {
        tracing::warn!("no OpenWeatherMap API key; outdoor tasks will show weather as unavailable");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Weather { location } => cmd_weather(&config, &runtime, &location),
        Commands::Shell { user } => {
            let mut state = build_state(&config, &runtime);
            cmd_shell(&mut state, &runtime, user);
        }
        Commands::Ui { user } => {
            let mut state = build_state(&config, &runtime);
            cmd_ui(&mut state, user);
        }
    }
}
