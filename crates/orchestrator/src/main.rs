//! `sph2d` command-line runner
//!
//! Usage: `sph2d <config.json>`
//!
//! Loads the configuration, builds the scenario and runs it on a background
//! thread until `max_timesteps` is reached. Progress is logged through
//! `tracing`; set `RUST_LOG` to change the filter.

use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use sph2d_orchestrator::{create_simulation, RunnerState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sph2d=info,sph2d_orchestrator=info,sph2d_kernel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: sph2d <config.json>");
        return ExitCode::from(2);
    };

    let runner = match create_simulation(&config_path) {
        Ok(runner) => runner,
        Err(e) => {
            tracing::error!("Failed to set up simulation: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runner.start();
    while matches!(runner.state(), RunnerState::Running | RunnerState::Paused) {
        thread::sleep(Duration::from_millis(200));
    }

    let state = runner.state();
    let exhaustions = runner.solver_exhaustions();
    if exhaustions > 0 {
        tracing::warn!("{} steps hit the pressure solver's iteration budget", exhaustions);
    }
    let error = runner.error_message();
    if let Err(e) = runner.join() {
        tracing::error!("Simulation thread failed: {}", e);
        return ExitCode::FAILURE;
    }

    match (state, error) {
        (RunnerState::Error, Some(message)) => {
            tracing::error!("Simulation aborted: {}", message);
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}
