//! Simulation runner with lifecycle management
//!
//! This module provides the `SimulationRunner` which owns a [`Simulation`] on
//! a background thread and drives it with a fixed time step. The control
//! handle can start, pause, resume and stop the run, and read progress,
//! the last step report and a particle snapshot for a renderer.

use sph2d_kernel::{Diagnostics, Particle, Simulation, SolveStatus, StepReport};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Runner state enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Simulation created but not yet started
    Created,
    /// Simulation actively running
    Running,
    /// Simulation paused
    Paused,
    /// Simulation finished (reached max_timesteps or stopped)
    Finished,
    /// A step failed; see [`SimulationRunner::error_message`]
    Error,
}

/// Fixed run parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    /// Time step passed to every `Simulation::step`
    pub time_step: f32,
    /// Stop after this many timesteps
    pub max_timesteps: Option<u64>,
    /// Log diagnostics every this many timesteps
    pub log_every: u64,
}

/// Shared state between the runner thread and control interface
struct SharedState {
    state: RunnerState,
    sim_time: f64,
    timestep_count: u64,
    error_message: Option<String>,
    last_report: Option<StepReport>,
    diagnostics: Option<Diagnostics>,
    solver_exhaustions: u64,
    /// Particles after the last completed step
    snapshot: Arc<Vec<Particle>>,
}

fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for controlling and querying a running simulation
pub struct SimulationRunner {
    /// Shared state (protected by mutex)
    shared: Arc<Mutex<SharedState>>,
    /// Handle to the background thread
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulationRunner {
    /// Create a new simulation runner around `simulation`
    ///
    /// The background thread is spawned immediately but waits for
    /// [`start`](Self::start).
    pub fn new(simulation: Simulation, settings: RunSettings) -> Self {
        let shared = Arc::new(Mutex::new(SharedState {
            state: RunnerState::Created,
            sim_time: 0.0,
            timestep_count: 0,
            error_message: None,
            last_report: None,
            diagnostics: None,
            solver_exhaustions: 0,
            snapshot: Arc::new(simulation.particles().to_vec()),
        }));

        let shared_clone = Arc::clone(&shared);

        // Spawn background thread
        let thread_handle = thread::spawn(move || {
            run_simulation_loop(simulation, shared_clone, settings);
        });

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Get current runner state
    pub fn state(&self) -> RunnerState {
        lock(&self.shared).state.clone()
    }

    /// Get current simulation time
    pub fn sim_time(&self) -> f64 {
        lock(&self.shared).sim_time
    }

    /// Get current timestep count
    pub fn timestep_count(&self) -> u64 {
        lock(&self.shared).timestep_count
    }

    /// Get error message if state is Error
    pub fn error_message(&self) -> Option<String> {
        lock(&self.shared).error_message.clone()
    }

    /// Report of the last completed step
    pub fn last_report(&self) -> Option<StepReport> {
        lock(&self.shared).last_report
    }

    /// Diagnostics after the last completed step
    pub fn diagnostics(&self) -> Option<Diagnostics> {
        lock(&self.shared).diagnostics
    }

    /// Number of steps whose pressure solve ran out of iterations
    pub fn solver_exhaustions(&self) -> u64 {
        lock(&self.shared).solver_exhaustions
    }

    /// Read-only copy of the particles after the last completed step
    pub fn snapshot(&self) -> Arc<Vec<Particle>> {
        Arc::clone(&lock(&self.shared).snapshot)
    }

    /// Pause the simulation
    pub fn pause(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Running {
            state.state = RunnerState::Paused;
        }
    }

    /// Resume the simulation
    pub fn resume(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Paused {
            state.state = RunnerState::Running;
        }
    }

    /// Start the simulation (transition from Created to Running)
    pub fn start(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Created {
            state.state = RunnerState::Running;
        }
    }

    /// Stop the simulation after the current step
    pub fn stop(&self) {
        let mut state = lock(&self.shared);
        if matches!(
            state.state,
            RunnerState::Created | RunnerState::Running | RunnerState::Paused
        ) {
            state.state = RunnerState::Finished;
        }
    }

    /// Wait for the simulation thread to complete
    pub fn join(mut self) -> Result<(), String> {
        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| "Thread panicked".to_string())?;
        }
        Ok(())
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // Signal the thread to exit
        self.stop();
    }
}

/// Main simulation loop executed in background thread
fn run_simulation_loop(
    mut simulation: Simulation,
    shared: Arc<Mutex<SharedState>>,
    settings: RunSettings,
) {
    // Wait for start signal
    loop {
        let state = lock(&shared).state.clone();
        match state {
            RunnerState::Created | RunnerState::Paused => thread::sleep(Duration::from_millis(10)),
            RunnerState::Running => break,
            RunnerState::Finished | RunnerState::Error => return,
        }
    }

    let start_wall_time = Instant::now();
    let dt = settings.time_step;
    let mut sim_time = 0.0_f64;

    loop {
        let current_state = lock(&shared).state.clone();
        match current_state {
            RunnerState::Running => {}
            RunnerState::Paused => {
                thread::sleep(Duration::from_millis(20));
                continue;
            }
            RunnerState::Finished | RunnerState::Error | RunnerState::Created => break,
        }

        let report = match simulation.step(dt) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Simulation step failed: {}", e);
                let mut guard = lock(&shared);
                guard.state = RunnerState::Error;
                guard.error_message = Some(e.to_string());
                guard.timestep_count = simulation.step_count();
                guard.snapshot = Arc::new(simulation.particles().to_vec());
                break;
            }
        };
        sim_time += dt as f64;

        if report.solve.status == SolveStatus::BudgetExhausted {
            tracing::warn!(
                step = report.step,
                iterations = report.solve.iterations,
                mean_error = report.solve.mean_error,
                "Pressure solve did not converge"
            );
        }

        let diagnostics = simulation.diagnostics(dt);
        if settings.log_every > 0 && report.step % settings.log_every == 0 {
            let wall_time = start_wall_time.elapsed().as_secs_f64();
            tracing::info!(
                "Step {}: sim_time={:.4}, avg_density={:.5}, max_density_error={:.5}, \
                 cfl={:.3}, solver_iterations={}, wall_time={:.2}s",
                report.step,
                sim_time,
                diagnostics.average_density,
                diagnostics.max_density_error,
                diagnostics.cfl_number,
                report.solve.iterations,
                wall_time,
            );
        }

        // Publish progress
        let finished = settings
            .max_timesteps
            .is_some_and(|max_steps| report.step >= max_steps);
        {
            let mut guard = lock(&shared);
            guard.sim_time = sim_time;
            guard.timestep_count = report.step;
            guard.last_report = Some(report);
            guard.diagnostics = Some(diagnostics);
            if report.solve.status == SolveStatus::BudgetExhausted {
                guard.solver_exhaustions += 1;
            }
            guard.snapshot = Arc::new(simulation.particles().to_vec());
            if finished {
                guard.state = RunnerState::Finished;
            }
        }

        if finished {
            tracing::info!("Simulation finished: reached max_timesteps = {}", report.step);
            break;
        }
    }

    tracing::info!(
        "Simulation thread exiting: {} timesteps, {:.4} simulated, {:.2}s wall time",
        simulation.step_count(),
        sim_time,
        start_wall_time.elapsed().as_secs_f64()
    );
}
