// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tick-based execution of a graph.
//!
//! This module handles:
//! - Starting and stopping the periodic timer
//! - Running ticks synchronously with `run_step`
//! - Dispatching lifecycle events in execution order
//! - Containing node errors according to the [`ErrorPolicy`]

use crate::error::ExecutionError;
use crate::graph::Graph;
use crate::node::{NodeId, NodeMode};
use crate::settings::ErrorPolicy;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Not ticking
    #[default]
    Stopped,
    /// Timer armed
    Running,
}

/// Lifecycle event dispatched to every node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Scheduler started
    Start,
    /// Scheduler stopped
    Stop,
    /// One tick
    Execute,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "on_start",
            Self::Stop => "on_stop",
            Self::Execute => "on_execute",
        })
    }
}

/// Timing bookkeeping of the scheduler
#[derive(Debug, Clone, Default)]
pub(crate) struct Clock {
    state: RunState,
    interval: Duration,
    started_at: Option<Instant>,
    fixed_time: f64,
    last_execution_time: Duration,
    errors_in_execution: bool,
}

const MIN_EXECUTION_TIME: Duration = Duration::from_millis(1);

impl Graph {
    /// Start the scheduler and arm the timer with the given interval.
    ///
    /// Does nothing if already running. Fires `on_start` on every node in
    /// execution order; ticks are then driven by [`Graph::run`].
    pub fn start(&mut self, interval: Duration) -> Result<(), ExecutionError> {
        if self.clock.state == RunState::Running {
            return Ok(());
        }

        self.clock.state = RunState::Running;
        self.clock.interval = interval.max(MIN_EXECUTION_TIME);
        self.clock.started_at = Some(Instant::now());
        tracing::info!(
            graph = %self.name,
            interval_ms = self.clock.interval.as_millis() as u64,
            "Graph execution started"
        );
        for observer in self.observers() {
            observer.running_changed(true);
        }

        match self.dispatch(LifecycleEvent::Start) {
            Ok(()) => Ok(()),
            Err(err) => self.contain(err),
        }
    }

    /// Stop the scheduler. Does nothing if already stopped.
    ///
    /// A tick already in progress is never interrupted.
    pub fn stop(&mut self) {
        if self.clock.state == RunState::Stopped {
            return;
        }

        self.clock.state = RunState::Stopped;
        if let Err(err) = self.dispatch(LifecycleEvent::Stop) {
            self.clock.errors_in_execution = true;
            tracing::error!(node = %err.node, "Error while stopping: {}", err.source);
        }
        for observer in self.observers() {
            observer.running_changed(false);
        }
        tracing::info!(graph = %self.name, iteration = self.iteration, "Graph execution stopped");
    }

    /// Run `steps` ticks synchronously.
    ///
    /// Each tick fires `on_execute` on every node in execution order, then
    /// advances the fixed-step clock. A failing node aborts the remaining
    /// ticks; under [`ErrorPolicy::Strict`] the error is returned, under
    /// [`ErrorPolicy::Lenient`] it is logged and the scheduler stops.
    pub fn run_step(&mut self, steps: u32) -> Result<(), ExecutionError> {
        let started = Instant::now();
        let result = self.run_ticks(steps);
        self.clock.last_execution_time = started.elapsed().max(MIN_EXECUTION_TIME);

        match result {
            Ok(()) => Ok(()),
            Err(err) => self.contain(err),
        }
    }

    fn run_ticks(&mut self, steps: u32) -> Result<(), ExecutionError> {
        for _ in 0..steps {
            self.dispatch(LifecycleEvent::Execute)?;
            self.clock.fixed_time += self.settings().fixed_time_lapse;
            self.iteration += 1;
            for observer in self.observers() {
                observer.after_step(self.iteration);
            }
        }
        for observer in self.observers() {
            observer.after_execute();
        }
        Ok(())
    }

    /// Drive ticks from the timer until the scheduler is stopped.
    ///
    /// Ticks fire at roughly the interval given to [`Graph::start`]; late ticks
    /// are delayed rather than bunched up. Returns immediately if not running.
    pub async fn run(&mut self) -> Result<(), ExecutionError> {
        let mut ticker = tokio::time::interval(self.clock.interval.max(MIN_EXECUTION_TIME));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.is_running() {
            ticker.tick().await;
            if !self.is_running() {
                break;
            }
            self.run_step(1)?;
            self.frame += 1;
        }
        Ok(())
    }

    /// Drive ticks from the timer for at most `duration`, then return.
    /// The scheduler keeps running; call [`Graph::stop`] to stop it.
    pub async fn run_for(&mut self, duration: Duration) -> Result<(), ExecutionError> {
        match tokio::time::timeout(duration, self.run()).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(()),
        }
    }

    /// Current scheduler state
    pub fn run_state(&self) -> RunState {
        self.clock.state
    }

    /// Check whether the scheduler is running
    pub fn is_running(&self) -> bool {
        self.clock.state == RunState::Running
    }

    /// Wall-clock time since the last `start`
    pub fn elapsed(&self) -> Duration {
        self.clock.started_at.map_or(Duration::ZERO, |at| at.elapsed())
    }

    /// Fixed-step clock, in seconds
    pub fn fixed_time(&self) -> f64 {
        self.clock.fixed_time
    }

    /// Wall-clock duration of the last `run_step` call, at least one millisecond
    pub fn last_execution_time(&self) -> Duration {
        self.clock.last_execution_time
    }

    /// Whether a node callback has failed since the graph was created or cleared
    pub fn errors_in_execution(&self) -> bool {
        self.clock.errors_in_execution
    }

    /// Ticks run so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Timer-driven ticks run so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Timer interval of the current or last run
    pub fn interval(&self) -> Duration {
        self.clock.interval
    }

    /// Fire a lifecycle event on every node in execution order
    fn dispatch(&mut self, event: LifecycleEvent) -> Result<(), ExecutionError> {
        self.ensure_execution_order();
        let order: Vec<NodeId> = self.order_list.clone();

        for id in order {
            if event == LifecycleEvent::Execute {
                match self.nodes.get(&id) {
                    Some(node) if node.mode == NodeMode::Always => {}
                    _ => continue,
                }
            }

            let outcome = self.with_behavior(id, |behavior, ctx| match event {
                LifecycleEvent::Start => behavior.on_start(ctx),
                LifecycleEvent::Stop => behavior.on_stop(ctx),
                LifecycleEvent::Execute => behavior.on_execute(ctx),
            });
            if let Some(Err(source)) = outcome {
                return Err(ExecutionError { node: id, event, source });
            }
        }
        Ok(())
    }

    fn contain(&mut self, err: ExecutionError) -> Result<(), ExecutionError> {
        self.clock.errors_in_execution = true;
        match self.settings().error_policy {
            ErrorPolicy::Strict => Err(err),
            ErrorPolicy::Lenient => {
                tracing::error!(node = %err.node, event = %err.event, "Error during execution: {}", err.source);
                self.stop();
                Ok(())
            }
        }
    }
}
