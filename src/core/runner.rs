//! Background tick loop
//!
//! Pulls frames from a `FrameSource` on a worker thread and feeds them to a
//! shared `GestureEngine`. The UI keeps a handle to the same engine and calls
//! its boundary methods between ticks.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::engine::GestureEngine;
use super::events::{EngineEvent, EventCallback, TickOutcome};
use crate::vision::FrameSource;
use crate::{GestureError, Result};

/// State of the worker loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Not running
    Stopped,
    /// Capturing and processing frames
    Running,
    /// The frame source ran out of frames
    SourceEnded,
}

/// Runs a `GestureEngine` on its own thread
pub struct GestureRunner {
    engine: Arc<Mutex<GestureEngine>>,
    state: Arc<Mutex<RunnerState>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    callback: Option<EventCallback>,
}

impl GestureRunner {
    pub fn new(engine: GestureEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            state: Arc::new(Mutex::new(RunnerState::Stopped)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            callback: None,
        }
    }

    /// Set callback for engine events
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: Fn(EngineEvent) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    /// Shared engine handle for UI operations
    pub fn engine(&self) -> Arc<Mutex<GestureEngine>> {
        self.engine.clone()
    }

    /// Spawn the worker loop over `source`
    pub fn start(&mut self, source: Box<dyn FrameSource>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(GestureError::AlreadyRunning);
        }
        // reap a worker that ended on its own
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }

        self.running.store(true, Ordering::SeqCst);
        *self.state.lock() = RunnerState::Running;

        let engine = self.engine.clone();
        let running = self.running.clone();
        let state = self.state.clone();
        let callback = self.callback.clone();

        let spawned = thread::Builder::new()
            .name("gesture-capture".to_string())
            .spawn(move || run_capture_loop(engine, running, state, source, callback));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                log::info!("Gesture runner started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                *self.state.lock() = RunnerState::Stopped;
                Err(e.into())
            }
        }
    }

    /// Stop the worker and wait for it to exit
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
            log::info!("Gesture runner stopped");
        }

        let mut state = self.state.lock();
        if *state == RunnerState::Running {
            *state = RunnerState::Stopped;
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for GestureRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture_loop(
    engine: Arc<Mutex<GestureEngine>>,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<RunnerState>>,
    mut source: Box<dyn FrameSource>,
    callback: Option<EventCallback>,
) {
    let interval = Duration::from_millis(engine.lock().config().capture.interval_ms as u64);
    let mut frame_count: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        let (outcome, events) = {
            let mut engine = engine.lock();
            let outcome = engine.poll(source.as_mut());
            (outcome, engine.drain_events())
        };

        if let Some(ref cb) = callback {
            for event in events {
                cb(event);
            }
        }

        if outcome != TickOutcome::Skipped && outcome != TickOutcome::Paused {
            frame_count += 1;
        }
        if outcome == TickOutcome::Skipped && !source.is_available() {
            log::info!("Frame source ended after {} frames", frame_count);
            running.store(false, Ordering::SeqCst);
            *state.lock() = RunnerState::SourceEnded;
            break;
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}
