use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::DashMap;
use thiserror::Error;
use tokio::{
    sync::Notify,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    config::TimerConfig, environment::Environment, interpreter::Interpreter, object::Object,
};

use super::{allocate_handle, Handle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TimerKind {
    Timeout,
    Interval,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("unknown timer handle: {0}")]
    UnknownHandle(Handle),
    #[error("timer delay must not be negative, got {0} ms")]
    NegativeDelay(i64),
    #[error("interval must be at least {min} ms, got {requested} ms")]
    IntervalTooShort { requested: i64, min: u128 },
}

/// Stop flag shared between a timer entry and its task.
#[derive(Clone)]
struct TimerSignal {
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl TimerSignal {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // Stores a permit when the task is not parked yet.
        self.wake.notify_one();
    }
}

struct TimerEntry {
    kind: TimerKind,
    signal: TimerSignal,
}

/// Live timeouts and intervals keyed by handle.
///
/// A timeout leaves the table when it fires or is cancelled; an interval
/// stays until cancelled.
pub struct TimerTable {
    timers: Arc<DashMap<Handle, TimerEntry>>,
    config: TimerConfig,
}

impl TimerTable {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Calls `function` once after `delay_ms` milliseconds.
    pub fn schedule_timeout(
        &self,
        delay_ms: i64,
        interpreter: Interpreter,
        env: Arc<Environment>,
        function: Object,
    ) -> Result<Handle, TimerError> {
        let delay = u64::try_from(delay_ms)
            .map(Duration::from_millis)
            .map_err(|_| TimerError::NegativeDelay(delay_ms))?;

        let signal = TimerSignal::new();
        let handle = allocate_handle(
            &self.timers,
            TimerEntry {
                kind: TimerKind::Timeout,
                signal: signal.clone(),
            },
        );
        debug!(handle, delay_ms, "timeout scheduled");

        let timers = Arc::clone(&self.timers);
        let owner = interpreter.clone();
        owner.tasks().track(tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = signal.wake.notified() => {
                    debug!(handle, "timeout cancelled");
                    return;
                }
            }
            // Whoever removes the entry first wins against `cancel`.
            if timers.remove(&handle).is_none() {
                return;
            }

            let result = interpreter.apply_function(&env, &function, Vec::new()).await;
            report_failure(handle, TimerKind::Timeout, &result);
        }));
        Ok(handle)
    }

    /// Calls `function` every `period_ms` milliseconds until cancelled.
    /// Each firing runs on its own task so a slow callback never delays the
    /// next tick. Firings are tracked with the interpreter's tasks, so
    /// shutdown waits for them.
    pub fn schedule_interval(
        &self,
        period_ms: i64,
        interpreter: Interpreter,
        env: Arc<Environment>,
        function: Object,
    ) -> Result<Handle, TimerError> {
        let min = self.config.min_interval.as_millis().max(1);
        let period = u64::try_from(period_ms)
            .ok()
            .filter(|ms| u128::from(*ms) >= min)
            .map(Duration::from_millis)
            .ok_or(TimerError::IntervalTooShort {
                requested: period_ms,
                min,
            })?;

        let signal = TimerSignal::new();
        let handle = allocate_handle(
            &self.timers,
            TimerEntry {
                kind: TimerKind::Interval,
                signal: signal.clone(),
            },
        );
        debug!(handle, period_ms, "interval scheduled");

        let owner = interpreter.clone();
        owner.tasks().track(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while signal.is_running() {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = signal.wake.notified() => break,
                }
                if !signal.is_running() {
                    break;
                }

                let firing = interpreter.clone();
                let env = Arc::clone(&env);
                let function = function.clone();
                interpreter.tasks().track(tokio::spawn(async move {
                    let result = firing.apply_function(&env, &function, Vec::new()).await;
                    report_failure(handle, TimerKind::Interval, &result);
                }));
            }
            debug!(handle, "interval stopped");
        }));
        Ok(handle)
    }

    /// Stops the timer behind `handle` and forgets it.
    pub fn cancel(&self, handle: Handle) -> Result<TimerKind, TimerError> {
        let (_, entry) = self
            .timers
            .remove(&handle)
            .ok_or(TimerError::UnknownHandle(handle))?;
        entry.signal.stop();
        debug!(handle, kind = %entry.kind, "timer cancelled");
        Ok(entry.kind)
    }

    /// Stops every live timer. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let handles: Vec<Handle> = self.timers.iter().map(|entry| *entry.key()).collect();
        handles
            .into_iter()
            .filter(|handle| self.cancel(*handle).is_ok())
            .count()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.timers.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

fn report_failure(handle: Handle, kind: TimerKind, result: &Object) {
    if let Object::Error(error) = result {
        warn!(handle, %kind, "timer callback failed: {}", error.message);
    }
}
