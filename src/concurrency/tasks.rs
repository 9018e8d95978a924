use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{environment::Environment, interpreter::Interpreter, object::Object};

use super::{allocate_handle, Handle};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("unknown async handle: {0}")]
    UnknownHandle(Handle),
    #[error("async task {0} ended without producing a result")]
    Abandoned(Handle),
}

/// Results of `core.async` calls plus every task still running in the
/// background, timer callbacks included.
///
/// A finished result stays in the table, so one handle can be awaited any
/// number of times. The table therefore grows with every `core.async` call
/// until [`TaskTable::clear_results`] runs at shutdown.
#[derive(Default)]
pub struct TaskTable {
    results: DashMap<Handle, watch::Receiver<Option<Object>>>,
    running: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `function` on its own task and returns the handle of its result.
    pub fn spawn_async(
        &self,
        interpreter: Interpreter,
        env: Arc<Environment>,
        function: Object,
    ) -> Handle {
        let (sender, receiver) = watch::channel(None);
        let handle = allocate_handle(&self.results, receiver);
        debug!(handle, "spawning async task");

        let task = tokio::spawn(async move {
            let result = interpreter.apply_function(&env, &function, Vec::new()).await;
            if let Object::Error(error) = &result {
                debug!(handle, "async task failed: {}", error.message);
            }
            // Nobody may be waiting yet; the receiver in the table keeps the value.
            let _ = sender.send(Some(result));
        });
        self.track(task);
        handle
    }

    /// Runs `function` detached. Its result is dropped and a failure is
    /// only logged.
    pub fn spawn_background(
        &self,
        interpreter: Interpreter,
        env: Arc<Environment>,
        function: Object,
    ) {
        let task = tokio::spawn(async move {
            let result = interpreter.apply_function(&env, &function, Vec::new()).await;
            if let Object::Error(error) = result {
                warn!("background task failed: {}", error.message);
            }
        });
        self.track(task);
    }

    /// Waits for the task behind `handle` and returns its result.
    pub async fn await_result(&self, handle: Handle) -> Result<Object, TaskError> {
        let mut receiver = self
            .results
            .get(&handle)
            .map(|entry| entry.value().clone())
            .ok_or(TaskError::UnknownHandle(handle))?;

        let result = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| TaskError::Abandoned(handle))?
            .clone();
        Ok(result.unwrap_or(Object::Null))
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.results.contains_key(&handle)
    }

    /// Number of tasks not yet finished.
    pub fn running(&self) -> usize {
        match self.running.lock() {
            Ok(running) => running.iter().filter(|task| !task.is_finished()).count(),
            Err(_) => 0,
        }
    }

    /// Takes every tracked task so the caller can wait for them.
    pub fn drain(&self) -> Vec<JoinHandle<()>> {
        match self.running.lock() {
            Ok(mut running) => running.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    /// Forgets every async result. Later awaits on old handles fail with
    /// [`TaskError::UnknownHandle`]. Returns how many results were dropped.
    pub fn clear_results(&self) -> usize {
        let handles: Vec<Handle> = self.results.iter().map(|entry| *entry.key()).collect();
        handles
            .into_iter()
            .filter(|handle| self.results.remove(handle).is_some())
            .count()
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    pub(crate) fn track(&self, task: JoinHandle<()>) {
        let mut running = match self.running.lock() {
            Ok(running) => running,
            Err(poisoned) => poisoned.into_inner(),
        };
        running.retain(|task| !task.is_finished());
        running.push(task);
    }
}
