use std::sync::Arc;

use futures::future::join_all;
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

use crate::{
    ast::{Node, Program},
    builtins::BuiltinRegistry,
    concurrency::{Handle, TaskTable, TimerTable},
    config::RuntimeConfig,
    environment::Environment,
    eval::Evaluator,
    module::{ModuleLoader, NoModules},
    object::{ErrorObject, Object},
    InternalResult,
};

/// How a program run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Object),
    /// Stopped by an error value nobody handled.
    Failed(Arc<ErrorObject>),
    /// Stopped by `panic`.
    Exit { code: i32, message: String },
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(_) => 0,
            RunOutcome::Failed(_) => 1,
            RunOutcome::Exit { code, .. } => *code,
        }
    }
}

struct Shared {
    config: RuntimeConfig,
    builtins: Arc<BuiltinRegistry>,
    modules: Arc<dyn ModuleLoader>,
    tasks: TaskTable,
    timers: TimerTable,
    globals: Arc<Environment>,
}

/// Owns everything a running program shares: configuration, the builtin
/// registry, the module loader, the task and timer tables and the global
/// scope. Cloning yields another handle to the same interpreter.
#[derive(Clone)]
pub struct Interpreter {
    shared: Arc<Shared>,
}

#[derive(Default)]
pub struct InterpreterBuilder {
    config: Option<RuntimeConfig>,
    builtins: Option<BuiltinRegistry>,
    modules: Option<Arc<dyn ModuleLoader>>,
}

impl InterpreterBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replaces the standard registry.
    pub fn builtins(mut self, builtins: BuiltinRegistry) -> Self {
        self.builtins = Some(builtins);
        self
    }

    pub fn modules(mut self, modules: impl ModuleLoader + 'static) -> Self {
        self.modules = Some(Arc::new(modules));
        self
    }

    pub fn build(self) -> InternalResult<Interpreter> {
        let config = self.config.unwrap_or_default();
        let builtins = match self.builtins {
            Some(builtins) => builtins,
            None => BuiltinRegistry::standard()?,
        };
        let modules: Arc<dyn ModuleLoader> = match self.modules {
            Some(modules) => modules,
            None => Arc::new(NoModules),
        };
        info!(builtins = builtins.len(), "interpreter created");

        Ok(Interpreter {
            shared: Arc::new(Shared {
                timers: TimerTable::new(config.timers.clone()),
                config,
                builtins: Arc::new(builtins),
                modules,
                tasks: TaskTable::new(),
                globals: Environment::new_global(),
            }),
        })
    }
}

impl Interpreter {
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::default()
    }

    /// Interpreter with default configuration and the standard builtins.
    pub fn new() -> InternalResult<Self> {
        Self::builder().build()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.shared.builtins
    }

    pub fn modules(&self) -> &dyn ModuleLoader {
        self.shared.modules.as_ref()
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.shared.tasks
    }

    pub fn timers(&self) -> &TimerTable {
        &self.shared.timers
    }

    pub fn globals(&self) -> &Arc<Environment> {
        &self.shared.globals
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.clone())
    }

    /// Evaluates `program` in the global scope.
    pub async fn eval_program(&self, program: &Program) -> Object {
        self.evaluator()
            .eval_program(program, self.globals())
            .await
    }

    /// Evaluates any node in the given scope.
    pub async fn eval(&self, node: &Node, env: &Arc<Environment>) -> Object {
        self.evaluator().eval_node(node, env).await
    }

    /// Calls a function or builtin from native code.
    pub async fn apply_function(
        &self,
        env: &Arc<Environment>,
        function: &Object,
        args: Vec<Object>,
    ) -> Object {
        self.evaluator().apply_function(env, function, args).await
    }

    /// Runs a whole program and reports how it ended. Panics and
    /// unhandled errors are printed to stderr.
    pub async fn run(&self, program: &Program) -> RunOutcome {
        match self.eval_program(program).await {
            Object::Error(e) if e.is_panic() => {
                error!(code = e.exit_code(), "program panicked: {}", e.message);
                eprintln!("{}", e.message);
                RunOutcome::Exit {
                    code: e.exit_code(),
                    message: e.message.clone(),
                }
            }
            Object::Error(e) => {
                warn!("program failed: {}", e.message);
                eprintln!("{}", e.inspect());
                RunOutcome::Failed(e)
            }
            value => RunOutcome::Completed(value),
        }
    }

    /// Waits for an async task started with `core.async`.
    pub async fn await_task(&self, handle: Handle) -> InternalResult<Object> {
        Ok(self.tasks().await_result(handle).await?)
    }

    pub fn cancel_timer(&self, handle: Handle) -> InternalResult<()> {
        self.timers().cancel(handle)?;
        Ok(())
    }

    /// Cancels every timer, waits up to `shutdown_timeout` for running
    /// tasks and timer callbacks, then drops async results and clears the
    /// global scope.
    pub async fn shutdown(&self) {
        info!("Starting interpreter shutdown");
        let cancelled = self.timers().cancel_all();
        info!(timers = cancelled, "timers cancelled");

        let timeout = self.config().shutdown_timeout;
        let deadline = Instant::now() + timeout;
        // Tasks finishing now may still have tracked new ones.
        loop {
            let pending = self.tasks().drain();
            if pending.is_empty() {
                break;
            }
            info!(tasks = pending.len(), "waiting for background work");
            if time::timeout_at(deadline, join_all(pending)).await.is_err() {
                warn!(?timeout, "background tasks still running after shutdown timeout");
                break;
            }
        }

        let results = self.tasks().clear_results();
        self.globals().clear();
        info!(results, "interpreter shut down");
    }
}
