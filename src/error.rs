use thiserror::Error;

use crate::builtins::RegistryError;
use crate::concurrency::{TaskError, TimerError};
use crate::config::ConfigError;
use crate::module::ModuleError;

/// Host facing errors. Script level failures are error objects instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),
    #[error("Task error: {0}")]
    Task(#[from] TaskError),
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
