use strum::Display;

use super::Object;

/// Who raised an error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorOrigin {
    /// Raised by the evaluator or a builtin.
    Internal,
    /// Built by script code through `error`.
    User,
    /// Built by `panic`; stops the program with an exit code.
    Panic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    pub message: String,
    pub code: Option<i64>,
    pub data: Option<Object>,
    pub origin: ErrorOrigin,
}

impl ErrorObject {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_origin(message, ErrorOrigin::Internal)
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::with_origin(message, ErrorOrigin::User)
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self::with_origin(message, ErrorOrigin::Panic)
    }

    fn with_origin(message: impl Into<String>, origin: ErrorOrigin) -> Self {
        Self {
            message: message.into(),
            code: None,
            data: None,
            origin,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: Object) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_panic(&self) -> bool {
        self.origin == ErrorOrigin::Panic
    }

    /// Process exit code for a panic; 1 unless the script chose one.
    pub fn exit_code(&self) -> i32 {
        self.code
            .and_then(|code| i32::try_from(code).ok())
            .unwrap_or(1)
    }

    pub fn inspect(&self) -> String {
        format!("ERROR: {}", self.message)
    }
}

impl From<crate::concurrency::TaskError> for ErrorObject {
    fn from(error: crate::concurrency::TaskError) -> Self {
        ErrorObject::internal(error.to_string())
    }
}

impl From<crate::concurrency::TimerError> for ErrorObject {
    fn from(error: crate::concurrency::TimerError) -> Self {
        ErrorObject::internal(error.to_string())
    }
}
