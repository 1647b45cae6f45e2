use super::value::Value;

/// Failure surfaced by a generated binding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Raised before any runtime interaction once a module is disposed.
    #[error("module `{module}` is disposed")]
    Disposed { module: String },

    #[error("cannot import module `{module}`: {message}")]
    Import { module: String, message: String },

    /// The Python callee raised. `traceback` is the formatted traceback when
    /// the runtime could provide one.
    #[error("`{function}` raised {message}")]
    Invocation {
        function: String,
        message: String,
        traceback: Option<String>,
    },

    #[error("expected {expected}, found {found}")]
    Conversion { expected: String, found: String },

    #[error("invalid arguments: {0}")]
    Arguments(String),
}

impl RuntimeError {
    pub fn conversion(expected: impl Into<String>, found: &Value) -> Self {
        RuntimeError::Conversion {
            expected: expected.into(),
            found: found.kind().to_string(),
        }
    }
}
