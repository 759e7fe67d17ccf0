use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// A parameter is outside the range the engine accepts.
    #[error("invalid argument '{field}': {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    /// The worker pool for the parallel executor could not be built.
    #[error("failed to build trial executor: {message}")]
    Executor { message: String },
}

impl SimulationError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }
}
