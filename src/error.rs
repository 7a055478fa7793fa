use thiserror::Error;

/// Error type for profiler configuration and internal failures.
///
/// Per-sample parse failures are not errors: they are ordinary outcomes
/// consumed by the streaming tracker (see [`crate::dates::ParseFailure`]).
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// Attempt to change configuration after the first training sample.
    #[error("cannot change {0} once training has started")]
    TrainingStarted(&'static str),

    /// Sample size below the supported minimum.
    #[error("cannot set sample size below {0}")]
    SampleSizeTooSmall(usize),

    /// Internal invariant violation - indicates a bug in the profiler.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for profiling operations.
pub type Result<T> = std::result::Result<T, ProfilerError>;
