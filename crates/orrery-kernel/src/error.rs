/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised when configuring a simulation.
///
/// Lookup misses are not errors: [`Environment::find`] and
/// [`Environment::remove`] return `Option` for an absent entity.
///
/// [`Environment::find`]: crate::environment::Environment::find
/// [`Environment::remove`]: crate::environment::Environment::remove
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The clock step size must be strictly positive.
    #[error("clock step must be positive, got {0}")]
    NonPositiveStep(f64),
}
