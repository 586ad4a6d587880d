use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorrError {
    /// Reservation of one of the working buffers failed. Nothing is returned.
    #[error("cannot allocate {what} ({len} values)")]
    OutOfMemory { what: &'static str, len: usize },

    /// `n_vars * (n_vars - 1) / 2` does not fit in `usize`.
    #[error("{n_vars} variables have more pairs than can be addressed")]
    TooManyVariables { n_vars: usize },

    #[error("data holds {actual} values but {n_vars} variables x {n_obs} observations were declared")]
    ShapeMismatch {
        n_vars: usize,
        n_obs: usize,
        actual: usize,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Rejects a flat row-major buffer whose length is not `n_vars * n_obs`.
pub(crate) fn check_shape(data: &[f64], n_vars: usize, n_obs: usize) -> Result<(), CorrError> {
    match n_vars.checked_mul(n_obs) {
        Some(expected) if expected == data.len() => Ok(()),
        _ => Err(CorrError::ShapeMismatch {
            n_vars,
            n_obs,
            actual: data.len(),
        }),
    }
}
