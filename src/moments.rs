use log::debug;
use rayon::prelude::*;

use crate::error::{check_shape, CorrError};

/// Per-variable mean and sample standard deviation (ddof = 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    pub mean: Vec<f64>,
    pub stdev: Vec<f64>,
}

/// Zero-filled buffer of `len` values, reported as [`CorrError::OutOfMemory`]
/// instead of aborting when the reservation fails.
pub(crate) fn try_zeroed(len: usize, what: &'static str) -> Result<Vec<f64>, CorrError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| CorrError::OutOfMemory { what, len })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

/// Welford's single-pass mean and sample standard deviation of one row.
///
/// A single observation gives a standard deviation of NaN (0 / 0).
pub fn welford(row: &[f64]) -> (f64, f64) {
    let mut mk = 0.0;
    let mut sk = 0.0;
    for (k, &x) in row.iter().enumerate() {
        let delta = x - mk;
        mk += delta / (k + 1) as f64;
        sk += delta * (x - mk);
    }
    (mk, (sk / (row.len() as f64 - 1.0)).sqrt())
}

/// Moment pass over a row-major `n_vars x n_obs` matrix.
///
/// Runs on the current rayon pool; returns once every variable is done.
pub fn moments(data: &[f64], n_vars: usize, n_obs: usize) -> Result<Moments, CorrError> {
    check_shape(data, n_vars, n_obs)?;
    let mut mean = try_zeroed(n_vars, "mean array")?;
    let mut stdev = try_zeroed(n_vars, "stdev array")?;

    mean.par_iter_mut()
        .zip(stdev.par_iter_mut())
        .enumerate()
        .for_each(|(i, (m, s))| {
            let (mk, sk) = welford(&data[i * n_obs..(i + 1) * n_obs]);
            *m = mk;
            *s = sk;
        });

    debug!("moment pass done for {} variables", n_vars);
    Ok(Moments { mean, stdev })
}
