use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use ndarray::{ArrayBase, Data, Ix2};
use rayon::prelude::*;

use crate::config::CorrConfig;
use crate::error::{check_shape, CorrError};
use crate::moments::{moments, Moments};
use crate::upper::{checked_upper_triangular_len, pair_from_work_item, slot_of_pair, UpperTriangle};

/// Pearson correlations of every pair of rows of a row-major
/// `n_vars x n_obs` matrix, packed as the strict upper triangle.
///
/// Zero-variance rows and `n_obs == 1` produce NaN/Inf in the affected
/// slots. Fails only on a length mismatch, a worker pool that cannot be
/// built, or an allocation failure; no partial output is returned.
pub fn pearson_upper_triangle(
    data: &[f64],
    n_vars: usize,
    n_obs: usize,
    config: &CorrConfig,
) -> Result<UpperTriangle, CorrError> {
    check_shape(data, n_vars, n_obs)?;

    debug!("pearson upper triangle: {} variables x {} observations", n_vars, n_obs);
    match config.thread_pool()? {
        Some(pool) => pool.install(|| compute(data, n_vars, n_obs, config)),
        None => compute(data, n_vars, n_obs, config),
    }
}

/// [`pearson_upper_triangle`] over rows of any 2-D `ndarray`, copied into
/// standard layout first when the view is not already contiguous row-major.
pub fn correlation_upper_triangle<S>(
    data: &ArrayBase<S, Ix2>,
    config: &CorrConfig,
) -> Result<UpperTriangle, CorrError>
where
    S: Data<Elem = f64>,
{
    let (n_vars, n_obs) = data.dim();
    let standard = data.as_standard_layout();
    let flat = standard
        .as_slice()
        .expect("standard layout array is contiguous");
    pearson_upper_triangle(flat, n_vars, n_obs, config)
}

fn compute(
    data: &[f64],
    n_vars: usize,
    n_obs: usize,
    config: &CorrConfig,
) -> Result<UpperTriangle, CorrError> {
    let nn = checked_upper_triangular_len(n_vars).ok_or(CorrError::TooManyVariables { n_vars })?;
    let slots = try_zeroed_slots(nn)?;

    // Every pair may read any variable, so the whole moment pass finishes first.
    let moments = moments(data, n_vars, n_obs)?;

    pairwise_pass(
        data,
        n_vars,
        n_obs,
        &moments,
        &slots,
        config.inner_parallel_min_obs,
    );
    debug!("pairwise pass done: {} pairs", nn);

    let packed = slots
        .into_iter()
        .map(|slot| f64::from_bits(slot.into_inner()))
        .collect();
    Ok(UpperTriangle::from_packed(n_vars, packed))
}

/// Output buffer of `len` zeroed slots, each written by exactly one work item.
fn try_zeroed_slots(len: usize) -> Result<Vec<AtomicU64>, CorrError> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(len)
        .map_err(|_| CorrError::OutOfMemory {
            what: "output buffer",
            len,
        })?;
    slots.resize_with(len, || AtomicU64::new(0));
    Ok(slots)
}

fn pairwise_pass(
    data: &[f64],
    n_vars: usize,
    n_obs: usize,
    moments: &Moments,
    slots: &[AtomicU64],
    inner_parallel_min_obs: usize,
) {
    let denom = n_obs as f64 - 1.0;

    (0..slots.len()).into_par_iter().for_each(|ik| {
        let (i, k) = pair_from_work_item(ik, n_vars);
        let row_i = &data[i * n_obs..(i + 1) * n_obs];
        let row_k = &data[k * n_obs..(k + 1) * n_obs];
        let sum = centered_dot(
            row_i,
            row_k,
            moments.mean[i],
            moments.mean[k],
            inner_parallel_min_obs,
        );
        let r = sum / moments.stdev[i] / moments.stdev[k] / denom;
        // Work items map one-to-one onto slots, so no slot sees two stores.
        slots[slot_of_pair(i, k, n_vars)].store(r.to_bits(), Ordering::Relaxed);
    });
}

/// `sum_o (x[o] - mx) * (y[o] - my)`; split into per-worker partial sums once
/// the rows reach `parallel_min` observations.
fn centered_dot(x: &[f64], y: &[f64], mx: f64, my: f64, parallel_min: usize) -> f64 {
    if x.len() >= parallel_min {
        x.par_iter()
            .zip(y.par_iter())
            .map(|(&a, &b)| (a - mx) * (b - my))
            .sum()
    } else {
        x.iter().zip(y).map(|(&a, &b)| (a - mx) * (b - my)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_dot_split_matches_sequential() {
        let x: Vec<f64> = (0..1000).map(|v| (v as f64 * 0.37).sin()).collect();
        let y: Vec<f64> = (0..1000).map(|v| (v as f64 * 0.11).cos()).collect();
        let seq = centered_dot(&x, &y, 0.1, -0.2, usize::MAX);
        let par = centered_dot(&x, &y, 0.1, -0.2, 0);
        assert!((seq - par).abs() <= 1e-9);
    }

    #[test]
    fn pairwise_pass_fills_every_slot() {
        let data = [
            1.0, 2.0, 3.0, //
            2.0, 4.0, 6.0, //
            3.0, 2.0, 1.0, //
            1.0, 3.0, 2.0,
        ];
        let m = moments(&data, 4, 3).expect("moments");
        let slots = try_zeroed_slots(6).expect("slots");
        for slot in &slots {
            slot.store(f64::NAN.to_bits(), Ordering::Relaxed);
        }
        pairwise_pass(&data, 4, 3, &m, &slots, usize::MAX);
        let packed: Vec<f64> = slots
            .iter()
            .map(|s| f64::from_bits(s.load(Ordering::Relaxed)))
            .collect();
        assert!(packed.iter().all(|r| r.is_finite()));
        assert!((packed[slot_of_pair(0, 1, 4)] - 1.0).abs() <= 1e-12);
        assert!((packed[slot_of_pair(0, 2, 4)] + 1.0).abs() <= 1e-12);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = pearson_upper_triangle(&[1.0, 2.0, 3.0], 2, 2, &CorrConfig::default())
            .expect_err("mismatch");
        assert!(matches!(
            err,
            CorrError::ShapeMismatch {
                n_vars: 2,
                n_obs: 2,
                actual: 3
            }
        ));
    }
}
