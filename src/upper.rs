//! Packed upper-triangle layout.
//!
//! Pairs `(i, k)` with `i < k` are stored row by row: row `i` holds
//! `k = i+1..n` in increasing `k`, and the diagonal is never stored.

/// Number of pairs `(i, k)` with `i < k` among `n` variables.
pub fn upper_triangular_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Same as [`upper_triangular_len`], `None` on overflow.
pub(crate) fn checked_upper_triangular_len(n: usize) -> Option<usize> {
    n.checked_mul(n.saturating_sub(1)).map(|p| p / 2)
}

/// Maps a flat work item `ik` in `[0, n*(n-1)/2)` to a pair `(i, k)`, `i < k`.
///
/// Items are laid out over the `n x n` square row by row. Whatever lands on
/// or below the diagonal is reflected through `n` onto the short rows at the
/// bottom of the triangle, so the first `n*(n-1)/2` items hit every pair
/// exactly once.
#[inline]
pub fn pair_from_work_item(ik: usize, n: usize) -> (usize, usize) {
    debug_assert!(ik < upper_triangular_len(n));
    let i = ik / n;
    let k = ik % n;
    if k <= i {
        (n - i - 2, n - k - 1)
    } else {
        (i, k)
    }
}

/// Packed position of pair `(i, k)`, `i < k < n`.
#[inline]
pub fn slot_of_pair(i: usize, k: usize, n: usize) -> usize {
    debug_assert!(i < k && k < n);
    let rows_from_i = n - i;
    upper_triangular_len(n) - rows_from_i * (rows_from_i - 1) / 2 + k - i - 1
}

/// Owned packed upper triangle of a correlation matrix over `n` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct UpperTriangle {
    n: usize,
    values: Vec<f64>,
}

impl UpperTriangle {
    pub(crate) fn from_packed(n: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), upper_triangular_len(n));
        Self { n, values }
    }

    pub fn n_vars(&self) -> usize {
        self.n
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Stored coefficient for `i < k < n`; `None` for anything else.
    pub fn get(&self, i: usize, k: usize) -> Option<f64> {
        if i < k && k < self.n {
            self.values.get(slot_of_pair(i, k, self.n)).copied()
        } else {
            None
        }
    }

    /// Entry `(i, k)` of the full symmetric matrix. The diagonal is 1.
    pub fn symmetric(&self, i: usize, k: usize) -> Option<f64> {
        match i.cmp(&k) {
            std::cmp::Ordering::Less => self.get(i, k),
            std::cmp::Ordering::Greater => self.get(k, i),
            std::cmp::Ordering::Equal => (i < self.n).then_some(1.0),
        }
    }

    /// `(i, k, r)` in packed order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.n;
        (0..n)
            .flat_map(move |i| (i + 1..n).map(move |k| (i, k)))
            .zip(self.values.iter())
            .map(|((i, k), &r)| (i, k, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn work_items_cover_every_pair_once() {
        for n in [2usize, 3, 4, 5, 50] {
            let nn = upper_triangular_len(n);
            let mut seen = HashSet::new();
            for ik in 0..nn {
                let (i, k) = pair_from_work_item(ik, n);
                assert!(i < k && k < n, "n={} ik={} -> ({}, {})", n, ik, i, k);
                assert!(seen.insert((i, k)), "n={} pair ({}, {}) hit twice", n, i, k);
            }
            assert_eq!(seen.len(), n * (n - 1) / 2);
        }
    }

    #[test]
    fn work_items_small_n_exhaustive() {
        for n in 2usize..=40 {
            let nn = upper_triangular_len(n);
            let mut hits = vec![0u32; nn];
            for ik in 0..nn {
                let (i, k) = pair_from_work_item(ik, n);
                hits[slot_of_pair(i, k, n)] += 1;
            }
            assert!(hits.iter().all(|&h| h == 1), "n={}", n);
        }
    }

    #[test]
    fn slots_follow_row_major_order() {
        for n in [2usize, 3, 4, 7, 31] {
            let mut expected = 0;
            for i in 0..n {
                for k in i + 1..n {
                    assert_eq!(slot_of_pair(i, k, n), expected, "n={} ({}, {})", n, i, k);
                    expected += 1;
                }
            }
            assert_eq!(expected, upper_triangular_len(n));
        }
    }

    #[test]
    fn known_work_item_layout() {
        let pairs: Vec<_> = (0..6).map(|ik| pair_from_work_item(ik, 4)).collect();
        assert_eq!(pairs, vec![(2, 3), (0, 1), (0, 2), (0, 3), (1, 3), (1, 2)]);
    }

    #[test]
    fn triangular_len() {
        assert_eq!(upper_triangular_len(0), 0);
        assert_eq!(upper_triangular_len(1), 0);
        assert_eq!(upper_triangular_len(2), 1);
        assert_eq!(upper_triangular_len(5), 10);
        assert_eq!(checked_upper_triangular_len(usize::MAX), None);
    }

    #[test]
    fn lookup_and_iteration() {
        let tri = UpperTriangle::from_packed(3, vec![0.1, 0.2, 0.3]);
        assert_eq!(tri.get(0, 1), Some(0.1));
        assert_eq!(tri.get(0, 2), Some(0.2));
        assert_eq!(tri.get(1, 2), Some(0.3));
        assert_eq!(tri.get(2, 1), None);
        assert_eq!(tri.get(1, 3), None);
        assert_eq!(tri.symmetric(2, 1), Some(0.3));
        assert_eq!(tri.symmetric(1, 1), Some(1.0));
        assert_eq!(tri.symmetric(3, 3), None);

        let triples: Vec<_> = tri.iter().collect();
        assert_eq!(triples, vec![(0, 1, 0.1), (0, 2, 0.2), (1, 2, 0.3)]);
    }
}
