//! Splitting a frame's triangles across workers.
//!
//! Models are flattened into [`Slice`]s, then the global triangle sequence is
//! cut into `N` equal-length ranges regardless of model boundaries. A slice
//! straddling a cut is split, so each worker receives the same number of
//! triangles (up to rounding) even when model sizes differ wildly.

use std::ops::Range;

use crate::model::Model;

/// A contiguous run of one model's triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    /// Index of the owning model in the frame's model list.
    pub model: usize,
    pub start: usize,
    pub end: usize,
}

impl Slice {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// One slice per non-empty model, in input order.
pub fn flatten<'m>(models: impl IntoIterator<Item = (usize, &'m Model)>) -> Vec<Slice> {
    models
        .into_iter()
        .filter(|(_, model)| model.triangle_count() > 0)
        .map(|(index, model)| Slice {
            model: index,
            start: 0,
            end: model.triangle_count(),
        })
        .collect()
}

/// The global triangle range worker `worker` of `workers` is responsible for.
#[inline]
pub fn worker_range(total: usize, worker: usize, workers: usize) -> Range<usize> {
    worker * total / workers..(worker + 1) * total / workers
}

/// Distributes `slices` across `workers` lists (at least one).
///
/// Worker `i` receives the triangles at global positions
/// `i * T / N .. (i + 1) * T / N`, where `T` is the total count. Slices keep
/// their relative order.
pub fn partition(slices: &[Slice], workers: usize) -> Vec<Vec<Slice>> {
    let workers = workers.max(1);
    let total: usize = slices.iter().map(Slice::len).sum();
    let mut out = vec![Vec::new(); workers];

    let mut worker = 0;
    let mut offset = 0;
    for slice in slices.iter().filter(|s| !s.is_empty()) {
        let mut start = slice.start;
        while start < slice.end {
            let mut range = worker_range(total, worker, workers);
            while offset >= range.end {
                worker += 1;
                range = worker_range(total, worker, workers);
            }
            let take = (range.end - offset).min(slice.end - start);
            out[worker].push(Slice {
                model: slice.model,
                start,
                end: start + take,
            });
            start += take;
            offset += take;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slices(counts: &[usize]) -> Vec<Slice> {
        counts
            .iter()
            .enumerate()
            .map(|(model, &count)| Slice { model, start: 0, end: count })
            .collect()
    }

    fn triangle_ids(slices: &[Slice]) -> Vec<(usize, usize)> {
        slices
            .iter()
            .flat_map(|s| s.range().map(move |i| (s.model, i)))
            .collect()
    }

    #[test]
    fn test_partition_conserves_triangles() {
        let cases: &[&[usize]] = &[&[1000, 3, 3, 0, 57], &[1], &[5, 5, 5], &[], &[0, 0], &[2, 9, 1, 40]];
        for counts in cases {
            let input = slices(counts);
            let expected = triangle_ids(&input);
            for workers in 1..=9 {
                let parts = partition(&input, workers);
                assert_eq!(parts.len(), workers);
                let flattened: Vec<Slice> = parts.iter().flatten().copied().collect();
                assert_eq!(triangle_ids(&flattened), expected, "counts {counts:?}, {workers} workers");
                let total: usize = flattened.iter().map(Slice::len).sum();
                assert_eq!(total, counts.iter().sum::<usize>());
                assert!(flattened.iter().all(|s| !s.is_empty()));
            }
        }
    }

    #[test]
    fn test_partition_balances_by_triangle_count() {
        let input = slices(&[1000, 3, 3, 57]);
        let parts = partition(&input, 4);
        let total = 1063;
        for (worker, part) in parts.iter().enumerate() {
            let len: usize = part.iter().map(Slice::len).sum();
            assert_eq!(len, worker_range(total, worker, 4).len());
        }
        // The big model is split across the first workers.
        assert_eq!(parts[0], vec![Slice { model: 0, start: 0, end: 265 }]);
        assert_eq!(parts[1], vec![Slice { model: 0, start: 265, end: 531 }]);
    }

    #[test]
    fn test_more_workers_than_triangles() {
        let parts = partition(&slices(&[2, 1]), 8);
        let non_empty = parts.iter().filter(|p| !p.is_empty()).count();
        assert_eq!(non_empty, 3);
        assert_eq!(triangle_ids(&parts.concat()), vec![(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn test_zero_workers_means_one() {
        let parts = partition(&slices(&[4]), 0);
        assert_eq!(parts, vec![vec![Slice { model: 0, start: 0, end: 4 }]]);
    }
}
