//! Static partitioning of work items into balanced contiguous ranges.

use crate::error::{EngineError, Result};

/// Half-open index range `[start, end)` owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of items in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }

    /// Iterator over the indices of the range.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Number of workers used for `items` items with at most `max_workers`.
#[must_use]
pub fn worker_count(items: usize, max_workers: usize) -> usize {
    items.max(1).min(max_workers)
}

/// Splits `items` indices into `min(max(items, 1), max_workers)` ranges.
///
/// Each range gets `items / T` indices and the first `items % T` ranges
/// get one more, so sizes differ by at most one and never increase along
/// the list. Zero items yield a single empty range.
///
/// # Errors
/// Returns [`EngineError::InvalidConfig`] if `max_workers` is zero.
pub fn partition(items: usize, max_workers: usize) -> Result<Vec<Range>> {
    if max_workers == 0 {
        return Err(EngineError::InvalidConfig(
            "max_workers must be at least 1".to_string(),
        ));
    }

    let workers = worker_count(items, max_workers);
    let base = items / workers;
    let extra = items % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let len = base + usize::from(i < extra);
        ranges.push(Range::new(start, start + len));
        start += len;
    }
    debug_assert_eq!(start, items);

    log::debug!("partitioned {items} items into {workers} ranges (base {base}, +1 for {extra})");
    Ok(ranges)
}
