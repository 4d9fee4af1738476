//! Contiguous index ranges and the coalescer that builds them.

use crate::error::{checked_end, CollectionError, Result};

/// A contiguous, non-empty index interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    start: usize,
    len: usize,
}

impl Range {
    pub fn new(start: usize, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(CollectionError::InvalidArgument(
                "range length must be at least 1".to_string(),
            ));
        }
        checked_end(start, len)?;
        Ok(Self { start, len })
    }

    fn single(index: usize) -> Self {
        Self {
            start: index,
            len: 1,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// One past the last index.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Extend the range by one index adjacent to either end.
    fn extend(&mut self, index: usize) -> bool {
        if index == self.end() {
            self.len += 1;
            true
        } else if index + 1 == self.start {
            self.start = index;
            self.len += 1;
            true
        } else {
            false
        }
    }
}

/// Turns a stream of indices into contiguous runs.
///
/// Holds at most one pending range. Feeding an index adjacent to it extends
/// the range; any other index flushes the pending range and starts a new one.
#[derive(Debug, Default)]
pub struct RangeCoalescer {
    pending: Option<Range>,
}

impl RangeCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one index. Returns the range flushed by it, if any.
    pub fn push(&mut self, index: usize) -> Option<Range> {
        if let Some(range) = self.pending.as_mut() {
            if range.extend(index) {
                return None;
            }
        }
        self.pending.replace(Range::single(index))
    }

    /// Flush the pending range.
    pub fn finish(&mut self) -> Option<Range> {
        self.pending.take()
    }

    /// Coalesce an ascending index sequence into its runs.
    pub fn coalesce(indices: impl IntoIterator<Item = usize>) -> Vec<Range> {
        let mut coalescer = Self::new();
        let mut ranges: Vec<Range> = indices
            .into_iter()
            .filter_map(|index| coalescer.push(index))
            .collect();
        ranges.extend(coalescer.finish());
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_rejects_zero_length() {
        assert!(Range::new(3, 0).is_err());
        let range = Range::new(3, 2).unwrap();
        assert_eq!(range.end(), 5);
    }

    #[test]
    fn test_coalescer_splits_runs() {
        let mut coalescer = RangeCoalescer::new();
        assert_eq!(coalescer.push(1), None);
        assert_eq!(coalescer.push(2), None);
        assert_eq!(coalescer.push(3), None);
        assert_eq!(coalescer.push(7), Some(Range::new(1, 3).unwrap()));
        assert_eq!(coalescer.push(8), None);
        assert_eq!(coalescer.finish(), Some(Range::new(7, 2).unwrap()));
        assert_eq!(coalescer.finish(), None);
    }

    #[test]
    fn test_coalescer_extends_downwards() {
        let mut coalescer = RangeCoalescer::new();
        coalescer.push(5);
        coalescer.push(4);
        assert_eq!(coalescer.finish(), Some(Range::new(4, 2).unwrap()));
    }

    #[test]
    fn test_coalescer_restarts_after_gap() {
        let mut coalescer = RangeCoalescer::new();
        assert_eq!(coalescer.push(0), None);
        assert_eq!(coalescer.push(5), Some(Range::new(0, 1).unwrap()));
        assert_eq!(coalescer.push(6), None);
        assert_eq!(coalescer.push(4), None);
        assert_eq!(coalescer.push(9), Some(Range::new(4, 3).unwrap()));
        assert_eq!(coalescer.finish(), Some(Range::new(9, 1).unwrap()));
    }

    #[test]
    fn test_coalesce_helper() {
        let ranges = RangeCoalescer::coalesce([0, 2, 3, 4, 9]);
        assert_eq!(
            ranges,
            vec![
                Range::new(0, 1).unwrap(),
                Range::new(2, 3).unwrap(),
                Range::new(9, 1).unwrap(),
            ]
        );
        assert!(RangeCoalescer::coalesce(std::iter::empty()).is_empty());
    }
}
