//! Bounded membership queries.
//!
//! The backing store only answers `field ∈ values` filters with at most
//! [`MEMBERSHIP_QUERY_LIMIT`] values. [`DayIdChunk`] carries that bound in
//! its type so store adapters never see an oversized filter, and
//! [`partition_day_ids`] splits an arbitrary day set into such chunks.

use std::fmt;

use super::DayId;

/// Largest number of values a store membership filter accepts.
pub const MEMBERSHIP_QUERY_LIMIT: usize = 10;

/// Errors raised when building a [`DayIdChunk`] by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    /// No identifiers were supplied.
    Empty,
    /// More identifiers than a membership filter accepts.
    TooManyValues {
        /// Number of identifiers supplied.
        len: usize,
    },
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "membership filter must contain at least one value"),
            Self::TooManyValues { len } => write!(
                f,
                "membership filter accepts at most {MEMBERSHIP_QUERY_LIMIT} values (got {len})"
            ),
        }
    }
}

impl std::error::Error for ChunkError {}

/// Non-empty list of at most [`MEMBERSHIP_QUERY_LIMIT`] day identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayIdChunk(Vec<DayId>);

impl DayIdChunk {
    /// Validate the size bound and wrap `ids`.
    pub fn new(ids: Vec<DayId>) -> Result<Self, ChunkError> {
        match ids.len() {
            0 => Err(ChunkError::Empty),
            len if len > MEMBERSHIP_QUERY_LIMIT => Err(ChunkError::TooManyValues { len }),
            _ => Ok(Self(ids)),
        }
    }

    /// Identifiers in partition order.
    #[must_use]
    pub fn ids(&self) -> &[DayId] {
        self.0.as_slice()
    }

    /// Number of identifiers in the chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; chunks are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Membership test used by store adapters to evaluate the filter.
    #[must_use]
    pub fn contains(&self, id: &DayId) -> bool {
        self.0.contains(id)
    }
}

/// Split `ids` into consecutive chunks of at most
/// [`MEMBERSHIP_QUERY_LIMIT`] identifiers, preserving input order.
///
/// Callers pass a duplicate-free list; the chunks then cover it exactly once.
///
/// # Examples
/// ```
/// use tripboard::domain::DayId;
/// use tripboard::domain::membership::partition_day_ids;
///
/// let ids: Vec<DayId> = (1..=23)
///     .map(|n| DayId::new(format!("d{n}")).expect("valid id"))
///     .collect();
/// let sizes: Vec<usize> = partition_day_ids(&ids).iter().map(|c| c.len()).collect();
/// assert_eq!(sizes, [10, 10, 3]);
/// ```
#[must_use]
pub fn partition_day_ids(ids: &[DayId]) -> Vec<DayIdChunk> {
    ids.chunks(MEMBERSHIP_QUERY_LIMIT)
        .map(|chunk| DayIdChunk(chunk.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day_ids(count: usize) -> Vec<DayId> {
        (0..count)
            .map(|n| DayId::new(format!("day-{n:03}")).expect("valid id"))
            .collect()
    }

    #[rstest]
    #[case(0, vec![])]
    #[case(1, vec![1])]
    #[case(10, vec![10])]
    #[case(11, vec![10, 1])]
    #[case(22, vec![10, 10, 2])]
    #[case(23, vec![10, 10, 3])]
    #[case(40, vec![10, 10, 10, 10])]
    fn chunk_sizes_follow_the_limit(#[case] count: usize, #[case] expected: Vec<usize>) {
        let chunks = partition_day_ids(&day_ids(count));
        let sizes: Vec<usize> = chunks.iter().map(DayIdChunk::len).collect();
        assert_eq!(sizes, expected);
        assert_eq!(chunks.len(), count.div_ceil(MEMBERSHIP_QUERY_LIMIT));
    }

    #[rstest]
    #[case(1)]
    #[case(9)]
    #[case(23)]
    #[case(57)]
    fn chunks_cover_input_exactly_once_in_order(#[case] count: usize) {
        let ids = day_ids(count);
        let flattened: Vec<DayId> = partition_day_ids(&ids)
            .iter()
            .flat_map(|chunk| chunk.ids().to_vec())
            .collect();
        assert_eq!(flattened, ids);
    }

    #[rstest]
    fn manual_chunks_enforce_bounds() {
        assert_eq!(DayIdChunk::new(Vec::new()), Err(ChunkError::Empty));
        assert_eq!(
            DayIdChunk::new(day_ids(11)),
            Err(ChunkError::TooManyValues { len: 11 })
        );
        let chunk = DayIdChunk::new(day_ids(10)).expect("ten ids fit");
        assert!(chunk.contains(&DayId::new("day-009").expect("valid id")));
        assert!(!chunk.is_empty());
    }
}
