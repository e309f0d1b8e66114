//! Fixed-size windows over the logical elements of a buffer.
use core::fmt;
use core::ops::Range;

use crate::BufferError;

/// A window `[start, start + len)` over the logical elements of a buffer.
///
/// This is only a descriptor. It carries no data and can be freely copied. Buffers hand out the
/// elements of a partition through [`PartitionRef`] and [`PartitionMut`], which borrow the
/// partition data for exactly one step of an iteration.
///
/// [`PartitionRef`]: crate::PartitionRef
/// [`PartitionMut`]: crate::PartitionMut
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    start: usize,
    len: usize,
}

/// The partitioning of `len` elements into windows of a preferred length.
///
/// Every partition has the preferred length except possibly the last one, which holds the
/// remainder. A layout with no elements has no partitions.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionLayout {
    len: usize,
    preferred: usize,
}

/// Iterator over the partitions of a [`PartitionLayout`], in increasing order.
#[derive(Clone, Debug)]
pub struct Partitions {
    layout: PartitionLayout,
    next: usize,
}

impl Partition {
    /// Describe the window `[start, start + len)`.
    ///
    /// # Panics
    ///
    /// When `start + len` overflows.
    pub fn new(start: usize, len: usize) -> Self {
        assert!(
            start.checked_add(len).is_some(),
            "Partition {}+{} overflows the address space",
            start,
            len
        );
        Partition { start, len }
    }

    pub fn start(self) -> usize {
        self.start
    }

    pub fn len(self) -> usize {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    /// One past the last element of the window.
    pub fn end(self) -> usize {
        self.start + self.len
    }

    pub fn range(self) -> Range<usize> {
        self.start..self.end()
    }

    /// The byte range of this partition in a store with `element_size` bytes per element.
    pub fn byte_range(self, element_size: usize) -> Range<usize> {
        self.start * element_size..self.end() * element_size
    }
}

impl PartitionLayout {
    /// Partition `len` elements into windows of `preferred` elements.
    ///
    /// Fails if `preferred` is zero while there are elements to partition.
    pub fn new(len: usize, preferred: usize) -> Result<Self, BufferError> {
        if preferred == 0 && len > 0 {
            return Err(BufferError::InvalidPartitionLength { len, preferred });
        }

        Ok(PartitionLayout { len, preferred })
    }

    /// A layout that covers all elements with a single partition.
    pub const fn whole(len: usize) -> Self {
        PartitionLayout {
            len,
            preferred: len,
        }
    }

    /// The total number of logical elements.
    pub fn len(self) -> usize {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    pub fn preferred_partition_len(self) -> usize {
        self.preferred
    }

    /// `ceil(len / preferred)`, and zero for an empty layout.
    pub fn partition_count(self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.len.div_ceil(self.preferred)
        }
    }

    /// The partition with the given index, if it exists.
    pub fn partition(self, index: usize) -> Option<Partition> {
        if index >= self.partition_count() {
            return None;
        }

        let start = index * self.preferred;
        let len = self.preferred.min(self.len - start);
        Some(Partition { start, len })
    }

    pub fn partitions(self) -> Partitions {
        Partitions {
            layout: self,
            next: 0,
        }
    }

    /// Assert that a partition lies within `[0, len)`.
    ///
    /// # Panics
    ///
    /// With a message naming the partition and the buffer length if it does not.
    #[track_caller]
    pub fn check(self, partition: Partition) {
        assert!(
            partition.end() <= self.len,
            "Partition {}..{} (start {}, length {}) exceeds the buffer length {}",
            partition.start,
            partition.end(),
            partition.start,
            partition.len,
            self.len,
        );
    }
}

impl Iterator for Partitions {
    type Item = Partition;

    fn next(&mut self) -> Option<Partition> {
        let partition = self.layout.partition(self.next)?;
        self.next += 1;
        Some(partition)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.layout.partition_count() - self.next.min(self.layout.partition_count());
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Partitions {}

impl core::iter::FusedIterator for Partitions {}

impl fmt::Debug for PartitionLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartitionLayout")
            .field("len", &self.len)
            .field("preferred", &self.preferred)
            .field("count", &self.partition_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn assert_coverage(len: usize, preferred: usize) {
        let layout = PartitionLayout::new(len, preferred).unwrap();
        let all: Vec<_> = layout.partitions().collect();
        assert_eq!(all.len(), layout.partition_count());

        let mut expected_start = 0;
        let mut short = 0;
        for partition in &all {
            assert_eq!(partition.start(), expected_start);
            assert!(partition.len() <= preferred);
            assert!(!partition.is_empty());
            if partition.len() < preferred {
                short += 1;
            }
            expected_start = partition.end();
        }

        assert_eq!(expected_start, len);
        assert!(short <= 1, "{} short partitions for {}/{}", short, len, preferred);
        if let Some(last) = all.last() {
            let remainder = len % preferred;
            let expected = if remainder == 0 { preferred } else { remainder };
            assert_eq!(last.len(), expected);
        }
    }

    #[test]
    fn covers_exactly_once() {
        for (len, preferred) in [
            (1, 1),
            (42, 42),
            (1024, 1024),
            (1024, 1023),
            (1024, 128),
            (1023, 128),
            (1025, 128),
            (7, 3),
            (3, 7),
        ] {
            assert_coverage(len, preferred);
        }
    }

    #[test]
    fn empty_layout_has_no_partitions() {
        let layout = PartitionLayout::new(0, 0).unwrap();
        assert_eq!(layout.partition_count(), 0);
        assert_eq!(layout.partitions().count(), 0);

        let layout = PartitionLayout::new(0, 16).unwrap();
        assert_eq!(layout.partitions().next(), None);
    }

    #[test]
    fn zero_preferred_length_is_rejected() {
        assert_eq!(
            PartitionLayout::new(4, 0),
            Err(BufferError::InvalidPartitionLength {
                len: 4,
                preferred: 0
            })
        );
    }

    #[test]
    fn partitions_are_exact_size() {
        let mut partitions = PartitionLayout::new(10, 4).unwrap().partitions();
        assert_eq!(partitions.len(), 3);
        partitions.next();
        assert_eq!(partitions.len(), 2);
    }

    #[test]
    #[should_panic(expected = "exceeds the buffer length 8")]
    fn out_of_range_partition_fails_fast() {
        let layout = PartitionLayout::new(8, 4).unwrap();
        layout.check(Partition::new(6, 4));
    }
}
