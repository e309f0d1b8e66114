use thiserror::Error;

/// Error that occurs when describing or constructing a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BufferError {
    /// A non-empty buffer was to be partitioned into empty partitions.
    #[error("preferred partition length {preferred} can not partition {len} elements")]
    InvalidPartitionLength { len: usize, preferred: usize },
    /// The element count of a grid does not fit into `usize`.
    #[error("a {width}x{height} pixel grid can not fit into memory")]
    LayoutOverflow { width: usize, height: usize },
    /// Provided data does not have the length the layout requires.
    #[error("expected {expected} elements but found {found}")]
    LengthMismatch { expected: usize, found: usize },
}
