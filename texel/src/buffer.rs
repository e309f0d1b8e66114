// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `pixelflow` developers
//! Buffers that are read and written one partition at a time.
use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;
use core::{fmt, ops};

use crate::compression::ConstantBitRate;
use crate::partition::{Partition, PartitionLayout, Partitions};
use crate::BufferError;

/// A fixed-length element store accessed exclusively through partitions.
///
/// The in-memory representation of the elements is not exposed. A partition of the logical
/// elements is made available in the requested element type `T`, regardless of how it is stored,
/// and written back when the caller is done with it. The store may be the element slice itself
/// ([`DirectBuffer`]) or a transcoded form of it ([`CompressedBuffer`]).
///
/// Most users want [`read_partitions`] and [`write_partitions`] which drive the three primitives
/// below over the whole buffer.
///
/// [`read_partitions`]: PackedBuffer::read_partitions
/// [`write_partitions`]: PackedBuffer::write_partitions
pub trait PackedBuffer<T: Copy + Default> {
    /// The partitioning of the logical elements.
    fn layout(&self) -> PartitionLayout;

    /// The number of scratch elements one iteration needs to stage a partition.
    ///
    /// Zero for backings that can lend their own storage.
    fn scratch_len(&self) -> usize;

    /// Make the elements of `partition` readable, staging them in `scratch` where needed.
    ///
    /// `scratch` is either empty or exactly as long as the partition.
    fn load<'a>(&'a self, partition: Partition, scratch: &'a mut [T]) -> &'a [T];

    /// Make the elements of `partition` writable, staging them in `scratch` where needed.
    ///
    /// The returned span holds the current content of the partition.
    fn load_mut<'a>(&'a mut self, partition: Partition, scratch: &'a mut [T]) -> &'a mut [T];

    /// Commit a staged partition back into the store.
    fn store(&mut self, partition: Partition, scratch: &[T]);

    /// The total number of logical elements.
    fn len(&self) -> usize {
        self.layout().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate all partitions for reading, each one decoded before it is handed out.
    ///
    /// The iteration is single pass. Create a new one for each pass over the buffer.
    fn read_partitions(&self) -> ReadPartitions<'_, T, Self> {
        ReadPartitions {
            buffer: self,
            partitions: self.layout().partitions(),
            scratch: vec![T::default(); self.scratch_len()],
        }
    }

    /// Iterate all partitions for writing.
    ///
    /// A partition is committed to the store when the iteration advances past it, when
    /// [`WritePartitions::finish`] is called, or when the iteration is dropped.
    fn write_partitions(&mut self) -> WritePartitions<'_, T, Self> {
        let partitions = self.layout().partitions();
        let scratch = vec![T::default(); self.scratch_len()];
        WritePartitions {
            buffer: self,
            partitions,
            scratch,
            pending: None,
        }
    }
}

/// A buffer that stores its elements as they are.
///
/// Partitions lend the backing slice directly, nothing is staged or transcoded.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectBuffer<T> {
    data: Vec<T>,
    layout: PartitionLayout,
}

/// A buffer that stores its elements in a constant bit rate compressed form.
///
/// Each read decompresses a partition into a scratch region owned by the iteration, each write
/// compresses it back. The compressed store is allocated once, with exactly
/// `len * C::COMPRESSED_ELEMENT_SIZE` bytes.
pub struct CompressedBuffer<T, C> {
    compressed: Vec<u8>,
    layout: PartitionLayout,
    compression: C,
    element: PhantomData<fn(T) -> T>,
}

/// One step of a [`ReadPartitions`] iteration.
pub struct PartitionRef<'a, T> {
    partition: Partition,
    span: &'a [T],
}

/// One step of a [`WritePartitions`] iteration.
pub struct PartitionMut<'a, T> {
    partition: Partition,
    span: &'a mut [T],
}

/// A single-pass, lending iteration over the partitions of a buffer for reading.
///
/// Created by [`PackedBuffer::read_partitions`].
pub struct ReadPartitions<'buf, T, B: ?Sized> {
    buffer: &'buf B,
    partitions: Partitions,
    scratch: Vec<T>,
}

/// A single-pass, lending iteration over the partitions of a buffer for writing.
///
/// Created by [`PackedBuffer::write_partitions`].
pub struct WritePartitions<'buf, T: Copy + Default, B: PackedBuffer<T> + ?Sized> {
    buffer: &'buf mut B,
    partitions: Partitions,
    scratch: Vec<T>,
    /// The partition last handed out, not yet committed.
    pending: Option<Partition>,
}

impl<T: Copy + Default> DirectBuffer<T> {
    /// Allocate `len` default elements, lent as one single partition.
    pub fn new(len: usize) -> Self {
        Self::from_vec(vec![T::default(); len])
    }

    /// Wrap existing elements, lent as one single partition.
    pub fn from_vec(data: Vec<T>) -> Self {
        let layout = PartitionLayout::whole(data.len());
        DirectBuffer { data, layout }
    }

    /// Allocate `len` default elements, lent in partitions of `preferred` elements.
    pub fn with_partition_len(len: usize, preferred: usize) -> Result<Self, BufferError> {
        let layout = PartitionLayout::new(len, preferred)?;
        Ok(DirectBuffer {
            data: vec![T::default(); len],
            layout,
        })
    }

    /// Change the partitioning without touching the elements.
    pub fn set_partition_len(&mut self, preferred: usize) -> Result<(), BufferError> {
        self.layout = PartitionLayout::new(self.data.len(), preferred)?;
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Copy + Default> PackedBuffer<T> for DirectBuffer<T> {
    fn layout(&self) -> PartitionLayout {
        self.layout
    }

    fn scratch_len(&self) -> usize {
        0
    }

    #[track_caller]
    fn load<'a>(&'a self, partition: Partition, _: &'a mut [T]) -> &'a [T] {
        self.layout.check(partition);
        &self.data[partition.range()]
    }

    #[track_caller]
    fn load_mut<'a>(&'a mut self, partition: Partition, _: &'a mut [T]) -> &'a mut [T] {
        self.layout.check(partition);
        &mut self.data[partition.range()]
    }

    fn store(&mut self, partition: Partition, _: &[T]) {
        // The caller wrote through the lent slice already.
        self.layout.check(partition);
    }
}

impl<T, C> CompressedBuffer<T, C>
where
    T: Copy + Default,
    C: ConstantBitRate<T>,
{
    /// Allocate a zeroed compressed store for `len` elements.
    ///
    /// # Panics
    ///
    /// When `preferred` is zero for a non-empty buffer, when `C` declares a compressed element
    /// size of zero, or when the store would not fit into memory. Use [`Self::try_new`] to handle
    /// an invalid partition length instead.
    pub fn new(len: usize, preferred: usize) -> Self
    where
        C: Default,
    {
        Self::with_compression(len, preferred, C::default())
            .expect("Preferred partition length must be positive")
    }

    pub fn try_new(len: usize, preferred: usize) -> Result<Self, BufferError>
    where
        C: Default,
    {
        Self::with_compression(len, preferred, C::default())
    }

    /// Allocate with an explicit instance of the compression.
    ///
    /// # Panics
    ///
    /// When `C` declares a compressed element size of zero, or the store would not fit into
    /// memory.
    pub fn with_compression(
        len: usize,
        preferred: usize,
        compression: C,
    ) -> Result<Self, BufferError> {
        assert!(
            C::COMPRESSED_ELEMENT_SIZE > 0,
            "Compression {} declares a compressed element size of zero",
            core::any::type_name::<C>(),
        );

        let layout = PartitionLayout::new(len, preferred)?;
        let bytes = len
            .checked_mul(C::COMPRESSED_ELEMENT_SIZE)
            .expect("Compressed store can not fit into memory");

        log::trace!(
            "allocating compressed buffer: {} elements, {} bytes, {} partitions",
            len,
            bytes,
            layout.partition_count()
        );

        Ok(CompressedBuffer {
            compressed: vec![0; bytes],
            layout,
            compression,
            element: PhantomData,
        })
    }

    /// The compressed bytes of all elements.
    pub fn as_compressed_bytes(&self) -> &[u8] {
        &self.compressed
    }

    pub fn compression(&self) -> &C {
        &self.compression
    }

    fn compressed_range(&self, partition: Partition) -> ops::Range<usize> {
        partition.byte_range(C::COMPRESSED_ELEMENT_SIZE)
    }
}

impl<T, C> PackedBuffer<T> for CompressedBuffer<T, C>
where
    T: Copy + Default,
    C: ConstantBitRate<T>,
{
    fn layout(&self) -> PartitionLayout {
        self.layout
    }

    fn scratch_len(&self) -> usize {
        self.layout.preferred_partition_len().min(self.layout.len())
    }

    #[track_caller]
    fn load<'a>(&'a self, partition: Partition, scratch: &'a mut [T]) -> &'a [T] {
        self.layout.check(partition);
        assert_eq!(scratch.len(), partition.len(), "Scratch must match the partition");
        let range = self.compressed_range(partition);
        self.compression.decompress(&self.compressed[range], scratch);
        scratch
    }

    #[track_caller]
    fn load_mut<'a>(&'a mut self, partition: Partition, scratch: &'a mut [T]) -> &'a mut [T] {
        self.layout.check(partition);
        assert_eq!(scratch.len(), partition.len(), "Scratch must match the partition");
        let range = self.compressed_range(partition);
        self.compression.decompress(&self.compressed[range], scratch);
        scratch
    }

    #[track_caller]
    fn store(&mut self, partition: Partition, scratch: &[T]) {
        self.layout.check(partition);
        assert_eq!(scratch.len(), partition.len(), "Scratch must match the partition");
        let range = self.compressed_range(partition);
        self.compression.compress(scratch, &mut self.compressed[range]);
    }
}

impl<'a, T> PartitionRef<'a, T> {
    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.span
    }
}

impl<'a, T> PartitionMut<'a, T> {
    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn as_slice(&self) -> &[T] {
        &*self.span
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut *self.span
    }
}

impl<T> ops::Deref for PartitionRef<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.span
    }
}

impl<T> ops::Deref for PartitionMut<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &*self.span
    }
}

impl<T> ops::DerefMut for PartitionMut<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut *self.span
    }
}

impl<'buf, T, B> ReadPartitions<'buf, T, B>
where
    T: Copy + Default,
    B: PackedBuffer<T> + ?Sized,
{
    /// Decode and lend the next partition.
    ///
    /// The returned view is only valid until the next call, which reuses its staging memory.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<PartitionRef<'_, T>> {
        let partition = self.partitions.next()?;
        let buffer = self.buffer;
        let end = partition.len().min(self.scratch.len());
        let span = buffer.load(partition, &mut self.scratch[..end]);
        Some(PartitionRef { partition, span })
    }

    /// Visit every remaining partition in order.
    pub fn for_each(mut self, mut visit: impl FnMut(Partition, &[T])) {
        while let Some(part) = self.next() {
            visit(part.partition, part.span);
        }
    }

    /// The number of partitions not yet handed out.
    pub fn remaining(&self) -> usize {
        self.partitions.len()
    }
}

impl<'buf, T, B> WritePartitions<'buf, T, B>
where
    T: Copy + Default,
    B: PackedBuffer<T> + ?Sized,
{
    /// Commit the previous partition, then lend the next one.
    ///
    /// The returned view holds the current content of the partition. It is only valid until the
    /// next call.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<PartitionMut<'_, T>> {
        self.commit();
        let partition = self.partitions.next()?;
        self.pending = Some(partition);
        let end = partition.len().min(self.scratch.len());
        let span = self.buffer.load_mut(partition, &mut self.scratch[..end]);
        Some(PartitionMut { partition, span })
    }

    /// Visit every remaining partition in order, committing each one afterwards.
    pub fn for_each(mut self, mut visit: impl FnMut(Partition, &mut [T])) {
        while let Some(mut part) = self.next() {
            let partition = part.partition;
            visit(partition, part.as_mut_slice());
        }
        self.finish();
    }

    /// Commit the last partition handed out and end the iteration.
    pub fn finish(mut self) {
        self.commit();
    }

    pub fn remaining(&self) -> usize {
        self.partitions.len()
    }

    fn commit(&mut self) {
        if let Some(partition) = self.pending.take() {
            let end = partition.len().min(self.scratch.len());
            self.buffer.store(partition, &self.scratch[..end]);
        }
    }
}

impl<T, B> Drop for WritePartitions<'_, T, B>
where
    T: Copy + Default,
    B: PackedBuffer<T> + ?Sized,
{
    fn drop(&mut self) {
        self.commit();
    }
}

impl<T: Copy + Default> Default for DirectBuffer<T> {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl<T> ops::Deref for DirectBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> ops::DerefMut for DirectBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: fmt::Debug> fmt::Debug for DirectBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DirectBuffer")
            .field("layout", &self.layout)
            .field("content", &self.data)
            .finish()
    }
}

impl<T, C: fmt::Debug> fmt::Debug for CompressedBuffer<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CompressedBuffer")
            .field("layout", &self.layout)
            .field("compression", &self.compression)
            .field("bytes", &self.compressed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{FloatToByte, FloatToU16, Uncompressed};

    fn write_then_sum<B: PackedBuffer<f32>>(buffer: &mut B) -> (usize, usize) {
        let mut value = 1.0;
        buffer.write_partitions().for_each(|_, span| {
            for element in span {
                *element = value;
                value += 1.0;
            }
        });

        let mut sum = 0usize;
        buffer.read_partitions().for_each(|_, span| {
            sum += span.iter().map(|&v| v as usize).sum::<usize>();
        });

        let n = buffer.len();
        (sum, n * (n + 1) / 2)
    }

    #[test]
    fn write_read_round_trip() {
        let cases = [
            (0, 0),
            (1, 1),
            (42, 42),
            (1024, 1024),
            (1024, 1023),
            (1024, 128),
            (1023, 128),
            (1025, 128),
        ];

        for (len, preferred) in cases {
            let mut exact = CompressedBuffer::<f32, Uncompressed<f32>>::new(len, preferred);
            let (sum, expected) = write_then_sum(&mut exact);
            assert_eq!(sum, expected, "uncompressed {}/{}", len, preferred);

            let mut wide = CompressedBuffer::<f32, FloatToU16>::new(len, preferred);
            let (sum, expected) = write_then_sum(&mut wide);
            assert_eq!(sum, expected, "u16 {}/{}", len, preferred);
        }
    }

    #[test]
    fn byte_compression_is_lossy_by_contract() {
        let mut buffer = CompressedBuffer::<f32, FloatToByte>::new(6, 4);
        let written = [0.2, 10.6, 254.4, 255.0, 400.0, -3.0];
        let mut source = written.iter();
        buffer.write_partitions().for_each(|_, span| {
            for element in span {
                *element = *source.next().unwrap();
            }
        });

        let mut read = Vec::new();
        buffer
            .read_partitions()
            .for_each(|_, span| read.extend_from_slice(span));

        assert_eq!(read, [0.0, 11.0, 254.0, 255.0, 255.0, 0.0]);
        for (w, r) in written.iter().zip(&read) {
            if (0.0..=255.0).contains(w) {
                assert!((w - r).abs() <= 0.5);
            }
        }
    }

    #[test]
    fn direct_buffer_lends_its_storage() {
        let source: Vec<i32> = (1..=10).collect();
        let buffer = DirectBuffer::from_vec(source.clone());

        let mut reader = buffer.read_partitions();
        let first = reader.next().expect("one partition");
        assert_eq!(first.as_slice().as_ptr(), buffer.as_slice().as_ptr());
        assert_eq!(first.as_slice(), &source[..]);
        drop(first);
        assert!(reader.next().is_none());
    }

    #[test]
    fn direct_buffer_writes_in_place() {
        let mut buffer = DirectBuffer::<i32>::with_partition_len(42, 10).unwrap();
        let mut count = 0;
        buffer.write_partitions().for_each(|partition, span| {
            count += 1;
            for (offset, element) in span.iter_mut().enumerate() {
                *element = (partition.start() + offset) as i32;
            }
        });

        assert_eq!(count, 5);
        for (i, &element) in buffer.as_slice().iter().enumerate() {
            assert_eq!(element, i as i32);
        }
    }

    #[test]
    fn write_commits_on_advance_and_on_drop() {
        let mut buffer = CompressedBuffer::<f32, Uncompressed<f32>>::new(8, 4);
        {
            let mut writer = buffer.write_partitions();
            let mut first = writer.next().unwrap();
            first.fill(1.0);
            let mut second = writer.next().unwrap();
            second.fill(2.0);
            // Dropping the writer commits the second partition.
        }

        let mut read = Vec::new();
        buffer
            .read_partitions()
            .for_each(|_, span| read.extend_from_slice(span));
        assert_eq!(read, [1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn write_partition_starts_with_current_content() {
        let mut buffer = CompressedBuffer::<f32, FloatToByte>::new(3, 2);
        buffer.write_partitions().for_each(|_, span| span.fill(7.0));

        let mut writer = buffer.write_partitions();
        let part = writer.next().unwrap();
        assert_eq!(&*part, &[7.0, 7.0]);
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        let mut buffer = CompressedBuffer::<f32, FloatToByte>::new(0, 0);
        assert!(buffer.read_partitions().next().is_none());
        assert!(buffer.write_partitions().next().is_none());
        assert!(buffer.as_compressed_bytes().is_empty());

        let direct = DirectBuffer::<u8>::new(0);
        assert!(direct.read_partitions().next().is_none());
    }

    #[test]
    fn iterations_are_single_pass() {
        let buffer = CompressedBuffer::<f32, FloatToByte>::new(5, 2);
        let mut reader = buffer.read_partitions();
        assert_eq!(reader.remaining(), 3);
        while reader.next().is_some() {}
        assert_eq!(reader.remaining(), 0);
        assert!(reader.next().is_none());

        // A fresh pass starts over.
        assert_eq!(buffer.read_partitions().remaining(), 3);
    }

    struct Empty;

    impl ConstantBitRate<f32> for Empty {
        const COMPRESSED_ELEMENT_SIZE: usize = 0;

        fn compress(&self, _: &[f32], _: &mut [u8]) {}

        fn decompress(&self, _: &[u8], _: &mut [f32]) {}
    }

    #[test]
    #[should_panic(expected = "compressed element size of zero")]
    fn zero_element_size_fails_fast() {
        let _ = CompressedBuffer::<f32, Empty>::with_compression(4, 4, Empty);
    }

    #[test]
    #[should_panic(expected = "exceeds the buffer length 4")]
    fn out_of_range_store_fails_fast() {
        let mut buffer = CompressedBuffer::<f32, FloatToByte>::new(4, 4);
        buffer.store(Partition::new(2, 4), &[0.0; 4]);
    }

    #[test]
    fn zero_partition_length_is_an_error() {
        let result = CompressedBuffer::<f32, FloatToByte>::try_new(4, 0);
        assert!(matches!(
            result,
            Err(BufferError::InvalidPartitionLength { len: 4, preferred: 0 })
        ));
    }
}
