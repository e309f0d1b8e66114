use pixelflow_texel::{
    CompressedBuffer, DirectBuffer, FloatToByte, FloatToU16, PackedBuffer, PartitionLayout,
    Uncompressed,
};

#[test]
fn partitions_cover_every_element_once() {
    for len in [0usize, 1, 2, 7, 64, 100, 1023, 1024, 1025] {
        for preferred in [1usize, 2, 3, 64, 128, 1024, 4096] {
            let layout = PartitionLayout::new(len, preferred).unwrap();
            let mut covered = 0;
            let mut short = 0;
            for partition in layout.partitions() {
                assert_eq!(partition.start(), covered, "{}/{}", len, preferred);
                assert!(partition.len() <= preferred);
                assert!(!partition.is_empty());
                if partition.len() < preferred {
                    short += 1;
                }
                covered = partition.end();
            }

            assert_eq!(covered, len);
            assert!(short <= 1);
            assert_eq!(layout.partitions().count(), len.div_ceil(preferred));
        }
    }
}

#[test]
fn last_partition_holds_the_remainder() {
    let layout = PartitionLayout::new(1025, 128).unwrap();
    let last = layout.partitions().last().unwrap();
    assert_eq!(last.start(), 1024);
    assert_eq!(last.len(), 1);

    let exact = PartitionLayout::new(1024, 128).unwrap();
    assert_eq!(exact.partitions().last().unwrap().len(), 128);
}

fn fill_ramp<B: PackedBuffer<f32>>(buffer: &mut B) {
    buffer.write_partitions().for_each(|partition, span| {
        for (offset, value) in span.iter_mut().enumerate() {
            *value = ((partition.start() + offset) % 251) as f32;
        }
    });
}

fn read_all<B: PackedBuffer<f32>>(buffer: &B) -> Vec<f32> {
    let mut values = Vec::with_capacity(buffer.len());
    let mut reader = buffer.read_partitions();
    while let Some(part) = reader.next() {
        values.extend_from_slice(&part);
    }
    values
}

#[test]
fn integral_values_survive_every_backing() {
    let expected: Vec<f32> = (0..1000).map(|i| (i % 251) as f32).collect();

    let mut bytes = CompressedBuffer::<f32, FloatToByte>::new(1000, 96);
    fill_ramp(&mut bytes);
    assert_eq!(read_all(&bytes), expected);

    let mut wide = CompressedBuffer::<f32, FloatToU16>::new(1000, 1000);
    fill_ramp(&mut wide);
    assert_eq!(read_all(&wide), expected);
    assert_eq!(wide.as_compressed_bytes().len(), 2000);

    let mut exact = CompressedBuffer::<f32, Uncompressed<f32>>::new(1000, 33);
    fill_ramp(&mut exact);
    assert_eq!(read_all(&exact), expected);

    let mut direct = DirectBuffer::<f32>::with_partition_len(1000, 128).unwrap();
    fill_ramp(&mut direct);
    assert_eq!(read_all(&direct), expected);
    assert_eq!(direct.as_slice(), &expected[..]);
}

#[test]
fn fractional_values_are_rounded_to_bytes() {
    let mut buffer = CompressedBuffer::<f32, FloatToByte>::new(300, 64);
    buffer.write_partitions().for_each(|partition, span| {
        for (offset, value) in span.iter_mut().enumerate() {
            *value = (partition.start() + offset) as f32 * 0.9;
        }
    });

    for (index, value) in read_all(&buffer).into_iter().enumerate() {
        let written = index as f32 * 0.9;
        let expected = written.min(255.0);
        assert!((value - expected).abs() <= 0.5, "{} -> {}", written, value);
    }
}
