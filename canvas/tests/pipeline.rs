use pixelflow::processing::{
    ColorBlindness, EdgeDetection, ErrorDiffuser, FlipMode, OrderedDitherMatrix, Quantization,
    RotateMode,
};
use pixelflow::{
    Bgr565, Configuration, DynamicImage, Frame, Image, PixelFormat, PropertyTag,
    PropertyValue, ProcessingError, Rectangle, Rgba32, Rgba64, RgbaVector, Size,
};

fn checkerboard(size: usize) -> Image<Rgba32> {
    let mut image = Image::new(size, size);
    for y in 0..size {
        for x in 0..size {
            image.root_mut()[(x, y)] = if (x / 2 + y / 2) % 2 == 0 {
                Rgba32::rgb(200, 30, 60)
            } else {
                Rgba32::rgb(20, 140, 230)
            };
        }
    }
    image
}

#[test]
fn every_operation_runs_on_an_animation() -> Result<(), ProcessingError> {
    let mut image = checkerboard(12);
    let frame = image.root().clone();
    image.push_frame(frame.clone()).expect("same size");
    image.push_frame(frame).expect("same size");

    image.mutate(|ops| {
        ops.hue(45.0)?
            .saturation(-20.0)?
            .brightness(10.0)?
            .alpha(0.9)?
            .color_blindness(ColorBlindness::Deuteranopia)?
            .polaroid()?
            .lomograph()?
            .gaussian_blur(1.0)?
            .gaussian_sharpen(1.0)?
            .pixelate(3)?
            .vignette(Rgba32::BLACK)?
            .glow(Rgba32::WHITE)?
            .background_color(Rgba32::WHITE)?
            .detect_edges(EdgeDetection::Kirsch)?
            .dither(OrderedDitherMatrix::Ordered3x3)?;
        Ok(())
    })?;

    assert_eq!(image.frame_count(), 3);
    let root = image.root().clone();
    assert!(image.frames().iter().all(|frame| *frame == root));
    Ok(())
}

#[test]
fn geometry_changes_keep_frames_together() -> Result<(), ProcessingError> {
    let mut image = Image::<Rgba32>::new(8, 6);
    image.root_mut()[(7, 0)] = Rgba32::WHITE;
    let frame = image.root().clone();
    image.push_frame(frame).expect("same size");
    image
        .metadata_mut()
        .set_property(PropertyTag::ORIENTATION, PropertyValue::Integer(3));

    image.mutate(|ops| {
        ops.auto_orient()?
            .rotate_flip(RotateMode::Rotate90, FlipMode::Vertical)?
            .crop(Rectangle::new(0, 3, 6, 5))?
            .invert()?;
        Ok(())
    })?;

    // Upright, a quarter turn and mirrored rows: the marked corner ends at the bottom left.
    assert_eq!(image.size(), Size::new(6, 5));
    assert_eq!(image.frames()[0].size(), image.size());
    assert_eq!(image.root()[(0, 4)], Rgba32::new(0, 0, 0, 0xff));
    assert_eq!(image.frames()[0][(0, 4)], Rgba32::new(0, 0, 0, 0xff));
    assert_eq!(image.root()[(1, 1)], Rgba32::new(0xff, 0xff, 0xff, 0));
    Ok(())
}

#[test]
fn diffusion_yields_two_colors() -> Result<(), ProcessingError> {
    for diffuser in [
        ErrorDiffuser::Atkinson,
        ErrorDiffuser::Burks,
        ErrorDiffuser::FloydSteinberg,
        ErrorDiffuser::JarvisJudiceNinke,
        ErrorDiffuser::Sierra2,
        ErrorDiffuser::Sierra3,
        ErrorDiffuser::SierraLite,
        ErrorDiffuser::Stucki,
    ] {
        let image = checkerboard(9).generate(|ops| {
            ops.diffuse(diffuser, 0.4)?;
            Ok(())
        })?;

        assert!(
            image
                .root()
                .pixels()
                .as_slice()
                .iter()
                .all(|&p| p == Rgba32::BLACK || p == Rgba32::WHITE),
            "{:?}",
            diffuser
        );
    }
    Ok(())
}

#[test]
fn operations_respect_the_target() -> Result<(), ProcessingError> {
    let original = checkerboard(8);
    let image = original.generate(|ops| {
        ops.within(Rectangle::new(-4, -4, 8, 8))
            .binary_threshold(0.5)?
            .whole_image()
            .quantize(Quantization::Palette, 216)?;
        Ok(())
    })?;

    // Outside the thresholded corner the nearest web-safe color remains.
    assert_eq!(image.root()[(7, 7)], Rgba32::rgb(204, 51, 51));
    let corner = image.root()[(0, 0)];
    assert!(corner == Rgba32::BLACK || corner == Rgba32::WHITE);
    Ok(())
}

#[test]
fn formats_share_processors() {
    let image = checkerboard(6);
    let mut dynamic = DynamicImage::from(image.clone()).convert(PixelFormat::Rgba64);
    dynamic.apply(&pixelflow::processing::Invert).unwrap();

    let back = dynamic.to_rgba32();
    let expected = image.generate(|ops| ops.invert().map(drop)).unwrap();
    assert_eq!(back.root(), expected.root());

    let wide: Image<Rgba64> = image.convert();
    let narrow: Image<Bgr565> = wide.convert();
    assert_eq!(narrow.size(), image.size());
}

#[test]
fn packing_round_trips_bytes() -> Result<(), pixelflow::BufferError> {
    let mut image = checkerboard(10);
    image.set_config(Configuration::new().with_preferred_partition_length(7));
    image.push_frame(Frame::new(10, 10)).expect("same size");

    let packed = image.pack()?;
    assert_eq!(packed.frame_count(), 2);
    assert_eq!(packed.compressed_len(), 2 * 10 * 10 * 4);

    let restored = packed.unpack::<Rgba32>()?;
    assert_eq!(restored.root(), image.root());
    assert_eq!(restored.frames(), image.frames());

    // Float channels come back at byte precision.
    let mut fine = Image::<RgbaVector>::new(1, 1);
    fine.root_mut()[(0, 0)] = RgbaVector::new(0.1, 0.2, 0.3, 1.0);
    let coarse = fine.pack()?.unpack::<RgbaVector>()?;
    let expected = [26.0 / 255.0, 51.0 / 255.0, 77.0 / 255.0, 1.0];
    for (channel, expected) in coarse.root()[(0, 0)].to_array().into_iter().zip(expected) {
        assert!((channel - expected).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn frames_import_and_export_bytes() {
    let bytes: Vec<u8> = (0..16).collect();
    let frame = Frame::<Rgba32>::from_rgba_bytes(2, 2, &bytes).unwrap();
    assert_eq!(frame.to_rgba_bytes(), bytes);
    assert_eq!(&frame.to_bgra_bytes()[..4], &[2, 1, 0, 3]);
    assert_eq!(frame.to_rgb_bytes().len(), 12);

    assert!(Frame::<Rgba32>::from_rgba_bytes(2, 2, &bytes[..15]).is_err());
}

#[test]
fn metadata_travels_with_the_image() -> Result<(), ProcessingError> {
    let mut image = checkerboard(4);
    image.metadata_mut().set_horizontal_resolution(300.0);
    image
        .metadata_mut()
        .set_property(PropertyTag::SOFTWARE, PropertyValue::Text("pixelflow".into()));

    let processed = image.generate(|ops| {
        ops.invert()?;
        Ok(())
    })?;
    assert_eq!(processed.metadata(), image.metadata());
    assert_eq!(processed.convert::<Rgba64>().metadata().horizontal_resolution(), 300.0);
    Ok(())
}
