use pixelflow_texel::Vector4;

/// Equivalent to `f32::powf` but identical on every platform.
#[inline]
pub(crate) fn powf(base: f32, exp: f32) -> f32 {
    libm::powf(base, exp)
}

#[inline]
pub(crate) fn sqrtf(value: f32) -> f32 {
    libm::sqrtf(value)
}

#[inline]
pub(crate) fn expf(value: f32) -> f32 {
    libm::expf(value)
}

/// sRGB transfer function to linear light, for one channel.
#[inline]
pub(crate) fn expand_channel(signal: f32) -> f32 {
    if signal <= 0.04045 {
        signal / 12.92
    } else {
        powf((signal + 0.055) / 1.055, 2.4)
    }
}

/// Linear light to the sRGB transfer function, for one channel.
#[inline]
pub(crate) fn compress_channel(linear: f32) -> f32 {
    if linear <= 0.0031308 {
        linear * 12.92
    } else {
        1.055 * powf(linear, 1.0 / 2.4) - 0.055
    }
}

/// Expand the color channels, alpha is kept.
pub(crate) fn expand(vector: Vector4) -> Vector4 {
    let [r, g, b, a] = vector;
    [expand_channel(r), expand_channel(g), expand_channel(b), a]
}

/// Compress the color channels, alpha is kept.
pub(crate) fn compress(vector: Vector4) -> Vector4 {
    let [r, g, b, a] = vector;
    [compress_channel(r), compress_channel(g), compress_channel(b), a]
}

/// Rec. 709 luma of the color channels.
#[inline]
pub(crate) fn luma(vector: Vector4) -> f32 {
    0.2126 * vector[0] + 0.7152 * vector[1] + 0.0722 * vector[2]
}

pub(crate) fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (a.0 - b.0, a.1 - b.1);
    sqrtf(dx * dx + dy * dy)
}

#[test]
fn compand_round_trip() {
    for step in 0..=100 {
        let signal = step as f32 / 100.0;
        let back = compress_channel(expand_channel(signal));
        assert!((back - signal).abs() < 1e-5, "{} -> {}", signal, back);
    }

    assert_eq!(expand([0.0, 1.0, 0.0, 0.3])[3], 0.3);
}
