// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `pixelflow` developers
//! The capability set every concrete pixel encoding provides.
use core::fmt;

use bytemuck::Pod;

/// A color in normalized `[r, g, b, a]` form, each component nominally in `[0, 1]`.
pub type Vector4 = [f32; 4];

/// A pixel encoding that algorithms can be written against.
///
/// All conversions go through the canonical [`Vector4`]. Packing clamps every component into the
/// representable range, it never wraps. Conversions are lossy only to the width of the channels:
/// for any pixel `p`, each component of `P::from_vector4(v).to_vector4()` lies within
/// [`PRECISION`] of the clamped component of `v`, and `P::from_vector4(p.to_vector4()) == p`.
///
/// Equality is equality of the byte representation. The derived comparisons of the integer
/// formats are exactly that, formats with float channels compare their bits.
///
/// [`PRECISION`]: Pixel::PRECISION
pub trait Pixel: Pod + Default + PartialEq + Send + Sync + fmt::Debug + 'static {
    /// The largest per-component error of a round trip through [`Vector4`].
    const PRECISION: f32;

    /// Whether the format stores color channels. Alpha-only formats do not.
    const HAS_COLOR: bool = true;

    /// Expand to normalized components.
    fn to_vector4(self) -> Vector4;

    /// Pack normalized components, clamping each into `[0, 1]` first.
    fn from_vector4(vector: Vector4) -> Self;

    fn pack_from_vector4(&mut self, vector: Vector4) {
        *self = Self::from_vector4(vector);
    }

    /// Construct from 8-bit channel values.
    fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_vector4([u8_to_unit(r), u8_to_unit(g), u8_to_unit(b), u8_to_unit(a)])
    }

    fn pack_from_bytes(&mut self, r: u8, g: u8, b: u8, a: u8) {
        *self = Self::from_bytes(r, g, b, a);
    }

    /// The 8-bit channel values in `[r, g, b, a]` order.
    fn to_rgba_bytes(self) -> [u8; 4] {
        self.to_vector4().map(unit_to_u8)
    }

    /// Write `r, g, b` to `bytes[offset..offset + 3]`.
    fn to_xyz_bytes(self, bytes: &mut [u8], offset: usize) {
        let [r, g, b, _] = self.to_rgba_bytes();
        bytes[offset..offset + 3].copy_from_slice(&[r, g, b]);
    }

    /// Write `r, g, b, a` to `bytes[offset..offset + 4]`.
    fn to_xyzw_bytes(self, bytes: &mut [u8], offset: usize) {
        bytes[offset..offset + 4].copy_from_slice(&self.to_rgba_bytes());
    }

    /// Write `b, g, r` to `bytes[offset..offset + 3]`.
    fn to_zyx_bytes(self, bytes: &mut [u8], offset: usize) {
        let [r, g, b, _] = self.to_rgba_bytes();
        bytes[offset..offset + 3].copy_from_slice(&[b, g, r]);
    }

    /// Write `b, g, r, a` to `bytes[offset..offset + 4]`.
    fn to_zyxw_bytes(self, bytes: &mut [u8], offset: usize) {
        let [r, g, b, a] = self.to_rgba_bytes();
        bytes[offset..offset + 4].copy_from_slice(&[b, g, r, a]);
    }
}

/// Clamp into `[0, 1]`. Not-a-number maps to zero.
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    if value >= 1.0 {
        1.0
    } else if value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Clamp every component of a vector into `[0, 1]`.
#[inline]
pub fn clamp_vector(vector: Vector4) -> Vector4 {
    vector.map(clamp_unit)
}

#[inline]
pub fn u8_to_unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

#[inline]
pub fn unit_to_u8(value: f32) -> u8 {
    (clamp_unit(value) * 255.0 + 0.5) as u8
}

#[inline]
pub fn u16_to_unit(value: u16) -> f32 {
    f32::from(value) / 65535.0
}

#[inline]
pub fn unit_to_u16(value: f32) -> u16 {
    (clamp_unit(value) * 65535.0 + 0.5) as u16
}

/// Scale into an unsigned field of `bits` width, rounding to nearest.
#[inline]
pub(crate) fn unit_to_bits(value: f32, bits: u32) -> u16 {
    let max = ((1u32 << bits) - 1) as f32;
    (clamp_unit(value) * max + 0.5) as u16
}

#[inline]
pub(crate) fn bits_to_unit(value: u16, bits: u32) -> f32 {
    let max = ((1u32 << bits) - 1) as f32;
    f32::from(value) / max
}

#[test]
fn clamping_never_wraps() {
    assert_eq!(clamp_unit(-0.5), 0.0);
    assert_eq!(clamp_unit(1.5), 1.0);
    assert_eq!(clamp_unit(f32::NAN), 0.0);
    assert_eq!(clamp_unit(f32::INFINITY), 1.0);
    assert_eq!(unit_to_u8(2.0), 255);
    assert_eq!(unit_to_u8(-1.0), 0);
    assert_eq!(unit_to_u16(7.0), u16::MAX);
    assert_eq!(unit_to_bits(1.0, 5), 31);
    assert_eq!(unit_to_bits(1.0, 6), 63);
}

#[test]
fn byte_scale_is_exact() {
    for value in 0..=255u8 {
        assert_eq!(unit_to_u8(u8_to_unit(value)), value);
    }
}
