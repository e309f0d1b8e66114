// Distributed under The MIT License (MIT)
//
// Copyright (c) 2024 The `pixelflow` developers
//! Concrete pixel encodings.
use bytemuck::{Pod, Zeroable};

use crate::pixel::{
    bits_to_unit, clamp_vector, u16_to_unit, u8_to_unit, unit_to_bits, unit_to_u16,
    unit_to_u8, Pixel, Vector4,
};

/// Four 8-bit channels in `r, g, b, a` memory order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Four 8-bit channels in `b, g, r, a` memory order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Bgra32 {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

/// Three 8-bit channels in `r, g, b` memory order, always opaque.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Rgb24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Three 8-bit channels in `b, g, r` memory order, always opaque.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Bgr24 {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

/// A single 8-bit alpha channel. Color reads as black.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Alpha8(pub u8);

/// Four 16-bit channels in `r, g, b, a` memory order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba64 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub a: u16,
}

/// 5 bits blue, 6 bits green, 5 bits red, packed into one native-endian `u16`.
///
/// Red occupies the high bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bgr565(pub u16);

/// Four `f32` channels, the working format of the convolution processors.
///
/// Packing clamps like every other format, so a stored vector is always normalized.
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct RgbaVector {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba32 {
    pub const BLACK: Self = Rgba32::new(0, 0, 0, 0xff);
    pub const WHITE: Self = Rgba32::new(0xff, 0xff, 0xff, 0xff);
    pub const TRANSPARENT: Self = Rgba32::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba32 { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba32 { r, g, b, a: 0xff }
    }
}

impl Bgr565 {
    pub fn red(self) -> u16 {
        (self.0 >> 11) & 0x1f
    }

    pub fn green(self) -> u16 {
        (self.0 >> 5) & 0x3f
    }

    pub fn blue(self) -> u16 {
        self.0 & 0x1f
    }
}

impl RgbaVector {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        RgbaVector { r, g, b, a }
    }

    pub fn from_array([r, g, b, a]: Vector4) -> Self {
        RgbaVector { r, g, b, a }
    }

    pub fn to_array(self) -> Vector4 {
        [self.r, self.g, self.b, self.a]
    }
}

impl PartialEq for RgbaVector {
    fn eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

impl Pixel for Rgba32 {
    const PRECISION: f32 = 1.0 / 255.0;

    fn to_vector4(self) -> Vector4 {
        [self.r, self.g, self.b, self.a].map(u8_to_unit)
    }

    fn from_vector4(vector: Vector4) -> Self {
        let [r, g, b, a] = vector.map(unit_to_u8);
        Rgba32 { r, g, b, a }
    }

    fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba32 { r, g, b, a }
    }

    fn to_rgba_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Pixel for Bgra32 {
    const PRECISION: f32 = 1.0 / 255.0;

    fn to_vector4(self) -> Vector4 {
        [self.r, self.g, self.b, self.a].map(u8_to_unit)
    }

    fn from_vector4(vector: Vector4) -> Self {
        let [r, g, b, a] = vector.map(unit_to_u8);
        Bgra32 { b, g, r, a }
    }

    fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        Bgra32 { b, g, r, a }
    }

    fn to_rgba_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Pixel for Rgb24 {
    const PRECISION: f32 = 1.0 / 255.0;

    fn to_vector4(self) -> Vector4 {
        [self.r, self.g, self.b, 0xff].map(u8_to_unit)
    }

    fn from_vector4(vector: Vector4) -> Self {
        let [r, g, b, _] = vector.map(unit_to_u8);
        Rgb24 { r, g, b }
    }

    fn from_bytes(r: u8, g: u8, b: u8, _: u8) -> Self {
        Rgb24 { r, g, b }
    }

    fn to_rgba_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xff]
    }
}

impl Pixel for Bgr24 {
    const PRECISION: f32 = 1.0 / 255.0;

    fn to_vector4(self) -> Vector4 {
        [self.r, self.g, self.b, 0xff].map(u8_to_unit)
    }

    fn from_vector4(vector: Vector4) -> Self {
        let [r, g, b, _] = vector.map(unit_to_u8);
        Bgr24 { b, g, r }
    }

    fn from_bytes(r: u8, g: u8, b: u8, _: u8) -> Self {
        Bgr24 { b, g, r }
    }

    fn to_rgba_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xff]
    }
}

impl Pixel for Alpha8 {
    const PRECISION: f32 = 1.0 / 255.0;
    const HAS_COLOR: bool = false;

    fn to_vector4(self) -> Vector4 {
        [0.0, 0.0, 0.0, u8_to_unit(self.0)]
    }

    fn from_vector4(vector: Vector4) -> Self {
        Alpha8(unit_to_u8(vector[3]))
    }

    fn from_bytes(_: u8, _: u8, _: u8, a: u8) -> Self {
        Alpha8(a)
    }
}

impl Pixel for Rgba64 {
    const PRECISION: f32 = 1.0 / 65535.0;

    fn to_vector4(self) -> Vector4 {
        [self.r, self.g, self.b, self.a].map(u16_to_unit)
    }

    fn from_vector4(vector: Vector4) -> Self {
        let [r, g, b, a] = vector.map(unit_to_u16);
        Rgba64 { r, g, b, a }
    }

    fn from_bytes(r: u8, g: u8, b: u8, a: u8) -> Self {
        // 0xab scales exactly to 0xabab.
        let widen = |c: u8| u16::from(c) * 0x101;
        Rgba64 {
            r: widen(r),
            g: widen(g),
            b: widen(b),
            a: widen(a),
        }
    }
}

impl Pixel for Bgr565 {
    const PRECISION: f32 = 1.0 / 31.0;

    fn to_vector4(self) -> Vector4 {
        [
            bits_to_unit(self.red(), 5),
            bits_to_unit(self.green(), 6),
            bits_to_unit(self.blue(), 5),
            1.0,
        ]
    }

    fn from_vector4(vector: Vector4) -> Self {
        let r = unit_to_bits(vector[0], 5);
        let g = unit_to_bits(vector[1], 6);
        let b = unit_to_bits(vector[2], 5);
        Bgr565((r << 11) | (g << 5) | b)
    }
}

impl Pixel for RgbaVector {
    const PRECISION: f32 = 0.0;

    fn to_vector4(self) -> Vector4 {
        self.to_array()
    }

    fn from_vector4(vector: Vector4) -> Self {
        RgbaVector::from_array(clamp_vector(vector))
    }
}

impl From<Rgba32> for RgbaVector {
    fn from(pixel: Rgba32) -> Self {
        RgbaVector::from_array(pixel.to_vector4())
    }
}

impl From<RgbaVector> for Rgba32 {
    fn from(pixel: RgbaVector) -> Self {
        Rgba32::from_vector4(pixel.to_array())
    }
}
