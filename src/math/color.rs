//! Color data types: linear [`Rgb`]/[`Rgba`] plus the sRGB transfer function
//! used when the pixel scheduler writes a finished pixel.
//!
//! Shaped closely after a small immutable linear-color type: NaN is banned
//! (so the types can implement `Eq`), components are otherwise unclamped
//! (bright light sources may "overexpose"), and alpha is not premultiplied.

use cgmath::{ElementWise as _, Vector3, Vector4};
pub use ordered_float::{FloatIsNan, NotNan};
use std::convert::{TryFrom, TryInto};
use std::ops::{Add, AddAssign, Mul, Sub};

/// A linear (gamma = 1) floating-point RGB color value.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Rgb(Vector3<NotNan<f32>>);

/// A linear (gamma = 1) floating-point RGBA color value. Alpha is not
/// premultiplied.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Rgba(Vector4<NotNan<f32>>);

const NN0: NotNan<f32> = unsafe { NotNan::unchecked_new(0.0) };
const NN1: NotNan<f32> = unsafe { NotNan::unchecked_new(1.0) };

impl Rgb {
    pub const ZERO: Rgb = Rgb(Vector3::new(NN0, NN0, NN0));
    pub const ONE: Rgb = Rgb(Vector3::new(NN1, NN1, NN1));

    /// Constructs a color from components. Panics if any component is NaN.
    #[inline]
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self::try_from(Vector3::new(r, g, b)).expect("color components may not be NaN")
    }

    #[inline]
    pub const fn red(self) -> NotNan<f32> {
        self.0.x
    }
    #[inline]
    pub const fn green(self) -> NotNan<f32> {
        self.0.y
    }
    #[inline]
    pub const fn blue(self) -> NotNan<f32> {
        self.0.z
    }

    /// Squared magnitude, used to test emitted-color length against the
    /// "emissive" threshold in the ray-trace evaluator.
    #[inline]
    pub fn length(self) -> f32 {
        let v: Vector3<f32> = self.into();
        (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
    }

    #[inline]
    pub const fn with_alpha(self, alpha: NotNan<f32>) -> Rgba {
        Rgba(Vector4::new(self.0.x, self.0.y, self.0.z, alpha))
    }
    #[inline]
    pub const fn with_alpha_one(self) -> Rgba {
        self.with_alpha(NN1)
    }

    /// Converts to non-linear sRGB, clamping to `[0, 1]` first. The pixel
    /// scheduler applies this once per finished pixel.
    #[inline]
    pub fn to_srgb_bytes(self) -> [u8; 3] {
        let v: Vector3<f32> = self.into();
        [
            to_srgb_byte(v.x),
            to_srgb_byte(v.y),
            to_srgb_byte(v.z),
        ]
    }
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba(Vector4::new(NN0, NN0, NN0, NN0));
    pub const BLACK: Rgba = Rgba(Vector4::new(NN0, NN0, NN0, NN1));
    pub const WHITE: Rgba = Rgba(Vector4::new(NN1, NN1, NN1, NN1));

    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::try_from(Vector4::new(r, g, b, a)).expect("color components may not be NaN")
    }

    #[inline]
    pub const fn alpha(self) -> NotNan<f32> {
        self.0.w
    }

    #[inline]
    pub fn to_rgb(self) -> Rgb {
        Rgb(self.0.truncate())
    }
}

impl From<Rgb> for Vector3<f32> {
    fn from(value: Rgb) -> Self {
        value.0.map(NotNan::into_inner)
    }
}
impl From<Rgba> for Vector4<f32> {
    fn from(value: Rgba) -> Self {
        value.0.map(NotNan::into_inner)
    }
}

impl TryFrom<Vector3<f32>> for Rgb {
    type Error = FloatIsNan;
    fn try_from(value: Vector3<f32>) -> Result<Self, Self::Error> {
        Ok(Self(Vector3::new(
            value.x.try_into()?,
            value.y.try_into()?,
            value.z.try_into()?,
        )))
    }
}
impl TryFrom<Vector4<f32>> for Rgba {
    type Error = FloatIsNan;
    fn try_from(value: Vector4<f32>) -> Result<Self, Self::Error> {
        Ok(Self(Vector4::new(
            value.x.try_into()?,
            value.y.try_into()?,
            value.z.try_into()?,
            value.w.try_into()?,
        )))
    }
}

impl Add<Rgb> for Rgb {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}
impl AddAssign<Rgb> for Rgb {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}
impl Sub<Rgb> for Rgb {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}
/// Multiplies two color values componentwise.
impl Mul<Rgb> for Rgb {
    type Output = Self;
    fn mul(self, other: Rgb) -> Self {
        Self(self.0.mul_element_wise(other.0))
    }
}
/// Multiplies this color value by a scalar. Panics if the scalar is NaN.
impl Mul<f32> for Rgb {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self(self.0 * NotNan::new(scalar).unwrap())
    }
}

impl std::fmt::Debug for Rgb {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            fmt,
            "Rgb({:?}, {:?}, {:?})",
            self.red().into_inner(),
            self.green().into_inner(),
            self.blue().into_inner()
        )
    }
}
impl std::fmt::Debug for Rgba {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "Rgba({:?})", Vector4::<f32>::from(*self))
    }
}

/// Converts a single linear component to non-linear sRGB in `[0, 1]`.
pub fn linear_to_srgb(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    if x <= 0.003_130_8 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

/// Converts a single non-linear sRGB component to linear in `[0, 1]`.
pub fn srgb_to_linear(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    if x <= 0.040_45 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

fn to_srgb_byte(linear: f32) -> u8 {
    (linear_to_srgb(linear) * 255.0 + 0.5) as u8
}
