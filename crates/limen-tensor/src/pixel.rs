use std::fmt::Debug;

/// The numeric family a pixel type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelKind {
    /// Signed or unsigned integer intensities.
    Integer,
    /// IEEE floating point intensities.
    Float,
}

/// An element type usable as an image intensity.
///
/// Every pixel type names the floating point type its statistics are computed in
/// and the nominal range of values it can hold.
pub trait Pixel:
    Copy + Send + Sync + PartialOrd + Debug + Default + num_traits::NumCast + 'static
{
    /// The working float precision for statistics derived from this type.
    type Float: FloatPixel;

    /// Whether the type holds integer or floating point values.
    const KIND: PixelKind;

    /// The `(min, max)` range of the type.
    ///
    /// Floating point types report the conventional `(-1, 1)` intensity range.
    fn dtype_range() -> (f64, f64);

    /// Widen the value to `f64`.
    fn as_f64(self) -> f64;

    /// Returns true for integer pixel types.
    #[inline]
    fn is_integer() -> bool {
        Self::KIND == PixelKind::Integer
    }
}

/// A floating point pixel type, its own working precision.
pub trait FloatPixel: Pixel<Float = Self> + num_traits::Float {
    /// Narrow an `f64` into this type, rounding to the nearest representable value.
    fn from_f64(v: f64) -> Self;
}

// integer statistics are always computed in double precision
macro_rules! impl_int_pixel {
    ($($t:ty),* $(,)?) => {
        $(
            impl Pixel for $t {
                type Float = f64;
                const KIND: PixelKind = PixelKind::Integer;

                #[inline]
                fn dtype_range() -> (f64, f64) {
                    (<$t>::MIN as f64, <$t>::MAX as f64)
                }

                #[inline]
                fn as_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_int_pixel!(u8, i8, u16, i16, u32, i32, u64, i64);

impl Pixel for f32 {
    type Float = f32;
    const KIND: PixelKind = PixelKind::Float;

    #[inline]
    fn dtype_range() -> (f64, f64) {
        (-1.0, 1.0)
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Pixel for f64 {
    type Float = f64;
    const KIND: PixelKind = PixelKind::Float;

    #[inline]
    fn dtype_range() -> (f64, f64) {
        (-1.0, 1.0)
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

impl FloatPixel for f32 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl FloatPixel for f64 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}
