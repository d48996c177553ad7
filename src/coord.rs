//! Coordinate element types storable in the index buffer.
//!
//! Box coordinates are kept in one little-endian byte buffer rather than
//! typed arrays, so each supported numeric kind carries its format type tag,
//! byte width, and byte codec. Distance math widens to `f64`.

use std::fmt::Debug;

mod private {
    pub trait Sealed {}
}

/// A numeric type usable as the box coordinate element of a
/// [`PackedRTree`](crate::PackedRTree).
///
/// Implemented for `i8`, `u8`, `i16`, `u16`, `i32`, `u32`, `f32`, and `f64`.
/// The trait is sealed: the set of implementations mirrors the numeric kinds
/// the serialization format can declare.
pub trait Coord: Copy + PartialOrd + Debug + private::Sealed + Send + Sync + 'static {
    /// Type tag written into the header's low nibble.
    const TYPE_TAG: u8;

    /// Serialized width in bytes.
    const BYTES: usize;

    /// Largest representable value, the identity for min-folding.
    const MAX_BOUND: Self;

    /// Smallest representable value, the identity for max-folding.
    const MIN_BOUND: Self;

    /// Reads one value from the start of `src` (little-endian).
    fn read_le(src: &[u8]) -> Self;

    /// Writes this value to the start of `dst` (little-endian).
    fn write_le(self, dst: &mut [u8]);

    /// Widens to `f64` for Hilbert grid mapping and distance math.
    fn to_f64(self) -> f64;
}

macro_rules! impl_coord {
    ($t:ty, $tag:expr) => {
        impl private::Sealed for $t {}

        impl Coord for $t {
            const TYPE_TAG: u8 = $tag;
            const BYTES: usize = size_of::<$t>();
            const MAX_BOUND: Self = <$t>::MAX;
            const MIN_BOUND: Self = <$t>::MIN;

            #[inline]
            fn read_le(src: &[u8]) -> Self {
                let mut raw = [0u8; size_of::<$t>()];
                raw.copy_from_slice(&src[..size_of::<$t>()]);
                <$t>::from_le_bytes(raw)
            }

            #[inline]
            fn write_le(self, dst: &mut [u8]) {
                dst[..size_of::<$t>()].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn to_f64(self) -> f64 {
                f64::from(self)
            }
        }
    };
}

impl_coord!(i8, 0);
impl_coord!(u8, 1);
// Tag 2 is the uint8-clamped kind; buffers carrying it restore as plain u8.
impl_coord!(i16, 3);
impl_coord!(u16, 4);
impl_coord!(i32, 5);
impl_coord!(u32, 6);
impl_coord!(f32, 7);
impl_coord!(f64, 8);

#[cfg(test)]
mod tests {
    use super::Coord;

    #[test]
    fn round_trips_le_bytes() {
        let mut buf = [0u8; 8];
        12345.678f64.write_le(&mut buf);
        assert_eq!(f64::read_le(&buf), 12345.678, "f64 codec should round-trip");

        let mut buf = [0u8; 4];
        (-77i32).write_le(&mut buf);
        assert_eq!(i32::read_le(&buf), -77, "i32 codec should round-trip");

        let mut buf = [0u8; 2];
        65535u16.write_le(&mut buf);
        assert_eq!(u16::read_le(&buf), 65535, "u16 codec should round-trip");
    }

    #[test]
    fn tags_match_format_table() {
        assert_eq!(i8::TYPE_TAG, 0, "i8 tag");
        assert_eq!(u8::TYPE_TAG, 1, "u8 tag");
        assert_eq!(i16::TYPE_TAG, 3, "i16 tag");
        assert_eq!(u16::TYPE_TAG, 4, "u16 tag");
        assert_eq!(i32::TYPE_TAG, 5, "i32 tag");
        assert_eq!(u32::TYPE_TAG, 6, "u32 tag");
        assert_eq!(f32::TYPE_TAG, 7, "f32 tag");
        assert_eq!(f64::TYPE_TAG, 8, "f64 tag");
    }
}
