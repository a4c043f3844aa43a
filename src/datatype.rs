//! Numeric format descriptors for accelerator streams.
//!
//! A [`DataType`] describes how one value is laid out on the wire: its
//! bitwidth, whether it is signed, and whether it is a plain integer, a
//! fixed-point number or an IEEE-754 single. Descriptors carry no data and
//! are `Copy`; the codec takes them by value.
//!
//! # Beispiel
//!
//! ```
//! use accelbits::DataType;
//!
//! let dt: DataType = "FIXED<8,4>".parse().unwrap();
//! assert_eq!(dt.bitwidth(), 8);
//! assert_eq!(dt.frac_bits(), 4);
//! assert_eq!(dt.max(), 7.9375);
//! assert_eq!(dt.to_string(), "FIXED<8,4>");
//! ```

use core::fmt;
use core::str::FromStr;

use crate::{Error, Result};

/// Largest supported bitwidth.
pub const MAX_BITWIDTH: u32 = 64;

/// Numeric format of one stream element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Unsigned integer of `n` bits.
    UInt(u8),
    /// Two's complement signed integer of `n` bits.
    Int(u8),
    /// Signed fixed-point number with `bits` total and `int_bits` integer bits.
    Fixed { bits: u8, int_bits: u8 },
    /// IEEE-754 binary32.
    Float32,
    /// Single bit, values 0 and 1.
    Binary,
    /// Two-bit signed integer restricted to -1, 0 and 1.
    Ternary,
    /// Single bit encoding -1 (bit 0) and +1 (bit 1).
    Bipolar,
}

/// Smallest host type that holds every value of a [`DataType`] losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl DataType {
    /// Checked constructor for [`DataType::UInt`].
    pub fn uint(bits: u32) -> Result<Self> {
        check_bitwidth(bits)?;
        Ok(Self::UInt(bits as u8))
    }

    /// Checked constructor for [`DataType::Int`].
    pub fn int(bits: u32) -> Result<Self> {
        check_bitwidth(bits)?;
        Ok(Self::Int(bits as u8))
    }

    /// Checked constructor for [`DataType::Fixed`].
    pub fn fixed(bits: u32, int_bits: u32) -> Result<Self> {
        check_bitwidth(bits)?;
        if int_bits == 0 || int_bits > bits {
            return Err(Error::InvalidFixedPoint { bits, int_bits });
        }
        Ok(Self::Fixed { bits: bits as u8, int_bits: int_bits as u8 })
    }

    /// Validates a descriptor built directly from the enum variants.
    pub fn validate(self) -> Result<()> {
        match self {
            Self::UInt(n) | Self::Int(n) => check_bitwidth(u32::from(n)),
            Self::Fixed { bits, int_bits } => Self::fixed(u32::from(bits), u32::from(int_bits)).map(|_| ()),
            Self::Float32 | Self::Binary | Self::Ternary | Self::Bipolar => Ok(()),
        }
    }

    /// Number of bits one value occupies in a packed stream.
    #[inline]
    pub const fn bitwidth(self) -> u32 {
        match self {
            Self::UInt(n) | Self::Int(n) => n as u32,
            Self::Fixed { bits, .. } => bits as u32,
            Self::Float32 => 32,
            Self::Binary | Self::Bipolar => 1,
            Self::Ternary => 2,
        }
    }

    /// Whether the value range includes negative numbers.
    #[inline]
    pub const fn sign(self) -> bool {
        !matches!(self, Self::UInt(_) | Self::Binary)
    }

    /// Whether every value of the type is an integer.
    #[inline]
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Fixed { .. } | Self::Float32)
    }

    #[inline]
    pub const fn is_fixed_point(self) -> bool {
        matches!(self, Self::Fixed { .. })
    }

    /// Bits right of the binary point. Zero for everything but fixed-point.
    #[inline]
    pub const fn frac_bits(self) -> u32 {
        match self {
            Self::Fixed { bits, int_bits } => bits.saturating_sub(int_bits) as u32,
            _ => 0,
        }
    }

    /// Bits left of the binary point (fixed-point) or the full width otherwise.
    #[inline]
    pub const fn int_bits(self) -> u32 {
        match self {
            Self::Fixed { int_bits, .. } => int_bits as u32,
            _ => self.bitwidth(),
        }
    }

    /// Mask selecting the low `bitwidth()` bits of a `u64`.
    #[inline]
    pub const fn mask(self) -> u64 {
        let bw = self.bitwidth();
        if bw >= 64 {
            u64::MAX
        } else {
            (1u64 << bw) - 1
        }
    }

    /// Smallest representable value.
    pub fn min(self) -> f64 {
        match self {
            Self::UInt(_) | Self::Binary => 0.0,
            Self::Int(n) => -(2f64.powi(i32::from(n) - 1)),
            Self::Fixed { int_bits, .. } => -(2f64.powi(i32::from(int_bits) - 1)),
            Self::Float32 => f64::from(f32::MIN),
            Self::Ternary | Self::Bipolar => -1.0,
        }
    }

    /// Largest representable value.
    pub fn max(self) -> f64 {
        match self {
            Self::UInt(n) => 2f64.powi(i32::from(n)) - 1.0,
            Self::Int(n) => 2f64.powi(i32::from(n) - 1) - 1.0,
            Self::Fixed { int_bits, .. } => {
                2f64.powi(i32::from(int_bits) - 1) - 2f64.powi(-(self.frac_bits() as i32))
            }
            Self::Float32 => f64::from(f32::MAX),
            Self::Binary | Self::Ternary | Self::Bipolar => 1.0,
        }
    }

    /// Prueft ob `value` exakt darstellbar ist (Bereich und Raster).
    pub fn allowed(self, value: f64) -> bool {
        if !(self.min()..=self.max()).contains(&value) {
            return false;
        }
        match self {
            Self::Float32 => true,
            Self::Bipolar => value == -1.0 || value == 1.0,
            Self::Fixed { .. } => {
                let scaled = value * 2f64.powi(self.frac_bits() as i32);
                scaled.fract() == 0.0
            }
            _ => value.fract() == 0.0,
        }
    }

    /// Number of `T`-sized storage units needed to hold one value.
    ///
    /// `1` when the bitwidth fits into one unit, otherwise
    /// `ceil(bitwidth / (size_of::<T>() * 8))`.
    pub fn required_elements<T>(self) -> usize {
        let unit_bits = (core::mem::size_of::<T>() * 8).max(1);
        let bw = self.bitwidth() as usize;
        if bw <= unit_bits {
            1
        } else {
            bw.div_ceil(unit_bits)
        }
    }

    /// Byte length and trailing padding bits of `count` packed values.
    pub fn packed_len(self, count: usize) -> (usize, usize) {
        let bits = count * self.bitwidth() as usize;
        let bytes = bits.div_ceil(8);
        (bytes, bytes * 8 - bits)
    }

    /// Host type chosen by [`crate::codec::unpack_native`].
    pub const fn native_type(self) -> NativeType {
        match self {
            Self::UInt(n) => match n {
                0..=8 => NativeType::U8,
                9..=16 => NativeType::U16,
                17..=32 => NativeType::U32,
                _ => NativeType::U64,
            },
            Self::Int(n) => match n {
                0..=8 => NativeType::I8,
                9..=16 => NativeType::I16,
                17..=32 => NativeType::I32,
                _ => NativeType::I64,
            },
            // f32 hat 24 Mantissenbits; breitere Festkommawerte brauchen f64
            Self::Fixed { bits, .. } => {
                if bits <= 24 {
                    NativeType::F32
                } else {
                    NativeType::F64
                }
            }
            Self::Float32 => NativeType::F32,
            Self::Binary => NativeType::U8,
            Self::Ternary | Self::Bipolar => NativeType::I8,
        }
    }
}

fn check_bitwidth(bits: u32) -> Result<()> {
    if bits == 0 || bits > MAX_BITWIDTH {
        return Err(Error::UnsupportedBitwidth(bits));
    }
    Ok(())
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(n) => write!(f, "UINT{n}"),
            Self::Int(n) => write!(f, "INT{n}"),
            Self::Fixed { bits, int_bits } => write!(f, "FIXED<{bits},{int_bits}>"),
            Self::Float32 => f.write_str("FLOAT32"),
            Self::Binary => f.write_str("BINARY"),
            Self::Ternary => f.write_str("TERNARY"),
            Self::Bipolar => f.write_str("BIPOLAR"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_uppercase();
        let unknown = || Error::UnknownDataType(s.to_string());
        match name.as_str() {
            "FLOAT32" => return Ok(Self::Float32),
            "BINARY" => return Ok(Self::Binary),
            "TERNARY" => return Ok(Self::Ternary),
            "BIPOLAR" => return Ok(Self::Bipolar),
            _ => {}
        }
        // UINT vor INT pruefen, sonst matcht "INT" das Suffix
        if let Some(rest) = name.strip_prefix("UINT") {
            let bits = rest.parse::<u32>().map_err(|_| unknown())?;
            return Self::uint(bits);
        }
        if let Some(rest) = name.strip_prefix("INT") {
            let bits = rest.parse::<u32>().map_err(|_| unknown())?;
            return Self::int(bits);
        }
        if let Some(rest) = name.strip_prefix("FIXED<").and_then(|r| r.strip_suffix('>')) {
            let (bits, int_bits) = rest.split_once(',').ok_or_else(unknown)?;
            let bits = bits.trim().parse::<u32>().map_err(|_| unknown())?;
            let int_bits = int_bits.trim().parse::<u32>().map_err(|_| unknown())?;
            return Self::fixed(bits, int_bits);
        }
        Err(unknown())
    }
}
