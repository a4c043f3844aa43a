//! Central error types for packing, unpacking and staging.
//!
//! Configuration errors (invalid descriptors, zero-sized buffers) are raised
//! at construction time. Shape and length errors are raised by the call that
//! received the malformed input. A full or empty ring buffer is not an error;
//! the non-blocking ring operations report it through their `bool` result.

use core::fmt;

/// All error types raised by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Bitwidth outside `1..=64`.
    UnsupportedBitwidth(u32),
    /// Fixed-point descriptor whose integer bits are zero or exceed the total width.
    InvalidFixedPoint {
        /// Total width in bits.
        bits: u32,
        /// Bits left of the binary point.
        int_bits: u32,
    },
    /// A datatype name could not be parsed (e.g. `"INT0"`, `"FIXED<8>"`).
    UnknownDataType(String),
    /// `unpack` was called with an empty byte sequence.
    ///
    /// `pack` accepts empty input and returns an empty sequence; the
    /// asymmetry is intentional and kept for compatibility with callers
    /// that treat an empty device buffer as a transfer fault.
    EmptyInput,
    /// The payload bit length (`bits - padding`) is not a multiple of the
    /// element bitwidth, or the padding exceeds the sequence.
    BitLengthMismatch {
        /// Total bits in the byte sequence.
        bits: usize,
        /// Declared padding bits in the final byte(s).
        padding: usize,
        /// Element bitwidth of the descriptor.
        bitwidth: u32,
    },
    /// Two buffers that must have equal length do not.
    LengthMismatch { expected: usize, found: usize },
    /// A tensor shape with no dimensions.
    EmptyShape,
    /// The product of a shape does not match the number of elements.
    ShapeMismatch { shape: Vec<usize>, elements: usize },
    /// A ring buffer with zero parts or zero elements per part.
    ZeroCapacity,
    /// `parts * elements_per_part` overflows `usize`.
    CapacityOverflow { parts: usize, elements_per_part: usize },
    /// A store/read length that is not a whole number of parts.
    PartSizeMismatch { len: usize, part_len: usize },
    /// A store larger than the whole ring buffer.
    CapacityExceeded { len: usize, capacity: usize },
    /// An option value failed validation.
    InvalidOption(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBitwidth(bits) => write!(f, "unsupported bitwidth {bits}, expected 1..=64"),
            Self::InvalidFixedPoint { bits, int_bits } => {
                write!(f, "invalid fixed-point format: {int_bits} integer bits in {bits} total bits")
            }
            Self::UnknownDataType(name) => write!(f, "unknown datatype '{name}'"),
            Self::EmptyInput => write!(f, "cannot unpack an empty byte sequence"),
            Self::BitLengthMismatch { bits, padding, bitwidth } => write!(
                f,
                "bit length mismatch: {bits} bits minus {padding} padding bits is not a multiple of bitwidth {bitwidth}"
            ),
            Self::LengthMismatch { expected, found } => {
                write!(f, "length mismatch: expected {expected}, found {found}")
            }
            Self::EmptyShape => write!(f, "tensor shape must have at least one dimension"),
            Self::ShapeMismatch { shape, elements } => {
                write!(f, "shape {shape:?} does not cover {elements} elements")
            }
            Self::ZeroCapacity => write!(f, "ring buffer capacity must be greater than zero"),
            Self::CapacityOverflow { parts, elements_per_part } => write!(
                f,
                "ring buffer capacity overflows: {parts} parts x {elements_per_part} elements"
            ),
            Self::PartSizeMismatch { len, part_len } => {
                write!(f, "length {len} is not a multiple of the part size {part_len}")
            }
            Self::CapacityExceeded { len, capacity } => {
                write!(f, "length {len} exceeds ring buffer capacity {capacity}")
            }
            Self::InvalidOption(msg) => write!(f, "invalid option: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
