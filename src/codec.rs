//! Packing host values into accelerator streams and back.
//!
//! Element `i` of a packed stream occupies bits `i * bw .. (i + 1) * bw`,
//! counted LSB first within little-endian bytes (bit 0 of byte 0 is the
//! least significant bit of element 0). There is no padding between
//! elements; only the final byte may carry unused high-order bits, and the
//! caller threads that padding count through to [`unpack`].
//!
//! # Beispiel
//!
//! ```
//! use accelbits::{codec, DataType};
//!
//! let dt = DataType::Int(5);
//! let bytes = codec::pack(dt, &[-3i8, 2, 1, -1]).unwrap();
//! assert_eq!(bytes, vec![0x5D, 0x84, 0x0F]);
//!
//! let (_, padding) = dt.packed_len(4);
//! let values: Vec<i8> = codec::unpack(dt, &bytes, padding).unwrap();
//! assert_eq!(values, vec![-3, 2, 1, -1]);
//! ```

use core::fmt;

use log::trace;
use rayon::prelude::*;

use crate::bit_accumulator::BitAccumulator;
use crate::datatype::{DataType, NativeType};
use crate::options::CodecOptions;
use crate::tensor_view::{self, TensorView};
use crate::{Error, Result};

/// Intermediate numeric form between a host value and a stream field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// Signed integer (also the two's complement view of narrower types).
    Int(i64),
    /// Unsigned integer; keeps the full `u64` range.
    UInt(u64),
    /// Floating point value.
    Float(f64),
}

/// Host value type that can be packed into and unpacked from a stream.
///
/// Implemented for all primitive integers up to 64 bits, `f32` and `f64`.
pub trait Element: Copy + Send + Sync + 'static {
    /// Lowers the value to a [`Scalar`].
    fn to_scalar(self) -> Scalar;

    /// Raises a [`Scalar`] to this type using `as` conversion semantics.
    fn from_scalar(s: Scalar) -> Self;

    /// Byte view used by the 8-bit copy fast path (only `u8` provides one).
    #[inline]
    fn as_byte_slice(_values: &[Self]) -> Option<&[u8]> {
        None
    }

    /// Inverse of [`Element::as_byte_slice`].
    #[inline]
    fn from_byte_slice(_bytes: &[u8]) -> Option<Vec<Self>> {
        None
    }
}

impl Element for u8 {
    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::Int(i64::from(self))
    }

    #[inline]
    fn from_scalar(s: Scalar) -> Self {
        match s {
            Scalar::Int(i) => i as u8,
            Scalar::UInt(u) => u as u8,
            Scalar::Float(f) => f as u8,
        }
    }

    #[inline]
    fn as_byte_slice(values: &[Self]) -> Option<&[u8]> {
        Some(values)
    }

    #[inline]
    fn from_byte_slice(bytes: &[u8]) -> Option<Vec<Self>> {
        Some(bytes.to_vec())
    }
}

impl Element for u64 {
    #[inline]
    fn to_scalar(self) -> Scalar {
        Scalar::UInt(self)
    }

    #[inline]
    fn from_scalar(s: Scalar) -> Self {
        match s {
            Scalar::Int(i) => i as u64,
            Scalar::UInt(u) => u,
            Scalar::Float(f) => f as u64,
        }
    }
}

macro_rules! impl_element_int {
    ($($t:ty),*) => {$(
        impl Element for $t {
            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::Int(i64::from(self))
            }

            #[inline]
            fn from_scalar(s: Scalar) -> Self {
                match s {
                    Scalar::Int(i) => i as $t,
                    Scalar::UInt(u) => u as $t,
                    Scalar::Float(f) => f as $t,
                }
            }
        }
    )*};
}

impl_element_int!(i8, i16, i32, i64, u16, u32);

macro_rules! impl_element_float {
    ($($t:ty),*) => {$(
        impl Element for $t {
            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::Float(f64::from(self))
            }

            #[inline]
            fn from_scalar(s: Scalar) -> Self {
                match s {
                    Scalar::Int(i) => i as $t,
                    Scalar::UInt(u) => u as $t,
                    Scalar::Float(f) => f as $t,
                }
            }
        }
    )*};
}

impl_element_float!(f32, f64);

/// Values unpacked into the smallest lossless host type of their descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValues {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl NativeValues {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The host type of the contained values.
    pub fn native_type(&self) -> NativeType {
        match self {
            Self::U8(_) => NativeType::U8,
            Self::U16(_) => NativeType::U16,
            Self::U32(_) => NativeType::U32,
            Self::U64(_) => NativeType::U64,
            Self::I8(_) => NativeType::I8,
            Self::I16(_) => NativeType::I16,
            Self::I32(_) => NativeType::I32,
            Self::I64(_) => NativeType::I64,
            Self::F32(_) => NativeType::F32,
            Self::F64(_) => NativeType::F64,
        }
    }
}

impl fmt::Display for NativeValues {
    /// Space-separated values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{v}")?;
            }
            Ok(())
        }
        match self {
            Self::U8(v) => join(f, v),
            Self::U16(v) => join(f, v),
            Self::U32(v) => join(f, v),
            Self::U64(v) => join(f, v),
            Self::I8(v) => join(f, v),
            Self::I16(v) => join(f, v),
            Self::I32(v) => join(f, v),
            Self::I64(v) => join(f, v),
            Self::F32(v) => join(f, v),
            Self::F64(v) => join(f, v),
        }
    }
}

// ============================================================================
// Field encoding
// ============================================================================

/// Converts one value into its masked stream field.
#[inline]
pub(crate) fn encode_field(dt: DataType, value: Scalar) -> u64 {
    let raw = match dt {
        DataType::Float32 => {
            let f = match value {
                Scalar::Int(i) => i as f32,
                Scalar::UInt(u) => u as f32,
                Scalar::Float(f) => f as f32,
            };
            u64::from(f.to_bits())
        }
        // -1 -> 0, +1 -> 1
        DataType::Bipolar => match value {
            Scalar::Int(i) => u64::from(i > 0),
            Scalar::UInt(u) => u64::from(u > 0),
            Scalar::Float(f) => u64::from(f > 0.0),
        },
        DataType::Fixed { .. } => {
            let frac = dt.frac_bits();
            match value {
                Scalar::Int(i) => (i << frac) as u64,
                Scalar::UInt(u) => u << frac,
                Scalar::Float(f) => float_to_code(f * 2f64.powi(frac as i32)),
            }
        }
        _ => match value {
            Scalar::Int(i) => i as u64,
            Scalar::UInt(u) => u,
            Scalar::Float(f) => float_to_code(f),
        },
    };
    raw & dt.mask()
}

/// Converts a float to an integer code, truncating toward zero.
///
/// Negative values go through `i64` so they keep their two's complement
/// pattern; non-negative values through `u64` so the full unsigned range
/// stays reachable. Both casts saturate.
#[inline]
fn float_to_code(f: f64) -> u64 {
    if f < 0.0 {
        f as i64 as u64
    } else {
        f as u64
    }
}

/// Converts one masked stream field back into a [`Scalar`].
#[inline]
pub(crate) fn decode_field(dt: DataType, raw: u64) -> Scalar {
    match dt {
        DataType::Float32 => Scalar::Float(f64::from(f32::from_bits(raw as u32))),
        DataType::Bipolar => Scalar::Int(if raw & 1 == 1 { 1 } else { -1 }),
        DataType::Fixed { .. } => {
            let code = sign_extend(raw, dt.bitwidth());
            Scalar::Float(code as f64 / 2f64.powi(dt.frac_bits() as i32))
        }
        _ if dt.sign() => Scalar::Int(sign_extend(raw, dt.bitwidth())),
        _ => Scalar::UInt(raw),
    }
}

/// Sign-extends the low `bw` bits of `raw`.
#[inline]
fn sign_extend(raw: u64, bw: u32) -> i64 {
    if bw >= 64 {
        return raw as i64;
    }
    if raw & (1u64 << (bw - 1)) != 0 {
        (raw | !((1u64 << bw) - 1)) as i64
    } else {
        raw as i64
    }
}

/// Reads the `bw`-bit field starting at absolute bit `bit_offset`.
///
/// Die Quellbytes werden in ein 16-Byte-Fenster kopiert; ein 64-Bit-Feld mit
/// 7 Bit Versatz belegt hoechstens 9 Bytes. Bytes hinter dem Ende des
/// Streams lesen sich als 0.
#[inline]
fn read_field(bytes: &[u8], bit_offset: usize, bw: u32) -> u64 {
    let first = bit_offset / 8;
    let shift = bit_offset % 8;
    let needed = (shift + bw as usize).div_ceil(8);
    let end = (first + needed).min(bytes.len());
    let mut window = [0u8; 16];
    if first < end {
        window[..end - first].copy_from_slice(&bytes[first..end]);
    }
    let value = (u128::from_le_bytes(window) >> shift) as u64;
    if bw >= 64 {
        value
    } else {
        value & ((1u64 << bw) - 1)
    }
}

/// Packs a contiguous run of values into its own accumulator.
fn pack_run<T: Element>(dt: DataType, values: &[T]) -> BitAccumulator {
    let bw = dt.bitwidth() as usize;
    let mut acc = BitAccumulator::new(values.len() * bw);
    for (i, &v) in values.iter().enumerate() {
        acc.set_bits(encode_field(dt, v.to_scalar()), i * bw);
    }
    acc
}

// ============================================================================
// pack
// ============================================================================

/// Packs `values` according to `dt` using the default [`CodecOptions`].
///
/// An empty input yields an empty byte vector.
pub fn pack<T: Element>(dt: DataType, values: &[T]) -> Result<Vec<u8>> {
    pack_with_options(dt, values, &CodecOptions::default())
}

/// Packs every value yielded by `values`.
pub fn pack_iter<T, I>(dt: DataType, values: I) -> Result<Vec<u8>>
where
    T: Element,
    I: IntoIterator<Item = T>,
{
    let values: Vec<T> = values.into_iter().collect();
    pack(dt, &values)
}

/// Packs `values` according to `dt`.
///
/// Large inputs are split into chunks of a multiple of 8 elements; every
/// chunk covers a whole number of output bytes, so chunks are packed on the
/// rayon pool and written into disjoint byte ranges of the result.
pub fn pack_with_options<T: Element>(dt: DataType, values: &[T], opts: &CodecOptions) -> Result<Vec<u8>> {
    dt.validate()?;
    opts.validate()?;

    if dt.bitwidth() == 8 && dt.is_integer() {
        if let Some(bytes) = T::as_byte_slice(values) {
            return Ok(bytes.to_vec());
        }
    }

    if !opts.use_parallel(values.len()) {
        return Ok(pack_run(dt, values).into_bytes());
    }

    let bw = dt.bitwidth() as usize;
    let chunk = opts.aligned_chunk();
    let chunk_bytes = chunk / 8 * bw;
    let (total_bytes, _) = dt.packed_len(values.len());
    trace!(
        "pack {dt}: {} values in parallel chunks of {chunk}",
        values.len()
    );

    let mut out = vec![0u8; total_bytes];
    out.par_chunks_mut(chunk_bytes)
        .zip(values.par_chunks(chunk))
        .for_each(|(dst, src)| dst.copy_from_slice(pack_run(dt, src).as_bytes()));
    Ok(out)
}

// ============================================================================
// unpack
// ============================================================================

/// Validates a packed sequence and returns its element count.
fn element_count(dt: DataType, bytes: &[u8], padding_bits: usize) -> Result<usize> {
    if bytes.is_empty() {
        return Err(Error::EmptyInput);
    }
    dt.validate()?;
    let bits = bytes.len() * 8;
    let bw = dt.bitwidth() as usize;
    if padding_bits > bits || (bits - padding_bits) % bw != 0 {
        return Err(Error::BitLengthMismatch {
            bits,
            padding: padding_bits,
            bitwidth: dt.bitwidth(),
        });
    }
    Ok((bits - padding_bits) / bw)
}

/// Unpacks `bytes` into values of type `T` using the default [`CodecOptions`].
///
/// `padding_bits` is the number of unused bits at the end of the sequence.
/// Fails with [`Error::EmptyInput`] on an empty sequence and with
/// [`Error::BitLengthMismatch`] if the payload is not a whole number of
/// elements.
pub fn unpack<T: Element>(dt: DataType, bytes: &[u8], padding_bits: usize) -> Result<Vec<T>> {
    unpack_with_options(dt, bytes, padding_bits, &CodecOptions::default())
}

/// Unpacks `bytes` into values of type `T`.
pub fn unpack_with_options<T: Element>(
    dt: DataType,
    bytes: &[u8],
    padding_bits: usize,
    opts: &CodecOptions,
) -> Result<Vec<T>> {
    let count = element_count(dt, bytes, padding_bits)?;
    opts.validate()?;

    if dt.bitwidth() == 8 && dt.is_integer() {
        if let Some(values) = T::from_byte_slice(&bytes[..count]) {
            return Ok(values);
        }
    }

    let bw = dt.bitwidth();
    let decode = |i: usize| T::from_scalar(decode_field(dt, read_field(bytes, i * bw as usize, bw)));

    if !opts.use_parallel(count) {
        return Ok((0..count).map(decode).collect());
    }
    trace!("unpack {dt}: {count} values in parallel");
    Ok((0..count)
        .into_par_iter()
        .with_min_len(opts.aligned_chunk())
        .map(decode)
        .collect())
}

/// Unpacks `bytes` into the smallest host type that holds `dt` losslessly.
pub fn unpack_native(dt: DataType, bytes: &[u8], padding_bits: usize) -> Result<NativeValues> {
    Ok(match dt.native_type() {
        NativeType::U8 => NativeValues::U8(unpack(dt, bytes, padding_bits)?),
        NativeType::U16 => NativeValues::U16(unpack(dt, bytes, padding_bits)?),
        NativeType::U32 => NativeValues::U32(unpack(dt, bytes, padding_bits)?),
        NativeType::U64 => NativeValues::U64(unpack(dt, bytes, padding_bits)?),
        NativeType::I8 => NativeValues::I8(unpack(dt, bytes, padding_bits)?),
        NativeType::I16 => NativeValues::I16(unpack(dt, bytes, padding_bits)?),
        NativeType::I32 => NativeValues::I32(unpack(dt, bytes, padding_bits)?),
        NativeType::I64 => NativeValues::I64(unpack(dt, bytes, padding_bits)?),
        NativeType::F32 => NativeValues::F32(unpack(dt, bytes, padding_bits)?),
        NativeType::F64 => NativeValues::F64(unpack(dt, bytes, padding_bits)?),
    })
}

// ============================================================================
// Multi-dimensional entry points
// ============================================================================

/// Packs a multi-dimensional tensor slice by slice.
///
/// Each innermost slice is packed as an independent task. When a slice
/// spans a whole number of bytes the tasks write disjoint byte ranges;
/// otherwise every worker fills its own full-size accumulator and the
/// partial results are combined with [`BitAccumulator::or_merge`].
/// The output is identical to [`pack`] over the flat buffer.
pub fn pack_tensor<T: Element>(dt: DataType, view: &TensorView<'_, T>, opts: &CodecOptions) -> Result<Vec<u8>> {
    dt.validate()?;
    opts.validate()?;
    if !opts.use_parallel(view.len()) {
        return Ok(pack_run(dt, view.data()).into_bytes());
    }

    let bw = dt.bitwidth() as usize;
    let slice_bits = view.inner_len() * bw;

    if slice_bits % 8 == 0 {
        trace!("pack_tensor {dt}: {} byte-aligned slices", view.inner_ranges().len());
        let (total_bytes, _) = dt.packed_len(view.len());
        let slices = view.most_inner_dims();
        let mut out = vec![0u8; total_bytes];
        out.par_chunks_mut(slice_bits / 8)
            .zip(slices.par_iter())
            .for_each(|(dst, src)| dst.copy_from_slice(pack_run(dt, src).as_bytes()));
        return Ok(out);
    }

    trace!("pack_tensor {dt}: {} unaligned slices, merging", view.inner_ranges().len());
    let total_bits = view.len() * bw;
    let data = view.data();
    let merged = view
        .inner_ranges()
        .par_iter()
        .fold(
            || BitAccumulator::new(total_bits),
            |mut acc, range| {
                for (k, &v) in data[range.clone()].iter().enumerate() {
                    acc.set_bits(encode_field(dt, v.to_scalar()), (range.start + k) * bw);
                }
                acc
            },
        )
        .map(Ok::<_, Error>)
        .try_reduce(
            || BitAccumulator::new(total_bits),
            |mut a, b| {
                a.or_merge(&b)?;
                Ok(a)
            },
        )?;
    Ok(merged.into_bytes())
}

/// Unpacks a packed tensor of the given `shape` into a flat buffer.
///
/// Fails with [`Error::ShapeMismatch`] if the shape does not cover exactly
/// the number of elements in `bytes`.
pub fn unpack_tensor<T: Element>(
    dt: DataType,
    bytes: &[u8],
    padding_bits: usize,
    shape: &[usize],
    opts: &CodecOptions,
) -> Result<Vec<T>> {
    let count = element_count(dt, bytes, padding_bits)?;
    tensor_view::check_shape(shape, count)?;
    opts.validate()?;

    let bw = dt.bitwidth();
    let decode = |i: usize| T::from_scalar(decode_field(dt, read_field(bytes, i * bw as usize, bw)));
    if !opts.use_parallel(count) {
        return Ok((0..count).map(decode).collect());
    }

    let inner = shape[shape.len() - 1];
    trace!("unpack_tensor {dt}: {} slices of {inner}", count / inner);
    Ok((0..count / inner)
        .into_par_iter()
        .flat_map_iter(|s| (s * inner..(s + 1) * inner).map(decode))
        .collect())
}
