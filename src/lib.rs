//! accelbits – bit-dense packing of numeric tensors for FPGA accelerator streams
//!
//! Values of arbitrary precision (1 to 64 bits, signed or unsigned, fixed
//! point, `FLOAT32`, binary, ternary and bipolar) are packed back to back
//! into little-endian byte streams and unpacked again. A part-oriented
//! ring buffer stages packed data between producer and device threads.
//!
//! # Beispiel
//!
//! ```
//! use accelbits::{pack, unpack, DataType, RingBuffer};
//!
//! let dt: DataType = "INT5".parse().unwrap();
//! let bytes = pack(dt, &[-3i32, 2, 1, -1]).unwrap();
//! assert_eq!(bytes, [0x5D, 0x84, 0x0F]);
//!
//! let (_, padding) = dt.packed_len(4);
//! let values: Vec<i32> = unpack(dt, &bytes, padding).unwrap();
//! assert_eq!(values, [-3, 2, 1, -1]);
//!
//! // Staging in Parts zu je 3 Bytes
//! let mut ring = RingBuffer::<u8>::new(4, 3).unwrap();
//! assert!(ring.store(&bytes).unwrap());
//! let mut out = Vec::new();
//! assert!(ring.read(&mut out));
//! assert_eq!(out, bytes);
//! ```
//!
//! Logging goes through the [`log`] facade; the embedding application
//! installs the logger.

#[cfg(target_endian = "big")]
compile_error!("accelbits supports little-endian targets only");

pub mod bit_accumulator;
pub mod codec;
pub mod datatype;
pub mod error;
pub mod options;
pub mod ring_buffer;
pub mod tensor_view;

pub use error::{Error, Result};

// Public API: Datentypen
pub use datatype::{DataType, NativeType, MAX_BITWIDTH};

// Public API: Codec
pub use bit_accumulator::BitAccumulator;
pub use codec::{
    pack, pack_iter, pack_tensor, pack_with_options, unpack, unpack_native, unpack_tensor,
    unpack_with_options, Element, NativeValues, Scalar,
};
pub use options::CodecOptions;

// Public API: Staging
pub use ring_buffer::{RingBuffer, SharedRingBuffer};
pub use tensor_view::TensorView;
