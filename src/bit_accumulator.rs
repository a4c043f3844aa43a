//! Write-once bit accumulator for packed accelerator streams.
//!
//! Bits are numbered LSB first: bit `n` lives in byte `n / 8` at position
//! `n % 8`. Multi-bit fields written with [`BitAccumulator::set_bits`] start
//! at the field's least significant bit and may straddle byte boundaries.
//!
//! Operations only ever OR bits in, so an accumulator built from disjoint
//! fields is independent of write order, and two accumulators covering
//! disjoint fields combine with [`BitAccumulator::or_merge`].

use crate::{Error, Result};

/// Fixed-capacity, zero-initialised bit buffer.
///
/// Ein einmal gesetztes Bit wird nie wieder geloescht. Zwei widerspruechliche
/// Writes auf dasselbe Bit ergeben undefinierten Inhalt, aber nie einen
/// Zugriff ausserhalb des Buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitAccumulator {
    buf: Vec<u8>,
    /// Kapazitaet in Bits (<= buf.len() * 8).
    n_bits: usize,
}

impl BitAccumulator {
    /// Creates an accumulator of `n_bits` bits backed by `ceil(n_bits / 8)` zero bytes.
    ///
    /// `n_bits == 0` is legal; every write on such an accumulator is a no-op.
    pub fn new(n_bits: usize) -> Self {
        Self {
            buf: vec![0; n_bits.div_ceil(8)],
            n_bits,
        }
    }

    /// Capacity in bits.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.n_bits
    }

    /// Capacity in bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Sets bit `n`. Out-of-range bits are ignored.
    #[inline]
    pub fn set_bit(&mut self, n: usize) {
        if n < self.n_bits {
            self.buf[n / 8] |= 1 << (n % 8);
        }
    }

    /// Returns whether bit `n` is set. Out-of-range bits read as unset.
    #[inline]
    pub fn is_set(&self, n: usize) -> bool {
        n < self.n_bits && self.buf[n / 8] & (1 << (n % 8)) != 0
    }

    /// ORs the bits of `value` into the buffer starting at absolute bit `bit_offset`.
    ///
    /// The caller masks `value` to the field width beforehand. Bit 0 of
    /// `value` lands on `bit_offset`; higher bits follow and spill into the
    /// next bytes as needed. Bits that would land at or beyond
    /// [`bit_len`](Self::bit_len) are discarded.
    #[inline]
    pub fn set_bits(&mut self, value: u64, bit_offset: usize) {
        if value == 0 || bit_offset >= self.n_bits {
            return;
        }
        let first = bit_offset / 8;
        // u128-Fenster: 64 Feldbits + max. 7 Bits Versatz passen immer hinein
        let window = u128::from(value) << (bit_offset % 8);
        let last = self.buf.len() - 1;
        let tail_mask = self.tail_mask();
        for (i, byte) in window.to_le_bytes().into_iter().enumerate() {
            let idx = first + i;
            if idx > last {
                break;
            }
            if byte == 0 {
                continue;
            }
            self.buf[idx] |= if idx == last { byte & tail_mask } else { byte };
        }
    }

    /// Mask of the valid bits in the final byte.
    #[inline]
    fn tail_mask(&self) -> u8 {
        match self.n_bits % 8 {
            0 => 0xFF,
            r => (1u8 << r) - 1,
        }
    }

    /// Bitwise-ORs `other` into `self`.
    ///
    /// The operation is commutative and associative, so accumulators filled
    /// by independent workers can be combined in any order.
    ///
    /// Returns [`Error::LengthMismatch`] if the byte lengths differ.
    pub fn or_merge(&mut self, other: &BitAccumulator) -> Result<()> {
        if self.buf.len() != other.buf.len() {
            return Err(Error::LengthMismatch {
                expected: self.buf.len(),
                found: other.buf.len(),
            });
        }
        for (dst, src) in self.buf.iter_mut().zip(&other.buf) {
            *dst |= *src;
        }
        Ok(())
    }

    /// Borrows the packed bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the accumulator and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Renders the accumulator as a binary string, highest bit first.
    ///
    /// Intended for debugging and test assertions only.
    pub fn to_bit_string(&self) -> String {
        let mut s = String::with_capacity(self.n_bits);
        for n in (0..self.n_bits).rev() {
            s.push(if self.is_set(n) { '1' } else { '0' });
        }
        s
    }
}
