//! Fixed-capacity FIFO of equal-sized parts for staging device transfers.
//!
//! A buffer is divided into `parts` slots of `elements_per_part` elements.
//! Producers store whole parts, consumers read whole parts, oldest first.
//! A part is either empty or valid; partial parts are never visible.
//!
//! [`RingBuffer`] is the single-threaded variant and is mutated through
//! `&mut self`. [`SharedRingBuffer`] wraps it in a `parking_lot` mutex with
//! two condition variables and adds blocking store/read.

use log::{debug, trace};
use parking_lot::{Condvar, Mutex};

use crate::{Error, Result};

/// Single-threaded ring buffer of `parts * elements_per_part` elements.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    storage: Vec<T>,
    parts: usize,
    elements_per_part: usize,
    /// Slot des aeltesten gueltigen Parts.
    head: usize,
    /// Anzahl gueltiger Parts ab `head`.
    valid: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Creates an empty buffer. Fails with [`Error::ZeroCapacity`] if either
    /// dimension is zero and with [`Error::CapacityOverflow`] if the total
    /// element count does not fit into `usize`.
    pub fn new(parts: usize, elements_per_part: usize) -> Result<Self> {
        let capacity = parts
            .checked_mul(elements_per_part)
            .ok_or(Error::CapacityOverflow {
                parts,
                elements_per_part,
            })?;
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        debug!("RingBuffer: {parts} parts x {elements_per_part} elements");
        Ok(Self {
            storage: vec![T::default(); capacity],
            parts,
            elements_per_part,
            head: 0,
            valid: 0,
        })
    }

    /// Stores `values` as `values.len() / elements_per_part` consecutive parts.
    ///
    /// Returns `Ok(false)` without writing anything if there are not enough
    /// free parts. Fails with [`Error::PartSizeMismatch`] if the length is not
    /// a whole number of parts and with [`Error::CapacityExceeded`] if it
    /// would not fit even into an empty buffer.
    pub fn store(&mut self, values: &[T]) -> Result<bool> {
        let needed = self.parts_for(values.len())?;
        if needed > self.free_parts() {
            trace!(
                "RingBuffer: store of {needed} parts refused, {} free",
                self.free_parts()
            );
            return Ok(false);
        }
        self.write_parts(values);
        Ok(true)
    }

    /// Moves the oldest part into `sink`. Returns `false` if the buffer is empty.
    pub fn read<E: Extend<T>>(&mut self, sink: &mut E) -> bool {
        if self.valid == 0 {
            return false;
        }
        let start = self.head * self.elements_per_part;
        sink.extend(self.storage[start..start + self.elements_per_part].iter().copied());
        self.head = (self.head + 1) % self.parts;
        self.valid -= 1;
        true
    }

    /// Moves every valid part into `sink`, oldest first.
    ///
    /// Returns `false` only if the buffer was empty.
    pub fn read_all_valid_parts<E: Extend<T>>(&mut self, sink: &mut E) -> bool {
        if self.valid == 0 {
            return false;
        }
        while self.read(sink) {}
        true
    }

    /// Validates a store length and converts it to a part count.
    fn parts_for(&self, len: usize) -> Result<usize> {
        if len % self.elements_per_part != 0 {
            return Err(Error::PartSizeMismatch {
                len,
                part_len: self.elements_per_part,
            });
        }
        if len > self.capacity() {
            return Err(Error::CapacityExceeded {
                len,
                capacity: self.capacity(),
            });
        }
        Ok(len / self.elements_per_part)
    }

    /// Appends parts behind the newest one. The caller checked the space.
    fn write_parts(&mut self, values: &[T]) {
        for part in values.chunks_exact(self.elements_per_part) {
            let slot = (self.head + self.valid) % self.parts;
            let start = slot * self.elements_per_part;
            self.storage[start..start + self.elements_per_part].copy_from_slice(part);
            self.valid += 1;
        }
    }
}

impl<T> RingBuffer<T> {
    pub fn is_full(&self) -> bool {
        self.valid == self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.valid * self.elements_per_part
    }

    /// Total number of elements the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.parts * self.elements_per_part
    }

    pub fn free_parts(&self) -> usize {
        self.parts - self.valid
    }

    pub fn parts(&self) -> usize {
        self.parts
    }

    pub fn elements_per_part(&self) -> usize {
        self.elements_per_part
    }
}

/// Thread-safe ring buffer with blocking store and read.
///
/// Waiters release the lock while suspended and re-check their condition
/// after every wake-up. There is no timeout; a blocked call returns only
/// once another thread makes room or data available.
#[derive(Debug)]
pub struct SharedRingBuffer<T> {
    inner: Mutex<RingBuffer<T>>,
    /// Signalisiert freie Parts.
    space: Condvar,
    /// Signalisiert gueltige Parts.
    data: Condvar,
}

impl<T: Copy + Default> SharedRingBuffer<T> {
    pub fn new(parts: usize, elements_per_part: usize) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(RingBuffer::new(parts, elements_per_part)?),
            space: Condvar::new(),
            data: Condvar::new(),
        })
    }

    /// Non-blocking store, see [`RingBuffer::store`].
    pub fn store(&self, values: &[T]) -> Result<bool> {
        let stored = self.inner.lock().store(values)?;
        if stored && !values.is_empty() {
            self.data.notify_all();
        }
        Ok(stored)
    }

    /// Stores `values`, waiting until enough parts are free.
    ///
    /// All parts are written under one lock, so consumers never observe a
    /// partially stored batch. Length errors are reported without waiting.
    pub fn store_blocking(&self, values: &[T]) -> Result<()> {
        let mut guard = self.inner.lock();
        let needed = guard.parts_for(values.len())?;
        while guard.free_parts() < needed {
            self.space.wait(&mut guard);
        }
        guard.write_parts(values);
        drop(guard);
        if needed > 0 {
            self.data.notify_all();
        }
        Ok(())
    }

    /// Non-blocking read of the oldest part. Returns `false` if empty.
    pub fn read<E: Extend<T>>(&self, sink: &mut E) -> bool {
        let read = self.inner.lock().read(sink);
        if read {
            self.space.notify_all();
        }
        read
    }

    /// Reads the oldest part, waiting until one is available.
    pub fn read_blocking<E: Extend<T>>(&self, sink: &mut E) {
        let mut guard = self.inner.lock();
        while guard.is_empty() {
            self.data.wait(&mut guard);
        }
        guard.read(sink);
        drop(guard);
        self.space.notify_all();
    }

    /// Drains every valid part into `sink`. Returns `false` if the buffer was empty.
    pub fn read_all_valid_parts<E: Extend<T>>(&self, sink: &mut E) -> bool {
        let read = self.inner.lock().read_all_valid_parts(sink);
        if read {
            self.space.notify_all();
        }
        read
    }
}

impl<T> SharedRingBuffer<T> {
    pub fn is_full(&self) -> bool {
        self.inner.lock().is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn free_parts(&self) -> usize {
        self.inner.lock().free_parts()
    }

    pub fn parts(&self) -> usize {
        self.inner.lock().parts()
    }

    pub fn elements_per_part(&self) -> usize {
        self.inner.lock().elements_per_part()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn three_parts_of_four() {
        let mut rb = RingBuffer::<u8>::new(3, 4).unwrap();
        assert!(rb.store(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap());
        assert!(!rb.store(&[0; 8]).unwrap());
        assert_eq!(rb.len(), 8);
        assert!(rb.store(&[9, 10, 11, 12]).unwrap());
        assert!(rb.is_full());
        assert_eq!(rb.free_parts(), 0);
    }

    struct CaptureLogger;

    static RECORDS: Mutex<Vec<(log::Level, String)>> = parking_lot::const_mutex(Vec::new());
    static LOGGER: CaptureLogger = CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            RECORDS.lock().push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    #[test]
    fn refused_store_logs_below_warn() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);

        let mut rb = RingBuffer::<u8>::new(1, 2).unwrap();
        assert!(rb.store(&[1, 2]).unwrap());
        assert!(!rb.store(&[3, 4]).unwrap());

        let records = RECORDS.lock();
        let refused: Vec<_> = records.iter().filter(|(_, msg)| msg.contains("refused")).collect();
        assert!(!refused.is_empty());
        assert!(refused.iter().all(|(level, _)| *level == log::Level::Trace), "{refused:?}");
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(RingBuffer::<u8>::new(0, 4), Err(Error::ZeroCapacity)));
        assert!(matches!(RingBuffer::<u8>::new(4, 0), Err(Error::ZeroCapacity)));
        assert!(matches!(SharedRingBuffer::<u8>::new(0, 0), Err(Error::ZeroCapacity)));
    }

    #[test]
    fn capacity_overflow_reports_dimensions() {
        assert_eq!(
            RingBuffer::<u8>::new(usize::MAX, 2).unwrap_err(),
            Error::CapacityOverflow { parts: usize::MAX, elements_per_part: 2 }
        );
        assert!(matches!(
            SharedRingBuffer::<u8>::new(3, usize::MAX),
            Err(Error::CapacityOverflow { parts: 3, .. })
        ));
    }

    #[test]
    fn store_length_errors() {
        let mut rb = RingBuffer::<u16>::new(3, 4).unwrap();
        assert!(matches!(
            rb.store(&[1, 2, 3, 4, 5, 6]),
            Err(Error::PartSizeMismatch { len: 6, part_len: 4 })
        ));
        assert!(matches!(
            rb.store(&[0; 16]),
            Err(Error::CapacityExceeded { len: 16, capacity: 12 })
        ));
        assert!(rb.is_empty());
    }

    #[test]
    fn fifo_with_wraparound() {
        let mut rb = RingBuffer::<i32>::new(3, 2).unwrap();
        let mut out = Vec::new();
        assert!(rb.store(&[1, 2, 3, 4]).unwrap());
        assert!(rb.read(&mut out));
        assert!(rb.store(&[5, 6, 7, 8]).unwrap());
        assert!(rb.is_full());
        assert!(rb.read(&mut out));
        assert!(rb.read(&mut out));
        assert!(rb.store(&[9, 10]).unwrap());
        assert!(rb.read_all_valid_parts(&mut out));
        assert_eq!(out, (1..=10).collect::<Vec<_>>());
        assert!(!rb.read(&mut out));
        assert!(!rb.read_all_valid_parts(&mut out));
    }

    #[test]
    fn empty_store_is_noop() {
        let mut rb = RingBuffer::<u8>::new(1, 4).unwrap();
        assert!(rb.store(&[]).unwrap());
        assert!(rb.is_empty());
    }

    #[test]
    fn shared_nonblocking_matches_single() {
        let rb = SharedRingBuffer::<u8>::new(2, 2).unwrap();
        assert!(rb.store(&[1, 2, 3, 4]).unwrap());
        assert!(!rb.store(&[5, 6]).unwrap());
        let mut out = Vec::new();
        assert!(rb.read(&mut out));
        assert_eq!(out, vec![1, 2]);
        assert_eq!(rb.len(), 2);
        assert_eq!(rb.capacity(), 4);
        assert_eq!((rb.parts(), rb.elements_per_part(), rb.free_parts()), (2, 2, 1));
    }

    #[test]
    fn blocking_store_waits_for_reader() {
        let rb = SharedRingBuffer::<u32>::new(1, 2).unwrap();
        rb.store(&[1, 2]).unwrap();
        thread::scope(|s| {
            s.spawn(|| rb.store_blocking(&[3, 4]).unwrap());
            thread::sleep(Duration::from_millis(20));
            let mut out = Vec::new();
            rb.read_blocking(&mut out);
            rb.read_blocking(&mut out);
            assert_eq!(out, vec![1, 2, 3, 4]);
        });
        assert!(rb.is_empty());
    }

    #[test]
    fn blocking_store_reports_length_errors() {
        let rb = SharedRingBuffer::<u8>::new(2, 2).unwrap();
        assert!(matches!(rb.store_blocking(&[1]), Err(Error::PartSizeMismatch { .. })));
        assert!(matches!(rb.store_blocking(&[0; 6]), Err(Error::CapacityExceeded { .. })));
    }
}
