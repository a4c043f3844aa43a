//! FIFO behaviour of the ring buffer under interleaving and under concurrent
//! producers and consumers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use accelbits::{pack, DataType, Error, RingBuffer, SharedRingBuffer};

#[test]
fn three_parts_scenario() {
    let mut rb = RingBuffer::<u32>::new(3, 4).unwrap();
    assert!(rb.store(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap());
    assert!(!rb.store(&[9, 10, 11, 12, 13, 14, 15, 16]).unwrap());
    assert!(rb.store(&[9, 10, 11, 12]).unwrap());
    assert!(rb.is_full());

    let mut out = Vec::new();
    assert!(rb.read_all_valid_parts(&mut out));
    assert_eq!(out, (1..=12).collect::<Vec<_>>());
    assert!(rb.is_empty());
}

#[test]
fn interleaved_store_read_matches_queue_model() {
    let mut rb = RingBuffer::<u16>::new(5, 3).unwrap();
    let mut model = VecDeque::new();
    let mut next = 0u16;
    // Festes Muster aus Stores (1..=3 Parts) und Reads
    for step in 0..200u32 {
        if step % 3 == 2 {
            let mut out = Vec::new();
            let read = rb.read(&mut out);
            assert_eq!(read, !model.is_empty());
            let expected: Vec<u16> = model.drain(..out.len()).collect();
            assert_eq!(out, expected);
        } else {
            let parts = (step % 4 + 1).min(3) as usize;
            let values: Vec<u16> = (0..parts * 3).map(|_| { next += 1; next }).collect();
            let fits = model.len() + values.len() <= rb.capacity();
            assert_eq!(rb.store(&values).unwrap(), fits);
            if fits {
                model.extend(values);
            }
        }
        assert_eq!(rb.len(), model.len());
    }
}

#[test]
fn packed_stream_staged_through_parts() {
    let dt = DataType::Int(4);
    let values: Vec<i8> = (0..64).map(|i| (i % 16) - 8).collect();
    let bytes = pack(dt, &values).unwrap();
    assert_eq!(bytes.len(), 32);

    let mut rb = RingBuffer::<u8>::new(4, 8).unwrap();
    let mut received = Vec::new();
    for chunk in bytes.chunks(16) {
        assert!(rb.store(chunk).unwrap());
        assert!(rb.read_all_valid_parts(&mut received));
    }
    assert_eq!(received, bytes);
}

#[test]
fn concurrent_producer_consumer_keeps_order() {
    let rb = Arc::new(SharedRingBuffer::<u64>::new(4, 8).unwrap());
    let batches = 500u64;

    let producer = {
        let rb = Arc::clone(&rb);
        thread::spawn(move || {
            for b in 0..batches {
                let values: Vec<u64> = (b * 8..(b + 1) * 8).collect();
                rb.store_blocking(&values).unwrap();
            }
        })
    };

    let mut received = Vec::with_capacity((batches * 8) as usize);
    for _ in 0..batches {
        rb.read_blocking(&mut received);
    }
    producer.join().unwrap();

    assert_eq!(received, (0..batches * 8).collect::<Vec<_>>());
    assert!(rb.is_empty());
}

#[test]
fn multi_part_batches_are_atomic() {
    // Jeder Batch besteht aus 3 Parts mit derselben Kennung; ein Konsument
    // darf nie einen fremden Part zwischen den Parts eines Batches sehen.
    let rb = Arc::new(SharedRingBuffer::<u32>::new(6, 2).unwrap());
    let producers: Vec<_> = (0..3u32)
        .map(|p| {
            let rb = Arc::clone(&rb);
            thread::spawn(move || {
                for b in 0..100u32 {
                    let id = p * 1000 + b;
                    rb.store_blocking(&[id; 6]).unwrap();
                }
            })
        })
        .collect();

    let mut received = Vec::new();
    for _ in 0..300 * 3 {
        rb.read_blocking(&mut received);
    }
    for p in producers {
        p.join().unwrap();
    }

    assert_eq!(received.len(), 300 * 6);
    for batch in received.chunks(6) {
        assert!(batch.iter().all(|&v| v == batch[0]), "{batch:?}");
    }
    // Pro Produzent bleibt die Reihenfolge erhalten
    for p in 0..3u32 {
        let ids: Vec<u32> = received
            .chunks(6)
            .map(|c| c[0])
            .filter(|id| id / 1000 == p)
            .collect();
        assert_eq!(ids, (0..100).map(|b| p * 1000 + b).collect::<Vec<_>>());
    }
}

#[test]
fn multiple_consumers_drain_everything() {
    let rb = Arc::new(SharedRingBuffer::<u32>::new(2, 1).unwrap());
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let rb = Arc::clone(&rb);
            thread::spawn(move || {
                let mut got = Vec::new();
                for _ in 0..250 {
                    rb.read_blocking(&mut got);
                }
                got
            })
        })
        .collect();

    for v in 0..1000u32 {
        rb.store_blocking(&[v]).unwrap();
    }

    let mut all: Vec<u32> = consumers
        .into_iter()
        .flat_map(|c| c.join().unwrap())
        .collect();
    for got in all.chunks(250) {
        assert!(got.windows(2).all(|w| w[0] < w[1]));
    }
    all.sort_unstable();
    assert_eq!(all, (0..1000).collect::<Vec<_>>());
}

#[test]
fn drain_unblocks_waiting_producer() {
    let rb = Arc::new(SharedRingBuffer::<u32>::new(3, 2).unwrap());
    let mut received = Vec::new();
    assert!(!rb.read(&mut received));
    assert!(!rb.read_all_valid_parts(&mut received));

    assert!(rb.store(&[0, 1, 2, 3, 4, 5]).unwrap());
    assert!(rb.is_full());

    // Produzent wartet, bis ein Drain wieder Platz schafft
    let producer = {
        let rb = Arc::clone(&rb);
        thread::spawn(move || {
            rb.store_blocking(&[6, 7, 8, 9]).unwrap();
            rb.store_blocking(&[10, 11, 12, 13, 14, 15]).unwrap();
        })
    };
    thread::sleep(std::time::Duration::from_millis(20));
    assert!(rb.is_full());

    while received.len() < 16 {
        if !rb.read_all_valid_parts(&mut received) {
            thread::yield_now();
        }
    }
    producer.join().unwrap();

    assert_eq!(received, (0..16).collect::<Vec<_>>());
    assert!(!rb.read(&mut received));
    assert!(!rb.read_all_valid_parts(&mut received));
    assert_eq!(received.len(), 16);
}

#[test]
fn configuration_errors() {
    assert!(matches!(SharedRingBuffer::<u8>::new(0, 8), Err(Error::ZeroCapacity)));
    let rb = SharedRingBuffer::<u8>::new(2, 4).unwrap();
    assert!(matches!(rb.store(&[0; 5]), Err(Error::PartSizeMismatch { len: 5, part_len: 4 })));
    assert!(matches!(rb.store(&[0; 12]), Err(Error::CapacityExceeded { len: 12, capacity: 8 })));
}
