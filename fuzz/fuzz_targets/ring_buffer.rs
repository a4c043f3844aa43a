#![no_main]
use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;

// Jeder Befehlsbyte ist store (gerade) oder read (ungerade); Modell ist eine VecDeque
fuzz_target!(|data: &[u8]| {
    let Ok(mut rb) = accelbits::RingBuffer::<u8>::new(4, 3) else {
        return;
    };
    let mut model: VecDeque<u8> = VecDeque::new();
    let mut next = 0u8;
    for &op in data {
        if op % 2 == 0 {
            let parts = usize::from(op / 2 % 5);
            let values: Vec<u8> = (0..parts * 3)
                .map(|_| {
                    next = next.wrapping_add(1);
                    next
                })
                .collect();
            let fits = model.len() + values.len() <= 12;
            match rb.store(&values) {
                Ok(stored) => {
                    assert_eq!(stored, fits);
                    if stored {
                        model.extend(&values);
                    }
                }
                Err(_) => assert!(values.len() > 12),
            }
        } else {
            let mut out = Vec::new();
            let read = rb.read(&mut out);
            assert_eq!(read, !model.is_empty());
            let expected: Vec<u8> = model.drain(..out.len()).collect();
            assert_eq!(out, expected);
        }
        assert_eq!(rb.len(), model.len());
        assert_eq!(rb.is_full(), model.len() == 12);
    }
});
