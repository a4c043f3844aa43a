#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&sel, bytes)) = data.split_first() else {
        return;
    };
    if let Ok(dt) = accelbits::DataType::int(u32::from(sel % 64) + 1) {
        for padding in 0..16 {
            let _ = accelbits::unpack_native(dt, bytes, padding);
        }
    }
    for dt in [
        accelbits::DataType::Float32,
        accelbits::DataType::Bipolar,
        accelbits::DataType::Ternary,
        accelbits::DataType::Fixed { bits: sel % 64 + 1, int_bits: sel % 8 + 1 },
    ] {
        let _ = accelbits::unpack_native(dt, bytes, usize::from(sel % 8));
    }
});
