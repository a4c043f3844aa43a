#![no_main]
use accelbits::DataType;
use libfuzzer_sys::fuzz_target;

// Byte 0 waehlt die Bitbreite, der Rest sind Werte
fuzz_target!(|data: &[u8]| {
    let Some((&sel, rest)) = data.split_first() else {
        return;
    };
    let bw = u32::from(sel % 64) + 1;
    let signed = sel & 0x40 != 0;
    let values: Vec<i64> = rest
        .chunks_exact(8)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            i64::from_le_bytes(b)
        })
        .collect();

    let dt = if signed { DataType::Int(bw as u8) } else { DataType::UInt(bw as u8) };
    // Auf den darstellbaren Bereich beschneiden
    let values: Vec<i64> = values
        .into_iter()
        .map(|v| {
            let masked = (v as u64 & dt.mask()) as i64;
            if signed && bw < 64 && masked & (1 << (bw - 1)) != 0 {
                masked | !(dt.mask() as i64)
            } else {
                masked
            }
        })
        .collect();

    let bytes = accelbits::pack(dt, &values).expect("pack");
    let (len, padding) = dt.packed_len(values.len());
    assert_eq!(bytes.len(), len);
    if values.is_empty() {
        return;
    }
    let back: Vec<i64> = accelbits::unpack(dt, &bytes, padding).expect("unpack");
    if signed {
        assert_eq!(back, values);
    } else {
        let expected: Vec<u64> = values.iter().map(|&v| v as u64).collect();
        let back: Vec<u64> = back.iter().map(|&v| v as u64).collect();
        assert_eq!(back, expected);
    }
});
