#![no_main]

use bytes::BytesMut;
use gamewire::core::cursor::ByteCursor;
use gamewire::core::varint::{VarInt, VarLong};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz varint decoding - arbitrary bytes either decode, report
    // truncation, or error on overlong input. Never panic.
    let mut cursor = ByteCursor::new(data);
    if let Ok(Some(value)) = VarInt::try_decode(&mut cursor) {
        // The decoded value must survive a canonical re-encode.
        let mut buf = BytesMut::new();
        value.encode(&mut buf);
        let mut reread = ByteCursor::new(&buf);
        assert_eq!(VarInt::decode(&mut reread).unwrap(), value);
    }

    let mut cursor = ByteCursor::new(data);
    if let Ok(Some(value)) = VarLong::try_decode(&mut cursor) {
        let mut buf = BytesMut::new();
        value.encode(&mut buf);
        let mut reread = ByteCursor::new(&buf);
        assert_eq!(VarLong::decode(&mut reread).unwrap(), value);
    }

    let mut cursor = ByteCursor::new(data);
    let _ = cursor.read_var_string(1 << 12);
});
