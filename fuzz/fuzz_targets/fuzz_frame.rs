#![no_main]

use bytes::BytesMut;
use gamewire::core::codec::FrameCodec;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::{Decoder, Encoder};

fuzz_target!(|data: &[u8]| {
    // Fuzz frame decoding - hostile length prefixes must error or wait for
    // more input, never panic or overallocate.
    let mut codec = FrameCodec::new(1 << 16);
    let mut buf = BytesMut::from(data);

    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        // Anything that decoded must re-encode cleanly.
        let mut out = BytesMut::new();
        let _ = codec.encode(frame, &mut out);
    }
});
