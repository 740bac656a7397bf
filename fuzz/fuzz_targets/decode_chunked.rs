#![no_main]

use std::pin::Pin;
use std::task::{Context, Poll};

use arbitrary::Arbitrary;
use futures::io::AsyncRead;
use libfuzzer_sys::fuzz_target;
use protodyn::{DecodeOptions, DescriptorPool, DynamicMessage};

#[derive(Arbitrary, Debug)]
struct ChunkedInput {
    data: Vec<u8>,
    chunk_sizes: Vec<u8>,
}

/// Hands out the input in the fuzzer-chosen chunk sizes.
struct ChunkedReader<'a> {
    input: &'a ChunkedInput,
    pos: usize,
    chunk_idx: usize,
}

impl AsyncRead for ChunkedReader<'_> {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<std::io::Result<usize>> {
        let this = &mut *self;
        let size = this
            .input
            .chunk_sizes
            .get(this.chunk_idx)
            .copied()
            .unwrap_or(16)
            .max(1) as usize;
        let end = (this.pos + size).min(this.input.data.len());
        let n = (end - this.pos).min(buf.len());
        buf[..n].copy_from_slice(&this.input.data[this.pos..this.pos + n]);
        this.pos += n;
        this.chunk_idx += 1;
        Poll::Ready(Ok(n))
    }
}

fuzz_target!(|input: ChunkedInput| {
    let Some(desc) = DescriptorPool::bootstrap().find_message_by_name("google.protobuf.FileDescriptorProto") else {
        return;
    };
    let options = DecodeOptions {
        allow_partial: true,
        ..Default::default()
    };

    let mut reader = ChunkedReader {
        input: &input,
        pos: 0,
        chunk_idx: 0,
    };
    let mut chunked = DynamicMessage::new(desc.clone());
    let streamed = futures::executor::block_on(chunked.decode_from_async_read(&mut reader, options));

    // Chunking must not change the outcome of a one-shot decode.
    let whole = DynamicMessage::decode_with_options(desc, &input.data, &options);
    match (streamed, whole) {
        (Ok(()), Ok(whole)) => assert_eq!(chunked.encode_to_vec(), whole.encode_to_vec()),
        (Err(_), Err(_)) => {}
        (a, b) => panic!("chunked {a:?} vs whole {b:?}"),
    }
});
