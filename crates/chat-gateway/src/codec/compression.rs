//! zlib inflation for inbound frames

use std::io::Read;

use flate2::{read::ZlibDecoder, Decompress, FlushDecompress, Status};

use crate::error::CodecError;

/// Every complete zlib-stream message ends with a sync flush marker
pub const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

const CHUNK: usize = 16 * 1024;

/// Shared inflate context for a `compress=zlib-stream` connection.
///
/// One context lives exactly as long as one WebSocket connection; the
/// dictionary carries over between messages.
pub struct ZlibStream {
    inflater: Decompress,
    buffer: Vec<u8>,
}

impl Default for ZlibStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ZlibStream {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(true),
            buffer: Vec::new(),
        }
    }

    /// Feed one binary WebSocket message.
    ///
    /// Returns the inflated bytes once the buffer ends with [`ZLIB_SUFFIX`],
    /// `None` while a message is still incomplete.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
        self.buffer.extend_from_slice(chunk);
        if !self.buffer.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        let buffered = std::mem::take(&mut self.buffer);
        self.inflate(&buffered).map(Some)
    }

    /// Bytes waiting for the rest of a message
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn inflate(&mut self, mut input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(input.len().saturating_mul(4).max(CHUNK));

        loop {
            if out.len() == out.capacity() {
                out.reserve(CHUNK);
            }

            let in_before = self.inflater.total_in();
            let out_before = self.inflater.total_out();
            let status = self
                .inflater
                .decompress_vec(input, &mut out, FlushDecompress::Sync)?;
            let consumed = (self.inflater.total_in() - in_before) as usize;
            let produced = self.inflater.total_out() - out_before;
            input = &input[consumed..];

            if status == Status::StreamEnd {
                break;
            }
            if input.is_empty() && out.len() < out.capacity() {
                break;
            }
            if consumed == 0 && produced == 0 {
                break;
            }
        }

        Ok(out)
    }
}

/// Inflate a self-contained zlib payload
pub fn inflate_standalone(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(4));
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Inflate(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::{Compress, Compression, FlushCompress};

    /// Server side of a zlib stream, flushing with a sync marker per message
    pub(crate) struct StreamCompressor(Compress);

    impl StreamCompressor {
        pub(crate) fn new() -> Self {
            Self(Compress::new(Compression::default(), true))
        }

        pub(crate) fn compress(&mut self, data: &[u8]) -> Vec<u8> {
            let mut out = Vec::with_capacity(data.len() + 64);
            let mut input = data;
            loop {
                if out.len() == out.capacity() {
                    out.reserve(1024);
                }
                let before = self.0.total_in();
                self.0
                    .compress_vec(input, &mut out, FlushCompress::Sync)
                    .unwrap();
                input = &input[(self.0.total_in() - before) as usize..];
                if input.is_empty() && out.ends_with(&ZLIB_SUFFIX) {
                    break;
                }
            }
            out
        }
    }

    #[test]
    fn test_stream_waits_for_suffix() {
        let mut server = StreamCompressor::new();
        let mut stream = ZlibStream::new();

        let compressed = server.compress(br#"{"op":11,"d":null}"#);
        let (head, tail) = compressed.split_at(compressed.len() / 2);

        assert_eq!(stream.push(head).unwrap(), None);
        assert_eq!(stream.pending(), head.len());
        assert_eq!(stream.push(tail).unwrap().unwrap(), br#"{"op":11,"d":null}"#);
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn test_stream_shares_context_between_messages() {
        let mut server = StreamCompressor::new();
        let mut stream = ZlibStream::new();

        let first = format!(r#"{{"op":0,"t":"MESSAGE_CREATE","d":{{"content":"{}"}}}}"#, "x".repeat(4096));
        for _ in 0..3 {
            let compressed = server.compress(first.as_bytes());
            assert_eq!(stream.push(&compressed).unwrap().unwrap(), first.as_bytes());
        }
    }

    #[test]
    fn test_inflate_standalone() {
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"op":10}"#).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(inflate_standalone(&compressed).unwrap(), br#"{"op":10}"#);
        assert!(inflate_standalone(b"not zlib").is_err());
    }
}
