//! Wire encodings for gateway frames
//!
//! JSON frames travel as text messages, ETF frames as binary messages.
//! Inbound binary messages may additionally be zlib compressed, either as a
//! connection-wide stream or one payload at a time.

pub mod compression;
pub mod etf;

pub use compression::{inflate_standalone, ZlibStream, ZLIB_SUFFIX};

use chat_common::WireEncoding;
use tokio_tungstenite::tungstenite::Message;

use crate::error::CodecError;
use crate::protocol::GatewayMessage;

/// Encoder/decoder for one wire encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    encoding: WireEncoding,
}

impl Codec {
    #[must_use]
    pub const fn new(encoding: WireEncoding) -> Self {
        Self { encoding }
    }

    #[must_use]
    pub const fn encoding(&self) -> WireEncoding {
        self.encoding
    }

    /// Encode a frame into the WebSocket message for this encoding
    pub fn encode(&self, message: &GatewayMessage) -> Result<Message, CodecError> {
        match self.encoding {
            WireEncoding::Json => Ok(Message::Text(serde_json::to_string(message)?)),
            WireEncoding::Etf => Ok(Message::Binary(etf::encode(&message.to_value()?))),
        }
    }

    /// Decode one complete, uncompressed payload
    pub fn decode(&self, data: &[u8]) -> Result<GatewayMessage, CodecError> {
        match self.encoding {
            WireEncoding::Json => Ok(serde_json::from_slice(data)?),
            WireEncoding::Etf => Ok(GatewayMessage::from_value(etf::decode(data)?)?),
        }
    }
}

/// Turns inbound WebSocket messages into frames for one connection
pub struct InboundDecoder {
    codec: Codec,
    stream: Option<ZlibStream>,
}

impl InboundDecoder {
    /// `zlib_stream` enables the connection-wide inflate context
    #[must_use]
    pub fn new(codec: Codec, zlib_stream: bool) -> Self {
        Self {
            codec,
            stream: zlib_stream.then(ZlibStream::new),
        }
    }

    /// Decode a text message
    pub fn text(&self, text: &str) -> Result<GatewayMessage, CodecError> {
        self.codec.decode(text.as_bytes())
    }

    /// Decode a binary message.
    ///
    /// Returns `None` while a zlib-stream message is still buffering.
    pub fn binary(&mut self, data: &[u8]) -> Result<Option<GatewayMessage>, CodecError> {
        if let Some(stream) = self.stream.as_mut() {
            return match stream.push(data)? {
                Some(inflated) => self.codec.decode(&inflated).map(Some),
                None => Ok(None),
            };
        }

        match data.first() {
            Some(&(b'{' | etf::FORMAT_VERSION)) => self.codec.decode(data).map(Some),
            _ => {
                let inflated = inflate_standalone(data)?;
                self.codec.decode(&inflated).map(Some)
            }
        }
    }
}
