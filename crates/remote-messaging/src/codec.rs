//! Framed JSON codec shared by blocking and async endpoints.
//!
//! Uses LengthDelimitedCodec for framing (4-byte big-endian length) and
//! serde_json for the body. `JsonSerializer` writes the same frames over a
//! blocking connection, so an async peer can use this codec with
//! FramedRead/FramedWrite on the other end.

use std::io;
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Length prefix size in bytes.
pub const LENGTH_FIELD_LENGTH: usize = 4;

/// Largest frame body accepted by default.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Codec that frames messages with length prefix and serializes with JSON.
pub struct JsonCodec<T> {
    inner: LengthDelimitedCodec,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(LENGTH_FIELD_LENGTH)
                .max_frame_length(max_frame_length)
                .new_codec(),
            _phantom: PhantomData,
        }
    }

    pub fn max_frame_length(&self) -> usize {
        self.inner.max_frame_length()
    }
}

impl<T: DeserializeOwned> Decoder for JsonCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(bytes) => {
                let item = serde_json::from_slice(&bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }
}

impl<'a, T: Serialize> Encoder<&'a T> for JsonCodec<T> {
    type Error = io::Error;

    fn encode(&mut self, item: &'a T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json =
            serde_json::to_vec(item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let json_len = json.len();
        tracing::trace!(json_size_bytes = json_len, "Encoding frame");
        if json_len > 100_000 {
            tracing::debug!(
                json_size_bytes = json_len,
                json_size_kb = json_len / 1024,
                "Large frame being encoded"
            );
        }
        self.inner.encode(Bytes::from(json), dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum BuildEvent {
        Started { build_id: String },
        Progress { build_id: String, percent: u8 },
        Finished { build_id: String, success: bool },
    }

    #[test]
    fn frame_is_length_prefixed_json() {
        let mut codec = JsonCodec::<String>::new();
        let mut buf = BytesMut::new();

        codec.encode(&"hi".to_string(), &mut buf).unwrap();

        assert_eq!(&buf[..], b"\x00\x00\x00\x04\"hi\"");
    }

    #[test]
    fn decodes_event_after_encode() {
        let mut codec = JsonCodec::<BuildEvent>::new();
        let mut buf = BytesMut::new();

        let event = BuildEvent::Progress {
            build_id: "b-1".to_string(),
            percent: 40,
        };
        codec.encode(&event, &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(decoded, event);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut codec = JsonCodec::<BuildEvent>::new();
        let mut full = BytesMut::new();
        codec
            .encode(
                &BuildEvent::Started {
                    build_id: "b-2".to_string(),
                },
                &mut full,
            )
            .unwrap();

        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn consecutive_frames_decode_in_order() {
        let mut codec = JsonCodec::<BuildEvent>::new();
        let mut buf = BytesMut::new();

        let events = [
            BuildEvent::Started {
                build_id: "b-3".to_string(),
            },
            BuildEvent::Finished {
                build_id: "b-3".to_string(),
                success: true,
            },
        ];
        for event in &events {
            codec.encode(event, &mut buf).unwrap();
        }

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), events[0]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), events[1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn malformed_body_is_invalid_data() {
        let mut codec = JsonCodec::<BuildEvent>::new();
        let mut buf = BytesMut::from(&b"\x00\x00\x00\x03{x}"[..]);

        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut codec = JsonCodec::<String>::with_max_frame_length(8);
        let mut buf = BytesMut::new();

        let err = codec
            .encode(&"a long string body".to_string(), &mut buf)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(codec.max_frame_length(), 8);
    }
}
