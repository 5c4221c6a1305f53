//! Message serialization seam for connections.

use std::io::{self, Read, Write};
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::address::Address;
use crate::codec::{DEFAULT_MAX_FRAME_LENGTH, JsonCodec, LENGTH_FIELD_LENGTH};

/// Converts messages to and from the bytes of a connection.
///
/// `read` must consume exactly one message from `input` and nothing more, since
/// the next call continues from where it stopped. Failing with
/// `ErrorKind::UnexpectedEof` when the input runs dry signals end of stream.
pub trait MessageSerializer<T>: Send + Sync {
    fn read(&self, input: &mut dyn Read, local: &Address, remote: &Address) -> io::Result<T>;

    fn write(&self, message: &T, output: &mut dyn Write) -> io::Result<()>;
}

/// Length-prefixed JSON, wire compatible with [`JsonCodec`].
pub struct JsonSerializer<T> {
    max_frame_length: usize,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self {
            max_frame_length,
            _phantom: PhantomData,
        }
    }

    fn codec(&self) -> JsonCodec<T> {
        JsonCodec::with_max_frame_length(self.max_frame_length)
    }
}

impl<T: Serialize + DeserializeOwned> MessageSerializer<T> for JsonSerializer<T> {
    fn read(&self, input: &mut dyn Read, _local: &Address, _remote: &Address) -> io::Result<T> {
        let mut header = [0u8; LENGTH_FIELD_LENGTH];
        input.read_exact(&mut header)?;

        let body_len = u32::from_be_bytes(header) as usize;
        if body_len > self.max_frame_length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame of {body_len} bytes exceeds limit of {} bytes",
                    self.max_frame_length
                ),
            ));
        }

        // Read exactly one frame so the bytes of the next message stay in the input.
        let mut frame = BytesMut::zeroed(LENGTH_FIELD_LENGTH + body_len);
        frame[..LENGTH_FIELD_LENGTH].copy_from_slice(&header);
        input.read_exact(&mut frame[LENGTH_FIELD_LENGTH..])?;

        self.codec()
            .decode(&mut frame)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "incomplete frame"))
    }

    fn write(&self, message: &T, output: &mut dyn Write) -> io::Result<()> {
        let mut frame = BytesMut::new();
        self.codec().encode(message, &mut frame)?;
        output.write_all(&frame)
    }
}
