//! End-of-stream classification for the receive path.
//!
//! Peers that go away abruptly surface as I/O errors whose text differs per
//! platform. Those are graceful closes from the connection's point of view.
//! Keep all matching here so it can be widened to structured codes in one place.

use std::error::Error;
use std::io;

/// Platform phrasings for a peer that disappeared mid-stream.
const ABRUPT_DISCONNECT_MESSAGES: [&str; 3] = [
    "An existing connection was forcibly closed by the remote host",
    "An established connection was aborted by the software in your host machine",
    "Connection reset by peer",
];

/// Returns true when `err` means the peer ended the stream rather than the transport failing.
pub fn is_end_of_stream(err: &io::Error) -> bool {
    classify(err)
}

fn classify(err: &(dyn Error + 'static)) -> bool {
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        if is_end_of_stream_kind(io_err.kind()) {
            return true;
        }
        // io::Error::source() skips the wrapped error itself
        if let Some(inner) = io_err.get_ref()
            && classify(inner)
        {
            return true;
        }
    }
    if is_abrupt_disconnect_message(&err.to_string()) {
        return true;
    }
    err.source().is_some_and(classify)
}

fn is_end_of_stream_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

// OS errors render as "<text> (os error N)", so match on the prefix.
fn is_abrupt_disconnect_message(text: &str) -> bool {
    ABRUPT_DISCONNECT_MESSAGES
        .iter()
        .any(|phrase| text.starts_with(phrase))
}
