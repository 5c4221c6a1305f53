use std::io;

use crate::address::Address;

/// Failures raised by a connection.
///
/// Every variant is fatal to the connection: the caller should `stop()` it and
/// discard it. A graceful end of stream is not an error, see `Connection::receive`.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The channel could not be prepared for use.
    #[error("could not configure socket connection: {source}")]
    Configure {
        #[source]
        source: io::Error,
    },

    /// Transport or decode failure while receiving.
    #[error("could not read message from '{remote}'")]
    Receive {
        remote: Address,
        #[source]
        source: io::Error,
    },

    /// Transport or encode failure while dispatching.
    #[error("could not write message {message} to '{remote}'")]
    Dispatch {
        remote: Address,
        message: String,
        #[source]
        source: io::Error,
    },
}

impl ConnectionError {
    pub fn configure(source: io::Error) -> Self {
        Self::Configure { source }
    }

    /// Remote endpoint involved, if the connection got far enough to know it.
    pub fn remote(&self) -> Option<&Address> {
        match self {
            Self::Configure { .. } => None,
            Self::Receive { remote, .. } | Self::Dispatch { remote, .. } => Some(remote),
        }
    }

    /// Underlying I/O or serialization error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Configure { source }
            | Self::Receive { source, .. }
            | Self::Dispatch { source, .. } => source,
        }
    }
}
