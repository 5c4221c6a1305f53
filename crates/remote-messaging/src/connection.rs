//! Blocking message connections.
//!
//! A `SocketConnection` turns a connected TCP stream into ordered, blocking
//! message exchange. The socket runs in non-blocking mode underneath; each
//! direction blocks on its own readiness registration, which lets another
//! thread cancel a pending read without touching the write side.
//!
//! Lifecycle: Open → ReadHalted (`request_stop`) → Closed (`stop`). `stop` is
//! accepted from any state and repeated calls are no-ops.

use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::address::Address;
use crate::bridge::{RegistrationHandle, SocketInput, SocketOutput};
use crate::classify::is_end_of_stream;
use crate::config::ConnectionConfig;
use crate::error::ConnectionError;
use crate::serializer::MessageSerializer;

/// Two-way message channel to one remote endpoint.
///
/// At most one `receive` and one `dispatch` may be in flight at a time. The two
/// directions are independent and may run on different threads.
pub trait Connection<T>: Send + Sync {
    fn local_address(&self) -> &Address;

    fn remote_address(&self) -> &Address;

    /// Block until a message arrives. `Ok(None)` means the stream ended.
    fn receive(&self) -> Result<Option<T>, ConnectionError>;

    /// Write a message and flush it to the channel before returning.
    fn dispatch(&self, message: &T) -> Result<(), ConnectionError>;

    /// Stop receiving. Pending and later `receive` calls return `Ok(None)`.
    fn request_stop(&self);

    /// Release the connection. Safe to call more than once.
    ///
    /// Pending `receive` and `dispatch` calls are unblocked. Sockets and poll
    /// handles are only freed when the connection itself is dropped, so drop it
    /// after stopping.
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    ReadHalted,
    Closed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::ReadHalted,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::ReadHalted => 1,
            Self::Closed => 2,
        }
    }
}

pub struct SocketConnection<T> {
    socket: TcpStream,
    local_address: Address,
    remote_address: Address,
    serializer: Arc<dyn MessageSerializer<T>>,
    // Uncontended when callers keep to one thread per direction.
    input: Mutex<SocketInput>,
    output: Mutex<SocketOutput>,
    read_registration: RegistrationHandle,
    write_registration: RegistrationHandle,
    state: AtomicU8,
    config: ConnectionConfig,
}

impl<T> SocketConnection<T> {
    pub fn new(
        socket: TcpStream,
        serializer: Arc<dyn MessageSerializer<T>>,
    ) -> Result<Self, ConnectionError> {
        Self::with_config(socket, serializer, ConnectionConfig::default())
    }

    pub fn with_config(
        socket: TcpStream,
        serializer: Arc<dyn MessageSerializer<T>>,
        config: ConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        config.validate().map_err(ConnectionError::configure)?;

        // Non-blocking mode is the only portable way to stop reads while
        // keeping writes usable.
        socket
            .set_nonblocking(true)
            .map_err(ConnectionError::configure)?;
        if config.nodelay {
            socket.set_nodelay(true).map_err(ConnectionError::configure)?;
        }

        let local_address = socket
            .local_addr()
            .map(Address::from)
            .map_err(ConnectionError::configure)?;
        let remote_address = socket
            .peer_addr()
            .map(Address::from)
            .map_err(ConnectionError::configure)?;

        let input = SocketInput::new(direction(&socket)?, config.buffer_size)
            .map_err(ConnectionError::configure)?;
        let output = SocketOutput::new(direction(&socket)?, config.buffer_size)
            .map_err(ConnectionError::configure)?;

        tracing::debug!(
            local = %local_address,
            remote = %remote_address,
            buffer_size = config.buffer_size,
            "Socket connection established"
        );

        Ok(Self {
            read_registration: input.registration(),
            write_registration: output.registration(),
            socket,
            local_address,
            remote_address,
            serializer,
            input: Mutex::new(input),
            output: Mutex::new(output),
            state: AtomicU8::new(ConnectionState::Open.as_u8()),
            config,
        })
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn shutdown_socket(&self, how: Shutdown) {
        match self.socket.shutdown(how) {
            Ok(()) => {}
            // already shut down, or the peer is gone
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => {
                tracing::warn!(
                    remote = %self.remote_address,
                    how = ?how,
                    error = %e,
                    "Failed to shut down socket"
                );
            }
        }
    }
}

/// Duplicate the socket for one direction's exclusive use.
fn direction(socket: &TcpStream) -> Result<mio::net::TcpStream, ConnectionError> {
    let clone = socket.try_clone().map_err(ConnectionError::configure)?;
    Ok(mio::net::TcpStream::from_std(clone))
}

/// Longest message rendering kept in a dispatch error, in characters.
const MAX_RENDERED_MESSAGE: usize = 256;

fn render_message<T: fmt::Debug>(message: &T) -> String {
    let rendered = format!("{message:?}");
    match rendered.char_indices().nth(MAX_RENDERED_MESSAGE) {
        Some((cut, _)) => format!("{}…", &rendered[..cut]),
        None => rendered,
    }
}

fn poisoned(direction: &str) -> io::Error {
    io::Error::other(format!("{direction} path poisoned by an earlier panic"))
}

impl<T> Connection<T> for SocketConnection<T>
where
    T: fmt::Debug,
{
    fn local_address(&self) -> &Address {
        &self.local_address
    }

    fn remote_address(&self) -> &Address {
        &self.remote_address
    }

    fn receive(&self) -> Result<Option<T>, ConnectionError> {
        let mut input = self.input.lock().map_err(|_| ConnectionError::Receive {
            remote: self.remote_address,
            source: poisoned("receive"),
        })?;

        match self
            .serializer
            .read(&mut *input, &self.local_address, &self.remote_address)
        {
            Ok(message) => Ok(Some(message)),
            Err(e) if is_end_of_stream(&e) => {
                tracing::trace!(remote = %self.remote_address, error = %e, "End of stream");
                Ok(None)
            }
            Err(source) => Err(ConnectionError::Receive {
                remote: self.remote_address,
                source,
            }),
        }
    }

    fn dispatch(&self, message: &T) -> Result<(), ConnectionError> {
        let dispatch_error = |source: io::Error| ConnectionError::Dispatch {
            remote: self.remote_address,
            message: render_message(message),
            source,
        };

        let mut output = self
            .output
            .lock()
            .map_err(|_| dispatch_error(poisoned("dispatch")))?;

        self.serializer
            .write(message, &mut *output)
            .and_then(|()| io::Write::flush(&mut *output))
            .map_err(dispatch_error)
    }

    // Only the read registration is closed here; dispatch keeps working and the
    // socket stays fully open unless `half_close_on_request_stop` is set.
    fn request_stop(&self) {
        let halted = self
            .state
            .compare_exchange(
                ConnectionState::Open.as_u8(),
                ConnectionState::ReadHalted.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !halted {
            return;
        }

        tracing::debug!(remote = %self.remote_address, "Stop requested, halting reads");
        self.read_registration.close();
        if self.config.half_close_on_request_stop {
            self.shutdown_socket(Shutdown::Read);
        }
    }

    fn stop(&self) {
        let previous = self
            .state
            .swap(ConnectionState::Closed.as_u8(), Ordering::AcqRel);
        if ConnectionState::from_u8(previous) == ConnectionState::Closed {
            return;
        }

        tracing::debug!(remote = %self.remote_address, "Stopping socket connection");
        self.read_registration.close();
        self.write_registration.close();
        self.shutdown_socket(Shutdown::Both);
    }
}

impl<T> fmt::Display for SocketConnection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "socket connection at {} with {}",
            self.local_address, self.remote_address
        )
    }
}

impl<T> fmt::Debug for SocketConnection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketConnection")
            .field("local_address", &self.local_address)
            .field("remote_address", &self.remote_address)
            .field("state", &self.state())
            .finish()
    }
}
