//! remote-messaging: blocking message connections for daemon/client IPC.

mod address;
mod classify;
mod config;
mod error;

pub mod bridge;
pub mod codec;
pub mod connection;
pub mod logging;
pub mod pump;
pub mod serializer;

pub use address::Address;
pub use classify::is_end_of_stream;
pub use codec::JsonCodec;
pub use config::{ConnectionConfig, DEFAULT_BUFFER_SIZE};
pub use connection::{Connection, ConnectionState, SocketConnection};
pub use error::ConnectionError;
pub use pump::{spawn_dispatcher, spawn_receiver};
pub use serializer::{JsonSerializer, MessageSerializer};
