//! Blocking stream adapters over a non-blocking socket.
//!
//! Each direction gets its own duplicate of the socket, its own buffer and its
//! own readiness registration, so a reader thread and a writer thread never
//! share mutable state.
//!
//! - **input**: `SocketInput`, a `Read` with a fixed receive window
//! - **output**: `SocketOutput`, a `Write` with a fixed send buffer
//! - **registration**: per-direction `mio::Poll` plus a waker for cancellation

mod input;
mod output;
mod registration;

pub use input::SocketInput;
pub use output::SocketOutput;
pub use registration::RegistrationHandle;
