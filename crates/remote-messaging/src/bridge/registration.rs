//! Readiness registration for one direction of a socket.
//!
//! Each bridge owns a private `mio::Poll` with exactly one socket interest and a
//! waker. Closing the registration from another thread wakes a blocked waiter,
//! which is how `stop()` cancels an in-flight read or write.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token, Waker};

const SOCKET: Token = Token(0);
const WAKE: Token = Token(1);

/// Outcome of waiting on a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready,
    Closed,
}

pub(crate) struct Registration {
    poll: Poll,
    events: Events,
    handle: RegistrationHandle,
}

impl Registration {
    pub(crate) fn new(
        stream: &mut TcpStream,
        interest: Interest,
        name: &'static str,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry().register(stream, SOCKET, interest)?;
        let waker = Waker::new(poll.registry(), WAKE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(4),
            handle: RegistrationHandle {
                shared: Arc::new(Shared {
                    closed: AtomicBool::new(false),
                    waker,
                    name,
                }),
            },
        })
    }

    pub(crate) fn handle(&self) -> RegistrationHandle {
        self.handle.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Block until the socket reports readiness or the registration is closed.
    ///
    /// Waits are indefinite. Spurious wakeups loop back into the poll.
    pub(crate) fn wait(&mut self) -> io::Result<Readiness> {
        loop {
            if self.is_closed() {
                return Ok(Readiness::Closed);
            }

            match self.poll.poll(&mut self.events, None) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            if self.is_closed() {
                return Ok(Readiness::Closed);
            }
            if self.events.iter().any(|event| event.token() == SOCKET) {
                return Ok(Readiness::Ready);
            }
        }
    }
}

/// Cloneable handle used to close a registration from any thread.
#[derive(Clone)]
pub struct RegistrationHandle {
    shared: Arc<Shared>,
}

struct Shared {
    closed: AtomicBool,
    waker: Waker,
    name: &'static str,
}

impl RegistrationHandle {
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Close the registration and wake any waiter.
    ///
    /// Returns `false` if it was already closed; only the first close wakes.
    pub fn close(&self) -> bool {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::trace!(registration = self.shared.name, "Closing readiness registration");
        if let Err(e) = self.shared.waker.wake() {
            tracing::warn!(
                registration = self.shared.name,
                error = %e,
                "Failed to wake readiness waiter"
            );
        }
        true
    }
}

impl fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("name", &self.shared.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}
