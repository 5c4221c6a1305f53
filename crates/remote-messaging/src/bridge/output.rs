//! Write half of a socket: buffered blocking writes drained on flush.

use std::io::{self, Write};

use mio::Interest;
use mio::net::TcpStream;

use super::registration::{Readiness, Registration, RegistrationHandle};

/// Blocking byte sink over a non-blocking socket.
///
/// Writes accumulate in a fixed send buffer which is drained when it fills up
/// or on `flush`. Partial socket writes are retried until the buffer is empty.
/// Unlike reads, a registration closed with bytes still pending is an error.
pub struct SocketOutput {
    stream: TcpStream,
    registration: Registration,
    buffer: Box<[u8]>,
    len: usize,
}

impl SocketOutput {
    pub fn new(mut stream: TcpStream, capacity: usize) -> io::Result<Self> {
        let registration = Registration::new(&mut stream, Interest::WRITABLE, "write")?;
        Ok(Self {
            stream,
            registration,
            buffer: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        })
    }

    pub fn registration(&self) -> RegistrationHandle {
        self.registration.handle()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes waiting to be drained.
    pub fn pending(&self) -> usize {
        self.len
    }

    fn drain(&mut self) -> io::Result<()> {
        let mut written = 0;
        while written < self.len {
            if self.registration.is_closed() {
                return Err(closed_with_pending(self.len - written));
            }
            match self.stream.write(&self.buffer[written..self.len]) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if self.registration.wait()? == Readiness::Closed {
                        return Err(closed_with_pending(self.len - written));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        tracing::trace!(bytes = self.len, "Drained send buffer");
        self.len = 0;
        Ok(())
    }
}

fn closed_with_pending(pending: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("write registration closed with {pending} bytes pending"),
    )
}

impl Write for SocketOutput {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        let mut remaining = src;
        while !remaining.is_empty() {
            let count = (self.buffer.len() - self.len).min(remaining.len());
            self.buffer[self.len..self.len + count].copy_from_slice(&remaining[..count]);
            self.len += count;
            remaining = &remaining[count..];
            if self.len == self.buffer.len() {
                self.drain()?;
            }
        }
        Ok(src.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain()
    }
}
