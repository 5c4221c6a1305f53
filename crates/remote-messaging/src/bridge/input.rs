//! Read half of a socket: blocking reads served from a fixed receive window.

use std::io::{self, Read};

use mio::Interest;
use mio::net::TcpStream;

use super::registration::{Readiness, Registration, RegistrationHandle};

/// Blocking byte source over a non-blocking socket.
///
/// Bytes are served from a fixed receive window. The window is refilled with a
/// single socket read, and only once it has been fully consumed. A closed
/// registration reads as end of stream.
pub struct SocketInput {
    stream: TcpStream,
    registration: Registration,
    window: Box<[u8]>,
    pos: usize,
    limit: usize,
}

impl SocketInput {
    pub fn new(mut stream: TcpStream, capacity: usize) -> io::Result<Self> {
        let registration = Registration::new(&mut stream, Interest::READABLE, "read")?;
        Ok(Self {
            stream,
            registration,
            window: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            limit: 0,
        })
    }

    pub fn registration(&self) -> RegistrationHandle {
        self.registration.handle()
    }

    pub fn capacity(&self) -> usize {
        self.window.len()
    }

    /// Bytes in the window not yet handed out.
    pub fn buffered(&self) -> usize {
        self.limit - self.pos
    }

    /// Refill the window. Returns `false` on end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        self.pos = 0;
        self.limit = 0;
        loop {
            if self.registration.is_closed() {
                return Ok(false);
            }
            match self.stream.read(&mut self.window) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    tracing::trace!(bytes = n, "Refilled receive window");
                    self.limit = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if self.registration.wait()? == Readiness::Closed {
                        return Ok(false);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

impl Read for SocketInput {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }
        if self.buffered() == 0 && !self.fill()? {
            return Ok(0);
        }

        let count = self.buffered().min(dest.len());
        dest[..count].copy_from_slice(&self.window[self.pos..self.pos + count]);
        self.pos += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::loopback_pair;
    use std::io::Write;
    use std::thread;
    use std::time::Duration;

    fn input(capacity: usize) -> (SocketInput, std::net::TcpStream) {
        let (local, peer) = loopback_pair();
        local.set_nonblocking(true).unwrap();
        let input = SocketInput::new(TcpStream::from_std(local), capacity).unwrap();
        (input, peer)
    }

    #[test]
    fn zero_length_read_does_not_block() {
        let (mut input, _peer) = input(16);
        assert_eq!(input.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn serves_buffered_bytes_before_refilling() {
        let (mut input, mut peer) = input(16);
        peer.write_all(b"abcdef").unwrap();

        let mut buf = [0u8; 2];
        input.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
        assert_eq!(input.buffered(), 4);

        let mut rest = [0u8; 4];
        input.read_exact(&mut rest).unwrap();
        assert_eq!(&rest, b"cdef");
        assert_eq!(input.buffered(), 0);
    }

    #[test]
    fn one_refill_never_exceeds_capacity() {
        let (mut input, mut peer) = input(4);
        peer.write_all(b"0123456789").unwrap();

        let mut buf = [0u8; 10];
        let n = input.read(&mut buf).unwrap();
        assert!(n <= 4);
        assert_eq!(input.capacity(), 4);

        let mut rest = vec![0u8; 10 - n];
        input.read_exact(&mut rest).unwrap();
        let mut all = buf[..n].to_vec();
        all.extend(rest);
        assert_eq!(all, b"0123456789");
    }

    #[test]
    fn peer_close_is_end_of_stream() {
        let (mut input, peer) = input(16);
        drop(peer);
        let mut buf = [0u8; 8];
        assert_eq!(input.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn closed_registration_unblocks_pending_read() {
        let (mut input, _peer) = input(16);
        let handle = input.registration();

        let reader = thread::spawn(move || {
            let mut buf = [0u8; 8];
            input.read(&mut buf).unwrap()
        });
        thread::sleep(Duration::from_millis(50));
        handle.close();

        assert_eq!(reader.join().unwrap(), 0);
    }
}
