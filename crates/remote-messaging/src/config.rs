//! Connection tuning.

/// Receive window and send buffer capacity used when nothing else is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Capacity of each direction's byte buffer. Fixed for the life of the connection.
    pub buffer_size: usize,
    /// Disable Nagle's algorithm on the socket.
    pub nodelay: bool,
    /// Also shut down the socket's read direction on `request_stop`.
    ///
    /// Off by default: `request_stop` only closes the read registration.
    pub half_close_on_request_stop: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            buffer_size: std::env::var("REMOTE_MESSAGING_BUFFER_SIZE")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_BUFFER_SIZE),
            nodelay: true,
            half_close_on_request_stop: false,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn with_half_close_on_request_stop(mut self, enabled: bool) -> Self {
        self.half_close_on_request_stop = enabled;
        self
    }

    pub(crate) fn validate(&self) -> std::io::Result<()> {
        if self.buffer_size == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "buffer size must be greater than zero",
            ));
        }
        Ok(())
    }
}
