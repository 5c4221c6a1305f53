#![allow(dead_code)]

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use remote_messaging::{JsonSerializer, MessageSerializer, SocketConnection};

/// Connected loopback TCP pair in blocking mode.
pub fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

/// Two connections speaking length-prefixed JSON strings to each other.
pub fn string_connections() -> (SocketConnection<String>, SocketConnection<String>) {
    let (a, b) = loopback_pair();
    let serializer: Arc<dyn MessageSerializer<String>> = Arc::new(JsonSerializer::new());
    (
        SocketConnection::new(a, Arc::clone(&serializer)).unwrap(),
        SocketConnection::new(b, serializer).unwrap(),
    )
}
