mod common;

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use remote_messaging::{
    Connection, JsonCodec, JsonSerializer, SocketConnection, spawn_dispatcher, spawn_receiver,
};
use tokio_util::codec::{FramedRead, FramedWrite};

use common::{loopback_pair, string_connections};

/// Blocking connection on one end, tokio framed stream on the other.
fn mixed_pair() -> (SocketConnection<String>, tokio::net::TcpStream) {
    let (blocking, async_side) = loopback_pair();
    async_side.set_nonblocking(true).unwrap();
    let async_side = tokio::net::TcpStream::from_std(async_side).unwrap();
    let conn =
        SocketConnection::new(blocking, Arc::new(JsonSerializer::<String>::new())).unwrap();
    (conn, async_side)
}

#[tokio::test(flavor = "multi_thread")]
async fn async_codec_peer_reads_dispatched_messages() {
    let (conn, stream) = mixed_pair();
    let (read_half, _write_half) = stream.into_split();
    let mut frames = FramedRead::new(read_half, JsonCodec::<String>::new());

    let conn = Arc::new(conn);
    let dispatcher = Arc::clone(&conn);
    tokio::task::spawn_blocking(move || {
        dispatcher.dispatch(&"from blocking side".to_string()).unwrap();
        dispatcher.stop();
    })
    .await
    .unwrap();

    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(first, "from blocking side");
    assert!(frames.next().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_connection_reads_async_codec_frames() {
    let (conn, stream) = mixed_pair();
    let (_read_half, write_half) = stream.into_split();
    let mut sink = FramedWrite::new(write_half, JsonCodec::<String>::new());

    let (mut rx, handle) = spawn_receiver(Arc::new(conn), 8);

    for m in ["one", "two", "three"] {
        sink.send(&m.to_string()).await.unwrap();
    }
    drop(sink);

    let mut received = Vec::new();
    while let Some(m) = rx.recv().await {
        received.push(m);
    }
    assert_eq!(received, ["one", "two", "three"]);
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn pumps_connect_two_socket_connections() {
    let (a, b) = string_connections();
    let a = Arc::new(a);

    let (tx, dispatch_handle) = spawn_dispatcher(Arc::clone(&a), 4);
    let (mut rx, receive_handle) = spawn_receiver(Arc::new(b), 4);

    for i in 0..20 {
        tx.send(format!("event {i}")).await.unwrap();
    }
    drop(tx);
    dispatch_handle.await.unwrap().unwrap();
    a.stop();

    let mut received = Vec::new();
    while let Some(m) = rx.recv().await {
        received.push(m);
    }
    assert_eq!(received, (0..20).map(|i| format!("event {i}")).collect::<Vec<_>>());
    receive_handle.await.unwrap().unwrap();
}
