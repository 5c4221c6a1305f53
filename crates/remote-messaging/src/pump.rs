//! Async adapters that drive one direction of a connection from a blocking task.
//!
//! The coordinator runs on tokio while connections block. Each pump owns one
//! direction on a `spawn_blocking` thread and exchanges messages with async
//! code through an mpsc channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::connection::Connection;
use crate::error::ConnectionError;

/// Forward every received message into a channel.
///
/// The task ends cleanly at end of stream, or when the returned receiver is
/// dropped (reads are then halted with `request_stop`). A receive failure ends
/// the task with that error.
///
/// A dropped receiver is only noticed when the next message is forwarded. While
/// `receive()` is blocked the thread stays parked until a message or end of
/// stream arrives; call `request_stop` or `stop` on the connection to release it.
pub fn spawn_receiver<T, C>(
    connection: Arc<C>,
    capacity: usize,
) -> (mpsc::Receiver<T>, JoinHandle<Result<(), ConnectionError>>)
where
    T: Send + 'static,
    C: Connection<T> + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);

    let handle = tokio::task::spawn_blocking(move || {
        let remote = *connection.remote_address();
        loop {
            match connection.receive() {
                Ok(Some(message)) => {
                    if tx.blocking_send(message).is_err() {
                        tracing::debug!(%remote, "Receiver dropped, halting reads");
                        connection.request_stop();
                        return Ok(());
                    }
                }
                Ok(None) => {
                    tracing::debug!(%remote, "Connection reached end of stream");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(%remote, error = %e, "Receive failed");
                    return Err(e);
                }
            }
        }
    });

    (rx, handle)
}

/// Dispatch every message sent into the returned channel, in order.
///
/// The task ends when all senders are dropped, or with the first dispatch failure.
pub fn spawn_dispatcher<T, C>(
    connection: Arc<C>,
    capacity: usize,
) -> (mpsc::Sender<T>, JoinHandle<Result<(), ConnectionError>>)
where
    T: Send + 'static,
    C: Connection<T> + 'static,
{
    let (tx, mut rx) = mpsc::channel::<T>(capacity);

    let handle = tokio::task::spawn_blocking(move || {
        while let Some(message) = rx.blocking_recv() {
            if let Err(e) = connection.dispatch(&message) {
                tracing::warn!(remote = %connection.remote_address(), error = %e, "Dispatch failed");
                return Err(e);
            }
        }
        Ok(())
    });

    (tx, handle)
}
