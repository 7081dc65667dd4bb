//! Message transport
//!
//! The bridge only needs to send and receive discrete [`Message`]s. Each side
//! owns one sender and one receiver; the two directions are independent and
//! each is ordered.

mod line;

pub use line::{LineReceiver, LineSender};

use async_trait::async_trait;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

use crate::protocol::Message;
use crate::Result;

/// Outgoing half of a transport
#[async_trait]
pub trait MessageSender: Send + Sync + 'static {
    /// Send one message; messages are delivered in send order
    async fn send(&self, message: &Message) -> Result<()>;

    /// Close the outgoing direction so the peer observes end of stream
    async fn close(&self) -> Result<()>;
}

/// Incoming half of a transport
#[async_trait]
pub trait MessageReceiver: Send + 'static {
    /// Next message, or `None` once the peer has gone away
    async fn recv(&mut self) -> Result<Option<Message>>;
}

/// Sender end of an in-memory [`duplex`] pair
pub type DuplexSender = LineSender<WriteHalf<DuplexStream>>;

/// Receiver end of an in-memory [`duplex`] pair
pub type DuplexReceiver = LineReceiver<ReadHalf<DuplexStream>>;

/// One side of an in-memory connection
pub struct Endpoint {
    pub sender: DuplexSender,
    pub receiver: DuplexReceiver,
}

impl Endpoint {
    pub fn into_parts(self) -> (DuplexSender, DuplexReceiver) {
        (self.sender, self.receiver)
    }
}

/// Create a connected pair of in-memory endpoints
///
/// Messages still travel as newline-delimited JSON, so nothing but serialized
/// values crosses between the two sides.
pub fn duplex(max_buf_size: usize) -> (Endpoint, Endpoint) {
    let (a, b) = tokio::io::duplex(max_buf_size);
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    (
        Endpoint {
            sender: LineSender::new(a_write),
            receiver: LineReceiver::new(a_read),
        },
        Endpoint {
            sender: LineSender::new(b_write),
            receiver: LineReceiver::new(b_read),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_duplex_preserves_order() {
        // Room for every message, since nothing reads until all are sent
        let (left, right) = duplex(64 * 1024);
        let (left_tx, _left_rx) = left.into_parts();
        let (_right_tx, mut right_rx) = right.into_parts();

        for i in 0..20 {
            left_tx
                .send(&Message::SignalEmitted {
                    object: "backend".to_string(),
                    signal: "tick".to_string(),
                    args: vec![json!(i)],
                })
                .await
                .unwrap();
        }

        for i in 0..20 {
            match right_rx.recv().await.unwrap() {
                Some(Message::SignalEmitted { args, .. }) => assert_eq!(args, vec![json!(i)]),
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (left, right) = duplex(1024);
        let (left_tx, _left_rx) = left.into_parts();
        let (_right_tx, mut right_rx) = right.into_parts();

        left_tx.send(&Message::InitRequest).await.unwrap();
        left_tx.close().await.unwrap();

        assert_eq!(right_rx.recv().await.unwrap(), Some(Message::InitRequest));
        assert_eq!(right_rx.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dropping_endpoint_ends_peer_stream() {
        let (left, right) = duplex(1024);
        let (_right_tx, mut right_rx) = right.into_parts();

        drop(left);

        assert_eq!(right_rx.recv().await.unwrap(), None);
    }
}
