//! Depth-zero (rendezvous) channel.
//!
//! A `send` only completes once the receiving side has taken the value, so a
//! producer can never run ahead of its consumer. Both sides honour a
//! `CancellationToken` while suspended.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    #[error("handoff channel closed")]
    Closed,
    #[error("context cancelled")]
    Cancelled,
}

struct Delivery<T> {
    value: T,
    ack: oneshot::Sender<()>,
}

/// Sending half of a handoff channel.
pub struct HandoffSender<T> {
    sender: mpsc::Sender<Delivery<T>>,
}

/// Receiving half of a handoff channel.
pub struct HandoffReceiver<T> {
    receiver: mpsc::Receiver<Delivery<T>>,
}

/// Creates a rendezvous channel.
///
/// The receiver observes end-of-stream once every `HandoffSender` has been dropped.
pub fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    // A single slot holds at most one delivery whose sender is still waiting for
    // the acknowledgement, so nothing is ever buffered beyond the in-flight value.
    let (sender, receiver) = mpsc::channel(1);
    (HandoffSender { sender }, HandoffReceiver { receiver })
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> HandoffSender<T> {
    /// Hands `value` to the receiver, waiting until it has been taken.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the receiver accepted the value.
    /// * `Err(HandoffError::Closed)` if the receiver is gone.
    /// * `Err(HandoffError::Cancelled)` if `cancel` fired first. A cancelled value is
    ///   never observed by the receiver.
    pub async fn send(&self, value: T, cancel: &CancellationToken) -> Result<(), HandoffError> {
        let (ack, mut accepted) = oneshot::channel();
        let delivery = Delivery { value, ack };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HandoffError::Cancelled),
            sent = self.sender.send(delivery) => sent.map_err(|_| HandoffError::Closed)?,
        }

        tokio::select! {
            biased;
            acked = &mut accepted => acked.map_err(|_| HandoffError::Closed),
            _ = cancel.cancelled() => match accepted.try_recv() {
                // The receiver won the race; the value was delivered.
                Ok(()) => Ok(()),
                Err(_) => Err(HandoffError::Cancelled),
            },
        }
    }

    /// Returns true once the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<T> HandoffReceiver<T> {
    /// Takes the next value.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(value))` for each accepted value, in send order.
    /// * `Ok(None)` once every sender has been dropped.
    /// * `Err(HandoffError::Cancelled)` if `cancel` fired first.
    pub async fn recv(&mut self, cancel: &CancellationToken) -> Result<Option<T>, HandoffError> {
        loop {
            let delivery = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HandoffError::Cancelled),
                delivery = self.receiver.recv() => delivery,
            };
            match delivery {
                None => return Ok(None),
                Some(Delivery { value, ack }) => {
                    // A failed ack means the sender abandoned this value.
                    if ack.send(()).is_ok() {
                        return Ok(Some(value));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_send_waits_for_receiver() {
        let cancel = CancellationToken::new();
        let (tx, mut rx) = channel::<u32>();

        let send_cancel = cancel.clone();
        let mut sending = tokio::spawn(async move { tx.send(1, &send_cancel).await });

        // Nobody is receiving yet, so the send must still be pending.
        assert!(timeout(Duration::from_millis(50), &mut sending).await.is_err());

        assert_eq!(rx.recv(&cancel).await, Ok(Some(1)));
        assert_eq!(sending.await.unwrap(), Ok(()));
        // Every sender is gone now.
        assert_eq!(rx.recv(&cancel).await, Ok(None));
    }

    #[tokio::test]
    async fn test_preserves_order() {
        let cancel = CancellationToken::new();
        let (tx, mut rx) = channel::<u32>();
        let send_cancel = cancel.clone();
        tokio::spawn(async move {
            for i in 0..5 {
                tx.send(i, &send_cancel).await.unwrap();
            }
        });

        let mut received = Vec::new();
        while let Some(v) = rx.recv(&cancel).await.unwrap() {
            received.push(v);
        }
        assert_eq!(received, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_send_to_dropped_receiver_fails() {
        let cancel = CancellationToken::new();
        let (tx, rx) = channel::<u32>();
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.send(1, &cancel).await, Err(HandoffError::Closed));
    }

    #[tokio::test]
    async fn test_cancelled_send_is_never_received() {
        let cancel = CancellationToken::new();
        let (tx, mut rx) = channel::<u32>();

        let send_cancel = cancel.clone();
        let sending = tokio::spawn(async move { tx.send(1, &send_cancel).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        assert_eq!(sending.await.unwrap(), Err(HandoffError::Cancelled));

        // The abandoned value is skipped and the stream ends.
        let fresh = CancellationToken::new();
        assert_eq!(rx.recv(&fresh).await, Ok(None));
    }

    #[tokio::test]
    async fn test_recv_cancelled() {
        let cancel = CancellationToken::new();
        let (_tx, mut rx) = channel::<u32>();
        cancel.cancel();
        assert_eq!(rx.recv(&cancel).await, Err(HandoffError::Cancelled));
    }
}
