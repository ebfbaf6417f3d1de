//! Load promise
//!
//! Settled by the controller when the probe for an element completes.
//! Dropping the sender without settling (element removed) reads as
//! `ImageLoadError::Cancelled`.

use crate::ImageLoadError;
use lazy_dom::NodeId;
use smol::channel::{self, Receiver, Sender, TryRecvError};

pub(crate) type Settle = Sender<Result<NodeId, ImageLoadError>>;

/// Eventual outcome of `LazyLoader::load`
#[derive(Debug)]
pub struct LoadPromise {
    element: NodeId,
    rx: Receiver<Result<NodeId, ImageLoadError>>,
    outcome: Option<Result<NodeId, ImageLoadError>>,
}

impl LoadPromise {
    pub(crate) fn new(element: NodeId) -> (Self, Settle) {
        let (tx, rx) = channel::bounded(1);
        let promise = Self {
            element,
            rx,
            outcome: None,
        };
        (promise, tx)
    }

    /// Element being loaded
    pub fn element(&self) -> NodeId {
        self.element
    }

    /// Outcome if settled, `None` while the probe is in flight
    pub fn try_result(&mut self) -> Option<Result<NodeId, ImageLoadError>> {
        if self.outcome.is_none() {
            self.outcome = match self.rx.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(Err(ImageLoadError::Cancelled(self.element))),
            };
        }
        self.outcome.clone()
    }

    pub fn is_settled(&mut self) -> bool {
        self.try_result().is_some()
    }

    /// Wait for the outcome
    pub async fn settled(mut self) -> Result<NodeId, ImageLoadError> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.rx
            .recv()
            .await
            .unwrap_or(Err(ImageLoadError::Cancelled(self.element)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves() {
        let node = NodeId::from_raw(3);
        let (mut promise, tx) = LoadPromise::new(node);
        assert!(promise.try_result().is_none());

        tx.try_send(Ok(node)).unwrap();
        assert_eq!(promise.try_result(), Some(Ok(node)));
        // Stays settled
        assert_eq!(promise.try_result(), Some(Ok(node)));
    }

    #[test]
    fn test_dropped_sender_is_cancellation() {
        let node = NodeId::from_raw(3);
        let (promise, tx) = LoadPromise::new(node);
        drop(tx);
        assert_eq!(
            smol::block_on(promise.settled()),
            Err(ImageLoadError::Cancelled(node))
        );
    }

    #[test]
    fn test_settled_after_poll() {
        let node = NodeId::from_raw(3);
        let (mut promise, tx) = LoadPromise::new(node);
        let failure = ImageLoadError::Failed {
            element: node,
            url: "a.png".to_string(),
        };
        tx.try_send(Err(failure.clone())).unwrap();
        assert!(promise.is_settled());
        assert_eq!(smol::block_on(promise.settled()), Err(failure));
    }
}
