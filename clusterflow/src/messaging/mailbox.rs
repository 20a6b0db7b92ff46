//! Per-actor unbounded FIFO mailboxes.

use super::{ActorId, Envelope, Message};
use crate::errors::MailboxClosedError;
use tokio::sync::mpsc;

/// Creates a connected address/mailbox pair for the actor `owner`.
#[must_use]
pub fn mailbox(owner: impl Into<String>) -> (Address, Mailbox) {
    let owner = owner.into();
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Address {
            owner: owner.clone(),
            tx,
        },
        Mailbox { owner, rx },
    )
}

/// Sending half of a mailbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Address {
    owner: String,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Address {
    /// Name of the actor that owns the mailbox.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Delivers a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the owning actor has stopped.
    pub fn send(&self, sender: ActorId, message: Message) -> Result<(), MailboxClosedError> {
        self.tx
            .send(Envelope::new(sender, message))
            .map_err(|_| MailboxClosedError::new(self.owner.clone()))
    }

    /// Returns true once the owning actor has dropped its mailbox.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a mailbox, owned by exactly one actor loop.
#[derive(Debug)]
pub struct Mailbox {
    owner: String,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Mailbox {
    /// Name of the owning actor.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Waits for the next message. Returns `None` once every address is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Returns the next message if one is queued.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Drains every queued message.
    pub fn drain(&mut self) -> Vec<Envelope> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageId;

    #[tokio::test]
    async fn test_fifo_from_one_sender() {
        let (address, mut mailbox) = mailbox("orchestrator");
        let sender = ActorId::Stage(StageId::new("prep"));

        address.send(sender.clone(), Message::AbortAck).unwrap();
        address
            .send(sender.clone(), Message::StageComplete { detail: "done".into() })
            .unwrap();

        assert_eq!(mailbox.recv().await.unwrap().message, Message::AbortAck);
        assert_eq!(mailbox.recv().await.unwrap().message.kind(), "STAGE_COMPLETE");
    }

    #[tokio::test]
    async fn test_recv_none_after_all_addresses_dropped() {
        let (address, mut mailbox) = mailbox("prep");
        drop(address);
        assert!(mailbox.recv().await.is_none());
    }

    #[test]
    fn test_send_to_closed_mailbox_fails() {
        let (address, mailbox) = mailbox("prep");
        drop(mailbox);

        assert!(address.is_closed());
        let err = address.send(ActorId::Orchestrator, Message::Start).unwrap_err();
        assert_eq!(err.receiver, "prep");
    }

    #[test]
    fn test_drain() {
        let (address, mut mailbox) = mailbox("prep");
        address.send(ActorId::Orchestrator, Message::Start).unwrap();
        address.send(ActorId::Orchestrator, Message::Abort).unwrap();

        let drained = mailbox.drain();
        assert_eq!(drained.len(), 2);
        assert!(mailbox.try_recv().is_none());
    }
}
