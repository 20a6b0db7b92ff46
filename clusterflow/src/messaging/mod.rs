//! Actor messaging substrate.
//!
//! Every actor owns one [`Mailbox`]; anyone holding its [`Address`] can
//! deliver [`Envelope`]s to it. Messages from one sender arrive in send
//! order. Nothing is guaranteed about interleaving across senders.

mod mailbox;
mod message;

pub use mailbox::{mailbox, Address, Mailbox};
pub use message::{ActorId, Envelope, Message};
