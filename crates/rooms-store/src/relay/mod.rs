//! Cross-process relay over Redis Pub/Sub.
//!
//! A broadcast in relay mode is published once on `<ns>:relay`. Every process
//! runs a [`RelayListener`] that hands the payload to whichever of the listed
//! connections it holds.

mod envelope;
mod listener;
mod publisher;

pub use envelope::{deliver, relay_channel, RelayEnvelope};
pub use listener::{RelayListener, RelayListenerHandle};
pub use publisher::PubSubRelay;
