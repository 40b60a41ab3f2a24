//! An in-process [`Bus`] backed by an unbounded tokio channel.
//!
//! The receiving half is handed to whoever forwards events onward (the
//! server binary logs them). Publishing never blocks.

use chatd_core::event::{Bus, Event, Headers, PublishError};
use serde::Serialize;
use tokio::sync::mpsc;

/// One published event with its routing headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
  pub event:   Event,
  pub headers: Headers,
}

#[derive(Debug, Clone)]
pub struct ChannelBus {
  tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelBus {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl Bus for ChannelBus {
  fn publish(&self, event: Event, headers: Headers) -> Result<(), PublishError> {
    self
      .tx
      .send(Envelope { event, headers })
      .map_err(|_| PublishError::Closed)
  }
}
