//! Remote-procedure messages.

use crate::serial::Serializable;

use super::connection::Connection;

/// A message carried over the net. Additionally to serializing its data, it
/// provides a remote procedure call: after decoding, `execute` runs with the
/// connection the message arrived on.
pub trait Message: Serializable {
    fn execute(self: Box<Self>, connection: &Connection);
}
