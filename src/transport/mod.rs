mod channel;
mod error;
mod session;

pub use channel::{ByteChannel, TcpChannel};
pub use error::TransportError;
pub use session::{BaseCommand, Session};

#[cfg(test)]
pub use channel::tests::ScriptedChannel;
