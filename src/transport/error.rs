use std::{io, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no response to {command} within {timeout:?}")]
    Timeout {
        command: &'static str,
        timeout: Duration,
    },
    #[error("channel closed by peer")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Timeouts are routine while the base waits on its GNSS or modem.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}
