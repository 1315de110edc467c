use thiserror::Error;

use crate::telemetry::FrameError;
use crate::transport::TransportError;

/// Failure of one step of a poll cycle. Never fatal to the poller.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("frame: {0}")]
    Frame(#[from] FrameError),
    #[error("poller is not running")]
    Stopped,
}

impl PollError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Transport(e) if e.is_timeout())
    }

    pub fn is_device_error(&self) -> bool {
        matches!(self, PollError::Frame(e) if e.is_device_error())
    }
}
