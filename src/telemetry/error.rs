use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("device reported an error: {0}")]
    DeviceError(String),
    #[error("empty response")]
    Empty,
    #[error("response too short ({0} bytes)")]
    TooShort(usize),
    #[error("expected at least {expected} fields, got {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("malformed timestamp {0:?}")]
    Timestamp(String),
    #[error("field {field} has invalid value {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("invalid queue depth {0:?}")]
    QueueDepth(String),
}

impl FrameError {
    /// True when the device answered `ERROR...` rather than sending garbage.
    pub fn is_device_error(&self) -> bool {
        matches!(self, FrameError::DeviceError(_))
    }
}
