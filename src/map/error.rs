use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("zoom level {0} has no pixel scale (must be between 1 and 21)")]
    InvalidZoom(u8),
    #[error("map interaction disabled until a map has rendered")]
    ClicksDisabled,
    #[error("map image fetch failed: {0}")]
    Fetch(String),
    #[error("placeholder image unreadable: {0}")]
    Placeholder(#[from] std::io::Error),
}
