mod error;
mod provider;
mod request;
mod view;
pub mod zoom;

pub use error::MapError;
pub use provider::{MapImageService, MapRenderer, ReqwestMapService, RenderedMap};
pub use request::{search_url, MapRequest, StaticMapBuilder, StaticMapParams, DEFAULT_MAX_URL_LENGTH};
pub use view::{ImagePoint, ImageSize, MapView};
pub use zoom::select_zoom;

#[cfg(test)]
pub use provider::tests::MockMapService;
