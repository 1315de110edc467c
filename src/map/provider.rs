//! Map image service: fetches a rendered static map, falling back to a
//! placeholder image on any failure.

use std::path::Path;
use std::time::Duration;

use super::error::MapError;
use super::request::MapRequest;

/// Some map services reject requests without a browser-like User-Agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

pub trait MapImageService: Send {
    /// Fetches the image at `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MapError>;
}

/// Blocking HTTP map service backed by reqwest.
pub struct ReqwestMapService {
    client: reqwest::blocking::Client,
}

impl ReqwestMapService {
    pub fn with_timeout(timeout: Duration) -> Result<Self, MapError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MapError::Fetch(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl MapImageService for ReqwestMapService {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MapError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| MapError::Fetch(format!("request failed: {}", e.without_url())))?;

        // The URL carries the API key, so only the status is reported.
        if !response.status().is_success() {
            return Err(MapError::Fetch(format!("HTTP {}", response.status())));
        }

        let body = response
            .bytes()
            .map_err(|e| MapError::Fetch(format!("failed to read response: {}", e.without_url())))?;
        if body.is_empty() {
            return Err(MapError::Fetch("empty response".to_string()));
        }
        Ok(body.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMap {
    pub image: Vec<u8>,
    pub placeholder: bool,
}

pub struct MapRenderer<S: MapImageService> {
    service: S,
    placeholder: Vec<u8>,
}

impl<S: MapImageService> MapRenderer<S> {
    pub fn new(service: S, placeholder: Vec<u8>) -> Self {
        Self {
            service,
            placeholder,
        }
    }

    /// Loads the placeholder image from disk; no file means an empty placeholder.
    pub fn with_placeholder_file(service: S, path: Option<&Path>) -> Result<Self, MapError> {
        let placeholder = match path {
            Some(path) => std::fs::read(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(service, placeholder))
    }

    pub fn placeholder(&self) -> RenderedMap {
        RenderedMap {
            image: self.placeholder.clone(),
            placeholder: true,
        }
    }

    /// Never fails: a fetch error yields the placeholder.
    pub fn render(&self, request: &MapRequest) -> RenderedMap {
        match self.service.fetch(&request.url) {
            Ok(image) => RenderedMap {
                image,
                placeholder: false,
            },
            Err(e) => {
                log::warn!("Map render failed, showing placeholder: {}", e);
                self.placeholder()
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Replays canned results and records requested URLs.
    #[derive(Clone, Default)]
    pub struct MockMapService {
        pub requests: Arc<Mutex<Vec<String>>>,
        pub fail: bool,
    }

    impl MapImageService for MockMapService {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, MapError> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.fail {
                Err(MapError::Fetch("HTTP 403 Forbidden".to_string()))
            } else {
                Ok(b"\x89PNG map".to_vec())
            }
        }
    }

    fn request() -> MapRequest {
        MapRequest {
            url: "https://example.test/staticmap?zoom=3".to_string(),
            waypoints_used: 0,
            waypoints_dropped: 0,
        }
    }

    #[test]
    fn test_successful_render() {
        let service = MockMapService::default();
        let renderer = MapRenderer::new(service.clone(), b"blank".to_vec());
        let rendered = renderer.render(&request());
        assert!(!rendered.placeholder);
        assert_eq!(rendered.image, b"\x89PNG map".to_vec());
        assert_eq!(service.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_render_falls_back_to_placeholder() {
        let service = MockMapService {
            fail: true,
            ..Default::default()
        };
        let renderer = MapRenderer::new(service, b"blank".to_vec());
        let rendered = renderer.render(&request());
        assert!(rendered.placeholder);
        assert_eq!(rendered.image, b"blank".to_vec());
    }

    #[test]
    fn test_missing_placeholder_file_is_an_error() {
        let result = MapRenderer::with_placeholder_file(
            MockMapService::default(),
            Some(Path::new("/nonexistent/map_image_blank.png")),
        );
        assert!(matches!(result, Err(MapError::Placeholder(_))));
    }

    #[test]
    fn test_no_placeholder_file_gives_empty_image() {
        let renderer = MapRenderer::with_placeholder_file(MockMapService::default(), None).unwrap();
        assert!(renderer.placeholder().image.is_empty());
    }
}
