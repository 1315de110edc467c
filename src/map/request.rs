//! Static map request assembly under a hard URL length budget.

use super::view::ImageSize;
use crate::geodesy::Coordinate;

pub const DEFAULT_MAX_URL_LENGTH: usize = 8192;

const BEACON_MARKER: &str = "&markers=color:red|";
const BASE_MARKER: &str = "&markers=color:blue|";
const PATH_STYLE: &str = "&path=color:red|weight:5";
const SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&map_action=map&query=";

#[derive(Debug, Clone)]
pub struct StaticMapParams {
    pub base_url: String,
    pub api_key: String,
    pub size: ImageSize,
    pub maptype: String,
    pub format: String,
    pub max_url_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRequest {
    pub url: String,
    pub waypoints_used: usize,
    /// Oldest waypoints left out to stay within the length budget.
    pub waypoints_dropped: usize,
}

impl MapRequest {
    pub fn fits(&self, max_url_length: usize) -> bool {
        self.url.len() <= max_url_length
    }
}

pub struct StaticMapBuilder {
    params: StaticMapParams,
}

impl StaticMapBuilder {
    pub fn new(params: StaticMapParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StaticMapParams {
        &self.params
    }

    /// Builds the request, leaving out the oldest waypoints of `path` until the
    /// URL fits `max_url_length`. `path` itself is never modified.
    ///
    /// If the URL is still too long with no path at all, it is returned as is.
    pub fn build(
        &self,
        center: &Coordinate,
        beacon: Option<&Coordinate>,
        base: Option<&Coordinate>,
        path: &[Coordinate],
        zoom: u8,
    ) -> MapRequest {
        let p = &self.params;

        let mut head = format!("{}?center={}", p.base_url, center);
        if let Some(beacon) = beacon {
            head.push_str(BEACON_MARKER);
            head.push_str(&beacon.to_string());
        }
        if let Some(base) = base {
            head.push_str(BASE_MARKER);
            head.push_str(&base.to_string());
        }

        let tail = format!(
            "&zoom={}&size={}x{}&maptype={}&format={}&key={}",
            zoom, p.size.width, p.size.height, p.maptype, p.format, p.api_key
        );

        let segments: Vec<String> = path.iter().map(|c| format!("|{}", c)).collect();
        let fixed = head.len() + tail.len();
        let mut path_len = PATH_STYLE.len() + segments.iter().map(String::len).sum::<usize>();
        let mut skip = 0;
        while skip < segments.len() && fixed + path_len > p.max_url_length {
            path_len -= segments[skip].len();
            skip += 1;
        }

        let kept = &segments[skip..];
        let mut url = String::with_capacity(fixed + if kept.is_empty() { 0 } else { path_len });
        url.push_str(&head);
        if !kept.is_empty() {
            url.push_str(PATH_STYLE);
            for segment in kept {
                url.push_str(segment);
            }
        }
        url.push_str(&tail);

        if skip > 0 {
            log::debug!(
                "Map request over {} bytes, dropped {} oldest waypoints",
                p.max_url_length,
                skip
            );
        }

        let request = MapRequest {
            url,
            waypoints_used: kept.len(),
            waypoints_dropped: skip,
        };
        if !request.fits(p.max_url_length) {
            log::warn!(
                "Map request is {} bytes without any path, over the {} byte limit",
                request.url.len(),
                p.max_url_length
            );
        }
        request
    }
}

/// Link that opens the coordinate in an interactive map.
pub fn search_url(coordinate: &Coordinate) -> String {
    format!("{}{}", SEARCH_URL, coordinate)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any path converges under budget (whenever the fixed part fits) and
        /// only a prefix of the path is removed.
        #[test]
        fn converges_by_dropping_prefix(
            points in prop::collection::vec((-90.0f64..90.0, -180.0f64..180.0), 0..800),
            budget in 200usize..9000,
        ) {
            let path: Vec<Coordinate> = points.iter().map(|(a, b)| Coordinate::new(*a, *b)).collect();
            let builder = StaticMapBuilder::new(StaticMapParams {
                base_url: "https://example.test/staticmap".to_string(),
                api_key: "k".to_string(),
                size: ImageSize { width: 640, height: 480 },
                maptype: "hybrid".to_string(),
                format: "png".to_string(),
                max_url_length: budget,
            });
            let center = Coordinate::new(0.0, 0.0);
            let request = builder.build(&center, Some(&center), Some(&center), &path, 5);
            prop_assert!(request.fits(budget));
            prop_assert_eq!(request.waypoints_used + request.waypoints_dropped, path.len());
        }
    }
}
