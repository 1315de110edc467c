use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::geodesy::{Coordinate, Course};
use crate::map::{ImagePoint, MapView};
use crate::telemetry::{BeaconFrame, StationFix};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub default_interval: Duration,
    pub first_poll_delay: Duration,
    /// Must exceed the base's own GNSS fix timeout.
    pub gnss_timeout: Duration,
    /// Must exceed the base's satellite session timeout.
    pub beacon_timeout: Duration,
    /// Pixel radius the base to beacon separation should fit in.
    pub pixel_radius: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(120),
            first_poll_delay: Duration::from_secs(1),
            gnss_timeout: Duration::from_secs(35),
            beacon_timeout: Duration::from_secs(65),
            pixel_radius: 200,
        }
    }
}

/// Poll schedule. Only the poller mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub last_poll_at: Instant,
    pub next_poll_at: Instant,
    pub current_interval: Duration,
    pub default_interval: Duration,
}

impl PollState {
    pub fn new(now: Instant, default_interval: Duration, first_poll_delay: Duration) -> Self {
        Self {
            last_poll_at: now,
            next_poll_at: now + first_poll_delay,
            current_interval: default_interval,
            default_interval,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_poll_at
    }

    /// Marks the start of a cycle at the scheduled time, not at `now`, so a
    /// late tick does not shift the schedule.
    pub fn begin_cycle(&mut self) {
        self.last_poll_at = self.next_poll_at;
        self.next_poll_at = self.next_poll_at + self.current_interval;
    }

    /// Halves the interval while messages are queued, restores it otherwise.
    pub fn apply_backlog(&mut self, queue_depth: u32) {
        self.current_interval = if queue_depth > 0 {
            self.default_interval / 2
        } else {
            self.default_interval
        };
        self.next_poll_at = self.last_poll_at + self.current_interval;
    }

    pub fn since_last_poll(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_poll_at)
    }

    pub fn until_next_poll(&self, now: Instant) -> Duration {
        self.next_poll_at.saturating_duration_since(now)
    }
}

/// Course from the base to the beacon with the whole-number readouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct CourseReadout {
    pub course: Course,
    pub distance_m_whole: i64,
    pub bearing_deg_whole: i64,
}

impl From<Course> for CourseReadout {
    fn from(course: Course) -> Self {
        Self {
            course,
            distance_m_whole: course.distance_m_whole(),
            bearing_deg_whole: course.bearing_deg_whole(),
        }
    }
}

/// Map state as published; carries no API key.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MapStatus {
    pub view: MapView,
    pub waypoints_used: usize,
    pub waypoints_dropped: usize,
    /// Interactive map link for the beacon position.
    pub search_url: Option<String>,
    /// Where the beacon marker sits on the current image.
    pub beacon_pixel: Option<ImagePoint>,
    pub station_pixel: Option<ImagePoint>,
}

/// Everything a display needs, copied out of the poller.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TelemetrySnapshot {
    pub station: Option<StationFix>,
    pub beacon: Option<BeaconFrame>,
    /// Last reported message backlog, from a frame or a bare depth.
    pub queue_depth: Option<u32>,
    pub course: Option<CourseReadout>,
    pub path_len: usize,
    pub polls: u64,
    /// Wall-clock start of the latest poll cycle.
    pub last_poll_utc: Option<DateTime<Utc>>,
    pub interval_s: f64,
    pub default_interval_s: f64,
    pub seconds_since_poll: u64,
    pub seconds_until_poll: u64,
    pub last_station_response: Option<String>,
    pub last_beacon_response: Option<String>,
    pub last_error: Option<String>,
    pub map: MapStatus,
}

/// Authoritative beacon track, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PathSnapshot {
    pub points: Vec<Coordinate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_secs(120);

    #[test]
    fn test_first_poll_after_delay() {
        let start = Instant::now();
        let state = PollState::new(start, DEFAULT, Duration::from_secs(1));
        assert!(!state.is_due(start));
        assert!(state.is_due(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_begin_cycle_uses_scheduled_time() {
        let start = Instant::now();
        let mut state = PollState::new(start, DEFAULT, Duration::from_secs(1));
        state.begin_cycle();
        assert_eq!(state.last_poll_at, start + Duration::from_secs(1));
        assert_eq!(state.next_poll_at, start + Duration::from_secs(121));
    }

    #[test]
    fn test_backlog_halves_then_restores() {
        let start = Instant::now();
        let mut state = PollState::new(start, DEFAULT, Duration::ZERO);
        state.begin_cycle();

        state.apply_backlog(3);
        assert_eq!(state.current_interval, Duration::from_secs(60));
        assert_eq!(state.next_poll_at, state.last_poll_at + Duration::from_secs(60));

        state.apply_backlog(0);
        assert_eq!(state.current_interval, DEFAULT);
        assert_eq!(state.next_poll_at, state.last_poll_at + DEFAULT);
    }

    #[test]
    fn test_elapsed_readouts_saturate() {
        let start = Instant::now();
        let state = PollState::new(start, DEFAULT, Duration::from_secs(5));
        assert_eq!(state.since_last_poll(start + Duration::from_secs(2)).as_secs(), 2);
        assert_eq!(state.until_next_poll(start + Duration::from_secs(9)), Duration::ZERO);
    }
}
