use std::time::Instant;

use chrono::{DateTime, Utc};

use super::error::PollError;
use super::frame_log::FrameLog;
use super::state::{CourseReadout, MapStatus, PollSettings, PollState, TelemetrySnapshot};
use crate::geodesy::{distance_and_bearing, Coordinate, Course};
use crate::map::{
    search_url, select_zoom, ImagePoint, MapError, MapRequest, MapView, StaticMapBuilder,
};
use crate::telemetry::{
    parse_beacon_response, parse_queue_depth, parse_station_response, strip_terminator,
    BeaconFrame, BeaconResponse, StationFix,
};
use crate::transport::{BaseCommand, ByteChannel, Session};

/// Result of one request within a poll cycle.
#[derive(Debug)]
pub enum StepOutcome {
    Updated,
    QueueDepth(u32),
    Failed(PollError),
}

#[derive(Debug)]
pub struct CycleReport {
    pub station: StepOutcome,
    pub beacon: StepOutcome,
}

/// Owns the telemetry state and is its only writer.
pub struct Poller<C: ByteChannel, L: FrameLog> {
    session: Session<C>,
    frame_log: L,
    settings: PollSettings,
    builder: StaticMapBuilder,
    state: PollState,
    station: Option<StationFix>,
    beacon: Option<BeaconFrame>,
    queue_depth: Option<u32>,
    path: Vec<Coordinate>,
    course: Option<Course>,
    view: MapView,
    request: Option<MapRequest>,
    polls: u64,
    last_poll_utc: Option<DateTime<Utc>>,
    last_station_response: Option<String>,
    last_beacon_response: Option<String>,
    last_error: Option<String>,
}

impl<C: ByteChannel, L: FrameLog> Poller<C, L> {
    pub fn new(
        session: Session<C>,
        frame_log: L,
        settings: PollSettings,
        builder: StaticMapBuilder,
        now: Instant,
    ) -> Self {
        let state = PollState::new(now, settings.default_interval, settings.first_poll_delay);
        let view = MapView::new(builder.params().size);
        Self {
            session,
            frame_log,
            settings,
            builder,
            state,
            station: None,
            beacon: None,
            queue_depth: None,
            path: Vec::new(),
            course: None,
            view,
            request: None,
            polls: 0,
            last_poll_utc: None,
            last_station_response: None,
            last_beacon_response: None,
            last_error: None,
        }
    }

    /// Runs a poll cycle if one is due at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<CycleReport> {
        if !self.state.is_due(now) {
            return None;
        }
        Some(self.poll_cycle())
    }

    fn poll_cycle(&mut self) -> CycleReport {
        self.state.begin_cycle();
        self.polls += 1;
        self.last_poll_utc = Some(Utc::now());
        log::info!("Poll {} starting", self.polls);

        let station = self.poll_station();
        let beacon = self.poll_beacon();
        self.update_course();
        self.rebuild_map();

        CycleReport { station, beacon }
    }

    fn poll_station(&mut self) -> StepOutcome {
        let raw = match self
            .session
            .request_response(BaseCommand::StationFix, self.settings.gnss_timeout)
        {
            Ok(raw) => raw,
            Err(e) => return self.fail("station", e.into()),
        };
        log::debug!("Station response: {:?}", raw);
        self.last_station_response = Some(strip_terminator(&raw).to_string());

        match parse_station_response(&raw) {
            Ok(fix) => {
                log::info!(
                    "Station fix at {}: {} alt {} m",
                    fix.timestamp,
                    fix.position,
                    fix.altitude_m
                );
                self.station = Some(fix);
                StepOutcome::Updated
            }
            Err(e) => self.fail("station", e.into()),
        }
    }

    fn poll_beacon(&mut self) -> StepOutcome {
        let raw = match self
            .session
            .request_response(BaseCommand::BeaconData, self.settings.beacon_timeout)
        {
            Ok(raw) => raw,
            Err(e) => return self.fail("beacon", e.into()),
        };
        log::debug!("Beacon response: {:?}", raw);
        self.last_beacon_response = Some(strip_terminator(&raw).to_string());

        match parse_beacon_response(&raw) {
            Ok(BeaconResponse::Frame(frame)) => {
                log::info!(
                    "Beacon {} frame at {}: {} alt {} m, {} queued",
                    frame.device_serial,
                    frame.timestamp,
                    frame.position,
                    frame.altitude_m,
                    frame.mt_queue_depth
                );
                self.view.center = frame.position;
                self.path.push(frame.position);
                if let Err(e) = self.frame_log.record(&frame, &raw) {
                    log::error!("Failed to write beacon frame log: {}", e);
                }
                let depth = frame.mt_queue_depth;
                self.beacon = Some(frame);
                self.set_queue_depth(depth);
                StepOutcome::Updated
            }
            Ok(BeaconResponse::QueueDepth(depth)) => {
                self.set_queue_depth(depth);
                StepOutcome::QueueDepth(depth)
            }
            Err(e) => self.fail("beacon", e.into()),
        }
    }

    fn fail(&mut self, step: &str, err: PollError) -> StepOutcome {
        if err.is_timeout() {
            log::info!("{} poll got no answer: {}", step, err);
        } else if err.is_device_error() {
            log::warn!("Base rejected {} poll: {}", step, err);
        } else {
            log::warn!("{} poll failed: {}", step, err);
        }
        self.last_error = Some(format!("{}: {}", step, err));
        StepOutcome::Failed(err)
    }

    fn set_queue_depth(&mut self, depth: u32) {
        self.queue_depth = Some(depth);
        self.state.apply_backlog(depth);
        if depth > 0 {
            log::info!(
                "{} messages queued, polling every {:?}",
                depth,
                self.state.current_interval
            );
        }
    }

    fn update_course(&mut self) {
        let (Some(station), Some(beacon)) = (&self.station, &self.beacon) else {
            return;
        };
        let course = distance_and_bearing(&station.position, &beacon.position);
        self.view.zoom = select_zoom(
            course.separation_deg,
            self.view.center.latitude_deg,
            self.settings.pixel_radius,
        );
        log::debug!(
            "Beacon {} m at {:.1} deg from base, zoom {}",
            course.distance_m_whole(),
            course.bearing_deg,
            self.view.zoom
        );
        self.course = Some(course);
    }

    fn rebuild_map(&mut self) {
        let request = self.builder.build(
            &self.view.center,
            self.beacon.as_ref().map(|b| &b.position),
            self.station.as_ref().map(|s| &s.position),
            &self.path,
            self.view.zoom,
        );
        self.request = Some(request);
    }

    /// Asks the base to discard the beacon's queued messages.
    ///
    /// Only the queue depth and the poll interval change.
    pub fn flush_queue(&mut self) -> Result<u32, PollError> {
        let result = self
            .session
            .request_response(BaseCommand::FlushQueue, self.settings.beacon_timeout)
            .map_err(PollError::from)
            .and_then(|raw| parse_queue_depth(&raw).map_err(PollError::from));

        match result {
            Ok(depth) => {
                log::info!("Queue flushed, {} messages remain", depth);
                self.set_queue_depth(depth);
                Ok(depth)
            }
            Err(e) => {
                log::warn!("Queue flush failed: {}", e);
                self.last_error = Some(format!("flush: {}", e));
                Err(e)
            }
        }
    }

    /// Returns true when the zoom changed and the map was rebuilt.
    pub fn zoom_in(&mut self) -> bool {
        let changed = self.view.zoom_in();
        if changed {
            self.rebuild_map();
        }
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.view.zoom_out();
        if changed {
            self.rebuild_map();
        }
        changed
    }

    /// Re-centres on image pixel `(x, y)` and rebuilds the map.
    pub fn recenter(&mut self, x: i64, y: i64) -> Result<Coordinate, MapError> {
        let center = self.view.recenter(x, y)?;
        self.rebuild_map();
        Ok(center)
    }

    /// Coordinate under image pixel `(x, y)`.
    #[cfg(test)]
    pub fn locate(&self, x: i64, y: i64) -> Result<Coordinate, MapError> {
        self.view.coordinate_at(x, y)
    }

    /// Clicks are accepted only while a real map image is showing.
    pub fn set_render_ok(&mut self, ok: bool) {
        self.view.clicks_enabled = ok;
    }

    pub fn map_request(&self) -> Option<&MapRequest> {
        self.request.as_ref()
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    #[cfg(test)]
    pub fn station(&self) -> Option<&StationFix> {
        self.station.as_ref()
    }

    #[cfg(test)]
    pub fn beacon(&self) -> Option<&BeaconFrame> {
        self.beacon.as_ref()
    }

    #[cfg(test)]
    pub fn state(&self) -> &PollState {
        &self.state
    }

    #[cfg(test)]
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// None before a position is known or while the view has no zoom.
    fn marker_pixel(&self, position: Option<&Coordinate>) -> Option<ImagePoint> {
        self.view.pixel_of(position?).ok()
    }

    pub fn snapshot(&self, now: Instant) -> TelemetrySnapshot {
        let (waypoints_used, waypoints_dropped) = self
            .request
            .as_ref()
            .map(|r| (r.waypoints_used, r.waypoints_dropped))
            .unwrap_or((0, 0));

        TelemetrySnapshot {
            station: self.station.clone(),
            beacon: self.beacon.clone(),
            queue_depth: self.queue_depth,
            course: self.course.map(CourseReadout::from),
            path_len: self.path.len(),
            polls: self.polls,
            last_poll_utc: self.last_poll_utc,
            interval_s: self.state.current_interval.as_secs_f64(),
            default_interval_s: self.state.default_interval.as_secs_f64(),
            seconds_since_poll: self.state.since_last_poll(now).as_secs(),
            seconds_until_poll: self.state.until_next_poll(now).as_secs(),
            last_station_response: self.last_station_response.clone(),
            last_beacon_response: self.last_beacon_response.clone(),
            last_error: self.last_error.clone(),
            map: MapStatus {
                view: self.view,
                waypoints_used,
                waypoints_dropped,
                search_url: self.beacon.as_ref().map(|b| search_url(&b.position)),
                beacon_pixel: self.marker_pixel(self.beacon.as_ref().map(|b| &b.position)),
                station_pixel: self.marker_pixel(self.station.as_ref().map(|s| &s.position)),
            },
        }
    }
}
