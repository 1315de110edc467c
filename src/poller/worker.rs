//! Dedicated poller thread.
//!
//! The thread owns the [`Poller`] and is the only writer of telemetry state.
//! Everyone else reads the published copy or sends a [`PollerCommand`].

use std::{
    io,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use super::error::PollError;
use super::frame_log::FrameLog;
use super::poller::{Poller, StepOutcome};
use super::state::TelemetrySnapshot;
use crate::geodesy::Coordinate;
use crate::map::{MapError, MapImageService, MapRenderer, RenderedMap};
use crate::transport::ByteChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCommand {
    Flush,
    ZoomIn,
    ZoomOut,
    Recenter { x: i64, y: i64 },
    Stop,
}

struct Shared {
    snapshot: TelemetrySnapshot,
    path: Vec<Coordinate>,
    image: RenderedMap,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable access to a running poller.
#[derive(Clone)]
pub struct PollerHandle {
    tx: mpsc::Sender<PollerCommand>,
    shared: Arc<Mutex<Shared>>,
}

impl PollerHandle {
    pub fn send(&self, command: PollerCommand) -> Result<(), PollError> {
        self.tx.send(command).map_err(|_| PollError::Stopped)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        lock(&self.shared).snapshot.clone()
    }

    pub fn path(&self) -> Vec<Coordinate> {
        lock(&self.shared).path.clone()
    }

    pub fn image(&self) -> RenderedMap {
        lock(&self.shared).image.clone()
    }

    /// Coordinate under image pixel `(x, y)` of the last published map.
    pub fn locate(&self, x: i64, y: i64) -> Result<Coordinate, MapError> {
        lock(&self.shared).snapshot.map.view.coordinate_at(x, y)
    }
}

struct Worker<C: ByteChannel, L: FrameLog, S: MapImageService> {
    poller: Poller<C, L>,
    renderer: MapRenderer<S>,
    shared: Arc<Mutex<Shared>>,
    rx: mpsc::Receiver<PollerCommand>,
    tick: Duration,
}

/// Starts the poller thread. It runs until [`PollerCommand::Stop`] or until
/// every handle is dropped.
pub fn spawn<C, L, S>(
    poller: Poller<C, L>,
    renderer: MapRenderer<S>,
    tick: Duration,
) -> io::Result<(PollerHandle, JoinHandle<()>)>
where
    C: ByteChannel + 'static,
    L: FrameLog + 'static,
    S: MapImageService + 'static,
{
    let (tx, rx) = mpsc::channel();
    let shared = Arc::new(Mutex::new(Shared {
        snapshot: poller.snapshot(Instant::now()),
        path: poller.path().to_vec(),
        image: renderer.placeholder(),
    }));

    let worker = Worker {
        poller,
        renderer,
        shared: shared.clone(),
        rx,
        tick,
    };
    let join = thread::Builder::new()
        .name("poller".to_string())
        .spawn(move || worker.run())?;

    Ok((PollerHandle { tx, shared }, join))
}

impl<C: ByteChannel, L: FrameLog, S: MapImageService> Worker<C, L, S> {
    fn run(mut self) {
        log::info!("Poller started, tick {:?}", self.tick);
        loop {
            match self.rx.recv_timeout(self.tick) {
                Ok(PollerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle(command),
                Err(RecvTimeoutError::Timeout) => {}
            }

            // A cycle that became due during a render runs here, never skipped.
            if let Some(report) = self.poller.tick(Instant::now()) {
                match (&report.station, &report.beacon) {
                    (StepOutcome::Failed(station), StepOutcome::Failed(beacon)) => {
                        log::warn!(
                            "Base gave no usable answer this cycle ({}; {})",
                            station,
                            beacon
                        );
                    }
                    (_, StepOutcome::QueueDepth(depth)) => {
                        log::debug!("No new frame, {} messages queued", depth);
                    }
                    _ => {}
                }
                self.render();
                lock(&self.shared).path = self.poller.path().to_vec();
            }
            self.publish();
        }
        log::info!("Poller stopped");
    }

    fn handle(&mut self, command: PollerCommand) {
        log::debug!("Poller command {:?}", command);
        let rebuilt = match command {
            PollerCommand::Flush => {
                // Failures are logged and recorded by the poller.
                let _ = self.poller.flush_queue();
                false
            }
            PollerCommand::ZoomIn => self.poller.zoom_in(),
            PollerCommand::ZoomOut => self.poller.zoom_out(),
            PollerCommand::Recenter { x, y } => match self.poller.recenter(x, y) {
                Ok(center) => {
                    log::info!("Map re-centred on {}", center);
                    true
                }
                Err(e) => {
                    log::warn!("Ignoring click at ({}, {}): {}", x, y, e);
                    false
                }
            },
            PollerCommand::Stop => false,
        };
        if rebuilt {
            self.render();
        }
    }

    fn render(&mut self) {
        let Some(request) = self.poller.map_request() else {
            return;
        };
        let rendered = self.renderer.render(request);
        self.poller.set_render_ok(!rendered.placeholder);
        lock(&self.shared).image = rendered;
    }

    fn publish(&self) {
        let snapshot = self.poller.snapshot(Instant::now());
        lock(&self.shared).snapshot = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MockMapService, StaticMapBuilder};
    use crate::poller::frame_log::tests::MemoryFrameLog;
    use crate::poller::poller::tests::{params, FRAME_BACKLOG, STATION};
    use crate::poller::PollSettings;
    use crate::transport::{ScriptedChannel, Session};

    const TICK: Duration = Duration::from_millis(5);

    fn start(channel: &ScriptedChannel, service: MockMapService) -> (PollerHandle, JoinHandle<()>) {
        let settings = PollSettings {
            first_poll_delay: Duration::ZERO,
            ..PollSettings::default()
        };
        let poller = Poller::new(
            Session::new(channel.clone()),
            MemoryFrameLog::default(),
            settings,
            StaticMapBuilder::new(params()),
            Instant::now(),
        );
        let renderer = MapRenderer::new(service, b"blank".to_vec());
        spawn(poller, renderer, TICK).unwrap()
    }

    fn wait_for(handle: &PollerHandle, what: &str, done: impl Fn(&TelemetrySnapshot) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done(&handle.snapshot()) {
                return;
            }
            thread::sleep(TICK);
        }
        panic!("timed out waiting for {}", what);
    }

    #[test]
    fn test_worker_polls_renders_and_publishes() {
        let channel = ScriptedChannel::new();
        channel.push(STATION);
        channel.push(FRAME_BACKLOG);
        let service = MockMapService::default();
        let (handle, join) = start(&channel, service.clone());

        wait_for(&handle, "first poll", |s| s.polls == 1 && s.map.view.clicks_enabled);
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.queue_depth, Some(3));
        assert_eq!(handle.path().len(), 1);
        let image = handle.image();
        assert!(!image.placeholder, "mock service returns a real image");
        assert_eq!(service.requests.lock().unwrap().len(), 1);

        let zoom = snapshot.map.view.zoom;
        handle.send(PollerCommand::ZoomIn).unwrap();
        wait_for(&handle, "zoom in", |s| s.map.view.zoom == zoom + 1);
        assert_eq!(service.requests.lock().unwrap().len(), 2, "zoom re-renders");

        let here = handle.locate(320, 240).unwrap();
        assert_eq!(here, snapshot.map.view.center);

        handle.send(PollerCommand::Stop).unwrap();
        join.join().unwrap();
        assert!(matches!(
            handle.send(PollerCommand::Flush),
            Err(PollError::Stopped)
        ));
    }

    #[test]
    fn test_failed_render_disables_clicks() {
        let channel = ScriptedChannel::new();
        channel.push(STATION);
        channel.push(FRAME_BACKLOG);
        let service = MockMapService {
            fail: true,
            ..Default::default()
        };
        let (handle, join) = start(&channel, service);

        wait_for(&handle, "first poll", |s| s.polls == 1);
        assert!(handle.image().placeholder);
        assert_eq!(handle.image().image, b"blank".to_vec());
        assert!(matches!(handle.locate(320, 240), Err(MapError::ClicksDisabled)));

        drop(handle);
        join.join().unwrap();
    }

    #[test]
    fn test_flush_command_reaches_base() {
        let channel = ScriptedChannel::new();
        channel.push(STATION);
        channel.push(FRAME_BACKLOG);
        let (handle, join) = start(&channel, MockMapService::default());
        wait_for(&handle, "first poll", |s| s.polls == 1);

        channel.push("0\r\n");
        handle.send(PollerCommand::Flush).unwrap();
        wait_for(&handle, "flush", |s| s.queue_depth == Some(0));
        assert_eq!(channel.written_commands(), vec!["1\r", "3\r", "4\r"]);

        handle.send(PollerCommand::Stop).unwrap();
        join.join().unwrap();
    }
}
