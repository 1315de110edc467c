mod error;
mod frame_log;
mod poller;
mod state;
mod worker;

pub use error::PollError;
pub use frame_log::CsvFrameLog;
pub use poller::Poller;
pub use state::{CourseReadout, MapStatus, PathSnapshot, PollSettings, TelemetrySnapshot};
pub use worker::{spawn, PollerCommand, PollerHandle};
