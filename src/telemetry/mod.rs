mod error;
mod parsing;
mod types;

pub use error::FrameError;
pub use parsing::{
    parse_beacon_response, parse_queue_depth, parse_station_response, strip_terminator,
};
pub use types::{BeaconFrame, BeaconResponse, StationFix};
