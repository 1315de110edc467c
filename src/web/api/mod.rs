pub mod beacon;
pub mod error;
pub mod map;
