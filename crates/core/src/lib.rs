#![forbid(unsafe_code)]

pub mod model;
pub mod progression;
pub mod time;
pub mod timer;

pub use time::Clock;
