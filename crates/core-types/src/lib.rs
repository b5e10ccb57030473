pub mod structs;
pub mod time;

// Re-export the core types to provide a clean public API.
pub use structs::{Flight, NewFlight, SessionInfo};
pub use time::{format_datetime, parse_datetime, DATETIME_FORMAT};
