use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single catalog entry as stored in the `flight` table.
///
/// Invariants upheld by the data layer: `depart_time < arrive_time`,
/// `price > 0` and `0 <= remain_seats <= total_seats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub flight_id: String,
    pub departure: String,
    pub destination: String,
    pub depart_time: NaiveDateTime,
    pub arrive_time: NaiveDateTime,
    pub price: Decimal,
    pub total_seats: i64,
    pub remain_seats: i64,
}

/// Caller input for a new catalog entry.
///
/// The schedule timestamps arrive as text (see [`crate::time::DATETIME_FORMAT`])
/// and are validated and parsed by the repository before anything is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlight {
    pub flight_id: String,
    pub departure: String,
    pub destination: String,
    pub depart_time: String,
    pub arrive_time: String,
    pub price: Decimal,
    pub total_seats: i64,
    pub remain_seats: i64,
}

/// The identity recorded by a successful login.
///
/// Returned by the auth services so callers can thread it through subsequent
/// calls instead of relying on the process-wide session state alone.
/// `email` is populated for end users and `None` for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}
