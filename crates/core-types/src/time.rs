use chrono::NaiveDateTime;

/// The wire format for every schedule timestamp in the system, both at the
/// caller boundary and in the store. Lexical order of formatted values
/// matches chronological order.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a caller-supplied timestamp in the canonical format.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
}

/// Renders a timestamp in the canonical format.
pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}
