//! The text wire codec.
//!
//! A message body is UTF-8 text of the form `"<timestamp>, <value>"`, with
//! the timestamp in [`WIRE_TIME_FORMAT`](crate::WIRE_TIME_FORMAT) and the
//! value as a base-10 float literal. Encoding a reading and decoding it back
//! yields the original reading exactly.

use thiserror::Error;

use crate::moment::{Moment, MomentError};
use crate::reading::Reading;

/// Separator between the timestamp and value fields.
const SEPARATOR: &str = ", ";

/// Errors decoding a message body.
///
/// All of these are local to one message: a malformed body must never take
/// down a worker, and retrying the same body would fail identically.
#[derive(Debug, Error)]
pub enum WireError {
    /// The body was not valid UTF-8.
    #[error("message body is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// The body had no `", "` separator between timestamp and value.
    #[error("message body '{0}' has no timestamp/value separator")]
    MissingSeparator(String),

    /// The timestamp field failed to parse.
    #[error(transparent)]
    Timestamp(#[from] MomentError),

    /// The value field was not a float literal.
    #[error("invalid value '{0}'")]
    Value(String),
}

/// Encode a reading into its wire representation.
pub fn encode(reading: &Reading) -> String {
    format!("{}{}{}", reading.at, SEPARATOR, reading.value)
}

/// Decode a wire message body back into a reading.
pub fn decode(body: &[u8]) -> Result<Reading, WireError> {
    let text = std::str::from_utf8(body)?;
    let (timestamp, value) = text
        .split_once(SEPARATOR)
        .ok_or_else(|| WireError::MissingSeparator(text.to_string()))?;
    let at = Moment::parse(timestamp)?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| WireError::Value(value.to_string()))?;
    Ok(Reading::new(at, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_matches_wire_format() {
        let reading = Reading::new(Moment::parse("07/04/2024 08:30").unwrap(), 225.5);
        assert_eq!(encode(&reading), "07/04/2024 08:30, 225.5");
    }

    #[test]
    fn test_round_trip_is_exact() {
        for value in [0.0, 84.0, 225.5, 998.25, -3.5] {
            let reading = Reading::new(Moment::parse("01/31/2023 23:59").unwrap(), value);
            let decoded = decode(encode(&reading).as_bytes()).unwrap();
            assert_eq!(decoded, reading);
        }
    }

    #[test]
    fn test_decode_missing_separator() {
        let err = decode(b"07/04/2024 08:30 225.5").unwrap_err();
        assert!(matches!(err, WireError::MissingSeparator(_)));
    }

    #[test]
    fn test_decode_bad_timestamp() {
        let err = decode(b"tomorrow-ish, 225.5").unwrap_err();
        assert!(matches!(err, WireError::Timestamp(_)));
    }

    #[test]
    fn test_decode_bad_value() {
        let err = decode(b"07/04/2024 08:30, warm").unwrap_err();
        assert!(matches!(err, WireError::Value(_)));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode(&[0xff, 0xfe, 0x2c, 0x20, 0x31]).unwrap_err();
        assert!(matches!(err, WireError::Utf8(_)));
    }
}
