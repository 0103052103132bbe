//! Duration parsing for CLI pacing and backoff flags.

use std::time::Duration;

use anyhow::{bail, Result};

/// Parse a human duration flag such as `"30s"`, `"250ms"`, or `"1.5m"`.
///
/// The number may be fractional. The unit suffix is mandatory so a bare
/// `"30"` cannot silently mean the wrong magnitude.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);

    let nanos_per_unit: f64 = match suffix {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60.0 * 1e9,
        _ => bail!("unrecognized duration '{s}' (use ns, us, ms, s, or m)"),
    };
    let Ok(value) = number.parse::<f64>() else {
        bail!("unrecognized duration '{s}' (use ns, us, ms, s, or m)");
    };

    Ok(Duration::from_nanos((value * nanos_per_unit) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_milliseconds() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_fractional_minutes() {
        assert_eq!(parse_duration("1.5m").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_duration(" 2s ").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_rejects_bare_numbers_and_junk() {
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("5h").is_err());
    }
}
