//! Feed parsing for the ordered source table of readings.
//!
//! The feed is a CSV file with a header row and the columns
//! `[timestamp, smoker, food-A, food-B]`. An empty value field means that
//! channel has no reading for the row; the row is simply skipped for that
//! channel.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use pitwatch_types::{Channel, Moment};

/// One feed row: a moment plus the readings present for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    /// Timestamp shared by every reading in the row.
    pub at: Moment,
    /// The channels that reported a value, in feed-column order.
    pub readings: Vec<(Channel, f64)>,
}

/// Errors reading or parsing the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed file could not be read.
    #[error("failed to read feed: {0}")]
    Io(#[from] std::io::Error),

    /// A row did not have the expected shape.
    #[error("feed line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Read and parse the whole feed, preserving row order.
///
/// The header row is skipped; blank lines are ignored.
pub fn read_feed(path: &Path) -> Result<Vec<FeedRow>, FeedError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        // Line 1 is the header.
        if index == 0 || line.trim().is_empty() {
            continue;
        }
        rows.push(parse_row(&line, index + 1)?);
    }
    Ok(rows)
}

fn parse_row(line: &str, line_number: usize) -> Result<FeedRow, FeedError> {
    let malformed = |reason: String| FeedError::Malformed { line: line_number, reason };

    let mut fields = line.splitn(4, ',');
    let timestamp = fields
        .next()
        .ok_or_else(|| malformed("missing timestamp".to_string()))?;
    let at = Moment::parse(timestamp.trim()).map_err(|e| malformed(e.to_string()))?;

    let mut readings = Vec::new();
    for channel in Channel::ALL {
        let field = fields
            .next()
            .ok_or_else(|| malformed(format!("missing {} column", channel)))?;
        let field = field.trim();
        if field.is_empty() {
            continue; // absent reading for this channel
        }
        let value: f64 = field
            .parse()
            .map_err(|_| malformed(format!("invalid {} value '{}'", channel, field)))?;
        readings.push((channel, value));
    }

    Ok(FeedRow { at, readings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_feed(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_rows_in_order() {
        let file = write_feed(
            "Time (UTC),Channel1,Channel2,Channel3\n\
             07/04/2024 08:00,248.5,,\n\
             07/04/2024 08:00,247.0,120.0,85.5\n",
        );
        let rows = read_feed(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].readings, vec![(Channel::Smoker, 248.5)]);
        assert_eq!(
            rows[1].readings,
            vec![
                (Channel::Smoker, 247.0),
                (Channel::FoodA, 120.0),
                (Channel::FoodB, 85.5),
            ]
        );
    }

    #[test]
    fn test_empty_fields_are_skipped_not_errors() {
        let file = write_feed("header\n07/04/2024 08:00,,,\n");
        let rows = read_feed(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].readings.is_empty());
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let file = write_feed("header\n\n07/04/2024 08:00,225.0,,\n\n");
        let rows = read_feed(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_bad_value_names_line_and_channel() {
        let file = write_feed("header\n07/04/2024 08:00,225.0,warm,\n");
        let err = read_feed(file.path()).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("line 2"));
        assert!(text.contains("food-A"));
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let file = write_feed("header\nyesterday,225.0,,\n");
        assert!(matches!(
            read_feed(file.path()).unwrap_err(),
            FeedError::Malformed { line: 2, .. }
        ));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let file = write_feed("header\n07/04/2024 08:00,225.0\n");
        assert!(matches!(
            read_feed(file.path()).unwrap_err(),
            FeedError::Malformed { .. }
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_feed(Path::new("/no/such/feed.csv")).unwrap_err();
        assert!(matches!(err, FeedError::Io(_)));
    }
}
