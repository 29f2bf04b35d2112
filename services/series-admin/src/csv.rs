//! Minimal `time,value` CSV handling.

use anyhow::{anyhow, bail, Context, Result};
use series_common::{TimeRange, Timestamp};

/// Parse `time,value` rows. A header line and blank lines are skipped; empty
/// values and `NaN` mean missing.
pub fn parse(text: &str) -> Result<Vec<(Timestamp, f32)>> {
    let mut rows = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (number == 0 && line.starts_with("time")) {
            continue;
        }
        let (time, value) = line
            .split_once(',')
            .ok_or_else(|| anyhow!("line {}: expected `time,value`", number + 1))?;
        let time = Timestamp::parse_iso8601(time.trim())
            .with_context(|| format!("line {}", number + 1))?;
        let value = match value.trim() {
            "" => f32::NAN,
            v => v
                .parse::<f32>()
                .with_context(|| format!("line {}: invalid value {v:?}", number + 1))?,
        };
        rows.push((time, value));
    }
    Ok(rows)
}

/// Place parsed rows on a regular grid at `dt_seconds`. Rows must be on the
/// grid and in increasing order; instants without a row are NaN.
pub fn to_series(rows: &[(Timestamp, f32)], dt_seconds: i64) -> Result<(TimeRange, Vec<f32>)> {
    let (Some(&(first, _)), Some(&(last, _))) = (rows.first(), rows.last()) else {
        bail!("no rows");
    };
    for (i, &(t, _)) in rows.iter().enumerate() {
        if t.0.rem_euclid(dt_seconds) != 0 {
            bail!("{t} is not on the {dt_seconds}s grid");
        }
        if i > 0 && t <= rows[i - 1].0 {
            bail!("{t} is not after the previous row");
        }
    }

    let time = TimeRange::from_bounds(first, last.add(dt_seconds), dt_seconds);
    let mut values = vec![f32::NAN; time.count];
    for &(t, value) in rows {
        values[((t.0 - first.0) / dt_seconds) as usize] = value;
    }
    Ok((time, values))
}

/// Format a series as `time,value` lines with a header.
pub fn format(time: &TimeRange, values: &[f32]) -> String {
    let mut out = String::from("time,value\n");
    for (t, value) in time.iter().zip(values) {
        if value.is_nan() {
            out.push_str(&format!("{t},\n"));
        } else {
            out.push_str(&format!("{t},{value}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_header_and_blanks() {
        let rows = parse("time,value\n2024-01-01T00:00:00Z,1.5\n\n2024-01-01T01:00:00Z,\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, 1.5);
        assert!(rows[1].1.is_nan());
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(parse("2024-01-01T00:00:00Z 1.5").is_err());
        assert!(parse("yesterday,1.5").is_err());
        assert!(parse("2024-01-01T00:00:00Z,abc").is_err());
    }

    #[test]
    fn test_to_series_fills_missing_rows() {
        let rows = parse("2024-01-01T00:00:00Z,1\n2024-01-01T03:00:00Z,4\n").unwrap();
        let (time, values) = to_series(&rows, 3600).unwrap();
        assert_eq!(time.count, 4);
        assert_eq!(values[0], 1.0);
        assert!(values[1].is_nan() && values[2].is_nan());
        assert_eq!(values[3], 4.0);
    }

    #[test]
    fn test_to_series_rejects_off_grid_and_unordered() {
        let rows = parse("2024-01-01T00:30:00Z,1\n").unwrap();
        assert!(to_series(&rows, 3600).is_err());

        let rows = parse("2024-01-01T02:00:00Z,1\n2024-01-01T01:00:00Z,2\n").unwrap();
        assert!(to_series(&rows, 3600).is_err());
    }

    #[test]
    fn test_format() {
        let time = TimeRange::new(Timestamp::ymd(2024, 1, 1).unwrap(), 3600, 2);
        let text = format(&time, &[2.5, f32::NAN]);
        assert_eq!(
            text,
            "time,value\n2024-01-01T00:00:00Z,2.5\n2024-01-01T01:00:00Z,\n"
        );
    }
}
