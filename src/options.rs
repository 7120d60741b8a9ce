// Copyright 2024 Viktor Reusch
//
// This file is part of kml_gpx_convert.
//
// kml_gpx_convert is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_gpx_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_gpx_convert. If not, see <https://www.gnu.org/licenses/>.

//! Settings of a single conversion run.

use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound};

use crate::Error;

/// Format of a user supplied start date.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Settings for [`convert`](crate::convert) and
/// [`convert_file`](crate::convert_file).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Time assigned to the first track point.
    pub start: StartTime,
    /// What to do with a document containing more than one path.
    pub multiple_paths: MultiplePaths,
}

/// Start of the synthesized track times.
///
/// KML paths carry no times, but many GPX consumers refuse tracks without
/// them. The converter therefore invents one timestamp per point, one second
/// apart. These times are fabricated and say nothing about when a position
/// was recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartTime {
    /// The local wall-clock time when the run starts, in whole seconds.
    #[default]
    Now,
    /// Midnight at the beginning of the given day.
    Date(NaiveDate),
}

impl StartTime {
    /// Determine the instant of the first point.
    pub fn resolve(self) -> NaiveDateTime {
        match self {
            StartTime::Now => Local::now().naive_local().trunc_subsecs(0),
            StartTime::Date(date) => date.and_time(NaiveTime::MIN),
        }
    }
}

/// Parses a `YYYY-MM-DD` date.
impl FromStr for StartTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(StartTime::Date)
            .map_err(|source| Error::InvalidStartDate {
                value: s.to_string(),
                source,
            })
    }
}

/// Policy for documents with several `<LineString>` elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MultiplePaths {
    /// Fail with [`Error::MultiplePaths`].
    #[default]
    Reject,
    /// Convert the first path and ignore the others.
    First,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rstest::rstest;

    #[test]
    fn parses_start_date() {
        let start: StartTime = "2024-01-01".parse().unwrap();
        assert_eq!(start, StartTime::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }

    #[test]
    fn date_starts_at_midnight() {
        let start = StartTime::Date(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap());
        assert_eq!(start.resolve().to_string(), "2023-06-30 00:00:00");
    }

    #[test]
    fn now_has_no_sub_second_part() {
        assert_eq!(StartTime::Now.resolve().nanosecond(), 0);
    }

    #[rstest]
    #[case::empty("")]
    #[case::day_first("01-01-2024")]
    #[case::no_such_day("2024-02-30")]
    #[case::with_time("2024-01-01T10:00:00")]
    #[case::words("tomorrow")]
    fn rejects_malformed_date(#[case] value: &str) {
        match value.parse::<StartTime>() {
            Err(Error::InvalidStartDate { value: v, .. }) => assert_eq!(v, value),
            other => panic!("expected an invalid start date, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_the_command_line_tool() {
        let options = Options::default();
        assert_eq!(options.start, StartTime::Now);
        assert_eq!(options.multiple_paths, MultiplePaths::Reject);
    }
}
