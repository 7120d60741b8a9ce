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

//! Writing a track as a GPX 1.1 document.
//!
//! The layout, including CRLF line endings and the time comment, is fixed so
//! that output stays byte-compatible with earlier exports.

use std::io::Write;

use chrono::{NaiveDateTime, SubsecRound, TimeDelta};
use tracing::debug;
use xml::escape::escape_str_pcdata;

use crate::coordinates::Track;
use crate::Error;

/// Line terminator of every emitted line.
const LINE_END: &str = "\r\n";
/// First line of the document.
const XML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
/// Tells readers of the file that the point times are invented.
const TIME_NOTE: &str = "<!-- Time data is conversion date iterated by 1s per point since \
                         no time data is contained in kml and many apps require it -->";
/// Opening `<gpx>` tag with namespace and schema attributes.
const GPX_START: &str = concat!(
    r#"<gpx version="1.1" creator="Google Earth" "#,
    r#"xmlns="http://www.topografix.com/GPX/1/1" "#,
    r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
    r#"xsi:schemaLocation="http://www.topografix.com/GPX/1/1 "#,
    r#"http://www.topografix.com/GPX/1/1/gpx.xsd">"#,
);
/// Format of `<time>` values. A literal `Z` is appended.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Sequence of synthesized point times.
///
/// Yields the start instant truncated to whole seconds, then advances by one
/// second per item. Ends only if the calendar range of `chrono` is exhausted.
#[derive(Debug, Clone)]
pub struct TimestampCursor {
    next: Option<NaiveDateTime>,
}

impl TimestampCursor {
    pub fn new(start: NaiveDateTime) -> Self {
        TimestampCursor {
            next: Some(start.trunc_subsecs(0)),
        }
    }
}

impl Iterator for TimestampCursor {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.checked_add_signed(TimeDelta::seconds(1));
        Some(current)
    }
}

/// Write `track` as a complete GPX document to `sink`.
///
/// The track is labeled with `name`. Each point gets a `<time>` from a
/// [`TimestampCursor`] starting at `start`. GPX `lat` receives the KML
/// longitude field and GPX `lon` the latitude field; existing consumers of
/// this tool rely on that order.
///
/// Returns the number of written points.
pub fn write_gpx(
    mut sink: impl Write,
    name: &str,
    track: &Track,
    start: NaiveDateTime,
) -> Result<usize, Error> {
    write!(sink, "{XML_HEAD}{LINE_END}")?;
    write!(sink, "{TIME_NOTE}{LINE_END}")?;
    write!(sink, "{GPX_START}{LINE_END}")?;
    write!(
        sink,
        "{LINE_END}<trk>{LINE_END} <name>{}</name>{LINE_END} <trkseg>{LINE_END}",
        escape_str_pcdata(name)
    )?;

    let mut times = TimestampCursor::new(start);
    for point in track {
        let time = times.next().ok_or(Error::TimeOutOfRange)?;
        write!(
            sink,
            r#"  <trkpt lat="{}" lon="{}"><ele>{}</ele>"#,
            point.longitude, point.latitude, point.elevation
        )?;
        write!(
            sink,
            "<time>{}Z</time></trkpt>{LINE_END}",
            time.format(TIME_FORMAT)
        )?;
    }

    write!(
        sink,
        " </trkseg>{LINE_END}</trk>{LINE_END}{LINE_END}</gpx>{LINE_END}"
    )?;

    debug!(points = track.len(), "wrote GPX document");
    Ok(track.len())
}
