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

//! Locating the path coordinates inside a KML document.
//!
//! Only the text of a `<coordinates>` element within a `<LineString>` is
//! needed, so the document is searched by pattern instead of being parsed
//! into a full KML tree. The search spans line breaks.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::options::MultiplePaths;
use crate::Error;

/// A `<LineString>` element, optionally namespace-prefixed. Group 1 is its
/// content.
static LINE_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?LineString(?:\s[^>]*)?>(.*?)</(?:[\w.-]+:)?LineString\s*>")
        .unwrap()
});

/// A `<coordinates>` element. Group 1 is its content.
static COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(?:[\w.-]+:)?coordinates(?:\s[^>]*)?>(.*?)</(?:[\w.-]+:)?coordinates\s*>")
        .unwrap()
});

/// Return the raw coordinate text of the first path in `document`.
///
/// The text is returned untrimmed. With [`MultiplePaths::Reject`], a document
/// containing several paths fails with [`Error::MultiplePaths`]; with
/// [`MultiplePaths::First`] the remaining paths are skipped unchecked.
pub fn extract_coordinates(document: &str, policy: MultiplePaths) -> Result<&str, Error> {
    let mut paths = LINE_STRING
        .captures_iter(document)
        .filter_map(|caps| caps.get(1));
    let first = paths.next().ok_or(Error::NoCoordinates)?;

    let count = 1 + paths.count();
    if count > 1 {
        match policy {
            MultiplePaths::Reject => return Err(Error::MultiplePaths { count }),
            MultiplePaths::First => {
                warn!(count, "document contains several paths, converting only the first")
            }
        }
    }

    let coordinates = COORDINATES
        .captures(first.as_str())
        .and_then(|caps| caps.get(1))
        .ok_or(Error::NoCoordinates)?;
    debug!(
        offset = first.start() + coordinates.start(),
        length = coordinates.len(),
        "found path coordinates"
    );
    Ok(coordinates.as_str())
}

/// Read the KML file at `path` and extract its coordinate text.
///
/// See [`extract_coordinates`].
pub fn read_coordinates(path: &Path, policy: MultiplePaths) -> Result<String, Error> {
    let document = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })?;
    extract_coordinates(&document, policy).map(str::to_string)
}
