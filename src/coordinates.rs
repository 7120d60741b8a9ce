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

//! Splitting of the raw KML coordinate text into points.

use std::fmt;
use std::slice;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Lexical form of `xsd:decimal`, the type of GPX `lat`, `lon` and `ele`.
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").unwrap());

/// Names of the comma-separated fields of a KML coordinate, in source order.
const FIELDS: [&str; 3] = ["longitude", "latitude", "elevation"];

/// One `lon,lat,ele` position as written in the source document.
///
/// The fields are checked to be plain decimal numbers (no exponent, no
/// `NaN` or `inf`) but are kept as text, so the GPX output reproduces them
/// digit for digit. A leading sign or a missing integer part, as in `+5` or
/// `.5`, is valid decimal notation and passes unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate {
    pub longitude: String,
    pub latitude: String,
    pub elevation: String,
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.longitude, self.latitude, self.elevation)
    }
}

/// The ordered points of a single path.
///
/// A track returned by [`parse_coordinates`] always holds at least one point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track(Vec<Coordinate>);

impl Track {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.0
    }

    pub fn iter(&self) -> slice::Iter<'_, Coordinate> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a Coordinate;
    type IntoIter = slice::Iter<'a, Coordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Writes the track back as a KML coordinate list, one space between points.
impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, point) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{point}")?;
        }
        Ok(())
    }
}

/// Error returned from [`parse_coordinates`].
///
/// `index` is the 1-based position of the offending point in the list.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("coordinate list is empty")]
    Empty,
    #[error("point {index} ({token:?}) has {found} fields, expected longitude,latitude,elevation")]
    FieldCount {
        index: usize,
        token: String,
        found: usize,
    },
    #[error("point {index} ({token:?}) has a non-numeric {field}")]
    NotANumber {
        index: usize,
        token: String,
        field: &'static str,
    },
}

/// Parse the content of a KML `<coordinates>` element.
///
/// Points are separated by any run of whitespace. This covers the tab
/// indentation and the trailing separator Google Earth leaves behind, so
/// empty tokens never become points. Each point needs exactly three numeric
/// decimal fields.
pub fn parse_coordinates(text: &str) -> Result<Track, ParseError> {
    let points = text
        .split_whitespace()
        .enumerate()
        .map(|(i, token)| parse_point(i + 1, token))
        .collect::<Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Err(ParseError::Empty);
    }

    debug!(points = points.len(), "parsed coordinate list");
    Ok(Track(points))
}

/// Parse a single `lon,lat,ele` token.
fn parse_point(index: usize, token: &str) -> Result<Coordinate, ParseError> {
    let fields: Vec<&str> = token.split(',').collect();
    let (longitude, latitude, elevation) = match fields.as_slice() {
        &[lon, lat, ele] => (lon, lat, ele),
        _ => {
            return Err(ParseError::FieldCount {
                index,
                token: token.to_string(),
                found: fields.len(),
            })
        }
    };

    for (value, field) in [longitude, latitude, elevation].into_iter().zip(FIELDS) {
        if !DECIMAL.is_match(value) {
            return Err(ParseError::NotANumber {
                index,
                token: token.to_string(),
                field,
            });
        }
    }

    Ok(Coordinate {
        longitude: longitude.to_string(),
        latitude: latitude.to_string(),
        elevation: elevation.to_string(),
    })
}
