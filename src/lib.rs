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

//! Library for converting a path from [KML](https://developers.google.com/kml)
//! to a [GPX](https://www.topografix.com/gpx.asp) track.
//!
//! The coordinates of the first `<LineString>` of a KML document, as exported
//! by Google Earth, become the points of a single GPX 1.1 `<trk>`. KML paths
//! carry no times, so every point receives a synthesized timestamp, one second
//! after the previous one (see [`StartTime`]). These times are fabricated.
//!
//! See [`convert`] and [`convert_file`] for information on how to use this
//! library.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub mod coordinates;
pub mod extract;
mod options;
pub mod writer;

pub use coordinates::{parse_coordinates, Coordinate, ParseError, Track};
pub use extract::{extract_coordinates, read_coordinates};
pub use options::{MultiplePaths, Options, StartTime};
pub use writer::write_gpx;

/// Extension of input files.
const KML_EXTENSION: &str = "kml";
/// Extension of output files.
const GPX_EXTENSION: &str = "gpx";

/// Error returned from the conversion functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading from or writing to a stream failed.
    #[error("I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The input file could not be read.
    #[error("could not read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    /// The output file could not be written.
    #[error("could not write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    /// The document contains no `<LineString>` with `<coordinates>`.
    #[error("no coordinates found, the KML contains no path")]
    NoCoordinates,
    /// The document contains several paths and [`MultiplePaths::Reject`] is
    /// in effect.
    #[error("the KML contains {count} paths, export one path at a time")]
    MultiplePaths { count: usize },
    /// The coordinate list is malformed.
    #[error("malformed coordinates: {0}")]
    Parse(#[from] ParseError),
    /// A start date is not in `YYYY-MM-DD` form.
    #[error("invalid start date {value:?}, expected YYYY-MM-DD: {source}")]
    InvalidStartDate {
        value: String,
        source: chrono::ParseError,
    },
    /// The synthesized times left the supported calendar range.
    #[error("track times exceed the supported date range")]
    TimeOutOfRange,
}

/// Outcome of a successful [`convert_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Number of written track points.
    pub points: usize,
    /// Location of the GPX file.
    pub output: PathBuf,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPX track with {} points exported to {}",
            self.points,
            self.output.display()
        )
    }
}

/// Read a KML document and write a GPX document.
///
/// A complete KML document is read from `source`. The first path is written
/// as a GPX track labeled `name` to `sink`.
///
/// The whole document is validated before anything is written, so on error
/// `sink` is left untouched unless writing itself fails.
///
/// Returns the number of written track points.
///
/// # Example
/// ```
/// # use kml_gpx_convert::{convert, Options};
/// #
/// let source = r#"
/// <?xml version="1.0" encoding="UTF-8"?>
/// <kml xmlns="http://www.opengis.net/kml/2.2">
///     <Placemark>
///         <LineString>
///             <coordinates>2.2945,48.858222,35 2.2950,48.8585,36 </coordinates>
///         </LineString>
///     </Placemark>
/// </kml>
/// "#;
/// let options = Options {
///     start: "2024-01-01".parse().expect("invalid date"),
///     ..Default::default()
/// };
/// let mut sink = vec![];
///
/// let points = convert(source.as_bytes(), &mut sink, "eiffel.gpx", &options)
///     .expect("conversion failed");
///
/// let gpx = String::from_utf8(sink).expect("GPX data is not valid UTF-8");
/// assert_eq!(points, 2);
/// assert!(gpx.contains(r#"<trkpt lat="2.2945" lon="48.858222"><ele>35</ele>"#));
/// assert!(gpx.contains("<time>2024-01-01T00:00:01Z</time>"));
/// ```
pub fn convert(
    mut source: impl Read,
    mut sink: impl Write,
    name: &str,
    options: &Options,
) -> Result<usize, Error> {
    let mut kml = String::new();
    source.read_to_string(&mut kml)?;

    let text = extract_coordinates(&kml, options.multiple_paths)?;
    let (gpx, points) = render(text, name, options)?;
    sink.write_all(&gpx)?;
    Ok(points)
}

/// Convert the KML file at `input` into the GPX file at `output`.
///
/// The track is labeled with the `output` path as given. The output file is
/// only created once the complete document has been generated. If writing
/// it fails, the partial file is removed again.
pub fn convert_file(input: &Path, output: &Path, options: &Options) -> Result<Report, Error> {
    let text = read_coordinates(input, options.multiple_paths)?;
    let name = track_name(output);
    let (gpx, points) = render(&text, &name, options)?;

    write_file(output, &gpx)?;

    let report = Report {
        points,
        output: output.to_owned(),
    };
    info!(points = report.points, output = %output.display(), "exported GPX track");
    Ok(report)
}

/// Derive the output path from the `input` path.
///
/// A `.kml` extension (in any letter case) is replaced with `.gpx`. Any other
/// file name gets `.gpx` appended, so `track.txt` becomes `track.txt.gpx`.
pub fn output_path_for(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext.eq_ignore_ascii_case(KML_EXTENSION) => input.with_extension(GPX_EXTENSION),
        _ => {
            let mut path = input.as_os_str().to_owned();
            path.push(".");
            path.push(GPX_EXTENSION);
            PathBuf::from(path)
        }
    }
}

/// Parse the coordinate `text` and generate the complete GPX document.
///
/// Returns the document and its number of track points.
fn render(text: &str, name: &str, options: &Options) -> Result<(Vec<u8>, usize), Error> {
    let track = parse_coordinates(text)?;
    let mut document = vec![];
    let points = write_gpx(&mut document, name, &track, options.start.resolve())?;
    Ok((document, points))
}

/// Label of the track written to `output`, the path as the user sees it.
fn track_name(output: &Path) -> String {
    output.display().to_string()
}

/// Write `document` to the file at `path`, removing the file on failure.
fn write_file(path: &Path, document: &[u8]) -> Result<(), Error> {
    let write_error = |source| Error::Write {
        path: path.to_owned(),
        source,
    };

    let mut file = File::create(path).map_err(write_error)?;
    if let Err(source) = file.write_all(document).and_then(|()| file.flush()) {
        drop(file);
        if let Err(err) = fs::remove_file(path) {
            warn!(path = %path.display(), "could not remove partial output: {err}");
        }
        return Err(write_error(source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const KML: &str = "<kml><Placemark><LineString>\n<coordinates>\n\t8.54,47.37,408 8.55,47.38,410 \n</coordinates>\n</LineString></Placemark></kml>";

    fn dated() -> Options {
        Options {
            start: "2024-01-01".parse().unwrap(),
            ..Default::default()
        }
    }

    #[rstest]
    #[case("walk.kml", "walk.gpx")]
    #[case("dir/walk.KML", "dir/walk.gpx")]
    #[case("walk.tour.kml", "walk.tour.gpx")]
    #[case("walk", "walk.gpx")]
    #[case("walk.txt", "walk.txt.gpx")]
    #[case("walk.kmz", "walk.kmz.gpx")]
    fn derives_output_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(output_path_for(Path::new(input)), PathBuf::from(expected));
    }

    #[test]
    fn converts_stream() {
        let mut sink = vec![];
        let points = convert(KML.as_bytes(), &mut sink, "walk.gpx", &dated()).unwrap();

        let gpx = String::from_utf8(sink).unwrap();
        assert_eq!(points, 2);
        assert_eq!(gpx.matches("<trkpt ").count(), 2);
        assert!(gpx.contains(
            "<trkpt lat=\"8.54\" lon=\"47.37\"><ele>408</ele><time>2024-01-01T00:00:00Z</time></trkpt>"
        ));
        assert!(gpx.contains(
            "<trkpt lat=\"8.55\" lon=\"47.38\"><ele>410</ele><time>2024-01-01T00:00:01Z</time></trkpt>"
        ));
    }

    #[test]
    fn leaves_sink_untouched_on_malformed_point() {
        let kml = KML.replace("8.55,47.38,410", "8.55,47.38");
        let mut sink = vec![];
        let result = convert(kml.as_bytes(), &mut sink, "walk.gpx", &dated());

        assert!(matches!(
            result,
            Err(Error::Parse(ParseError::FieldCount { index: 2, .. }))
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn report_names_points_and_file() {
        let report = Report {
            points: 12,
            output: PathBuf::from("walk.gpx"),
        };
        assert_eq!(report.to_string(), "GPX track with 12 points exported to walk.gpx");
    }

    #[rstest]
    #[case("walk.gpx")]
    #[case("some/dir/walk.gpx")]
    #[case("../walk.gpx")]
    fn track_is_labeled_with_the_output_path(#[case] output: &str) {
        assert_eq!(track_name(Path::new(output)), output);
    }
}
