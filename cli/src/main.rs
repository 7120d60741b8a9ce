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

//! This is a very simple command-line interface for the KML-to-GPX converter.

use std::{env, path::PathBuf, process::ExitCode};

use kml_gpx_convert::{convert_file, output_path_for, MultiplePaths, Options};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "\
Usage: kml2gpx [--first-path] [-o OUTPUT] INPUT [START_DATE]

Converts the path of a Google Earth KML file into a GPX track.

Arguments:
  INPUT          KML file containing one path
  START_DATE     day of the first point as YYYY-MM-DD, defaults to now

Options:
  -o, --output   GPX file to write, defaults to INPUT with a .gpx extension
  --first-path   convert the first path if INPUT contains several
  -h, --help     print this help

Track times are invented: the first point gets START_DATE at midnight (or the
current local time) and every further point one second more.";

/// Error in the command-line arguments.
#[derive(Error, Debug)]
enum ArgsError {
    #[error("missing input file")]
    MissingInput,
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("unexpected argument {0}")]
    Unexpected(String),
    #[error(transparent)]
    StartDate(kml_gpx_convert::Error),
}

/// What the user asked for.
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Convert {
        input: PathBuf,
        output: Option<PathBuf>,
        options: Options,
    },
}

/// Parse the arguments following the program name.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, ArgsError> {
    let mut args = args.into_iter();
    let mut positionals = vec![];
    let mut output = None;
    let mut options = Options::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--first-path" => options.multiple_paths = MultiplePaths::First,
            "-o" | "--output" => {
                let value = args.next().ok_or(ArgsError::MissingValue(arg))?;
                output = Some(PathBuf::from(value));
            }
            opt if opt.len() > 1 && opt.starts_with('-') => {
                return Err(ArgsError::UnknownOption(opt.to_string()));
            }
            _ => positionals.push(arg),
        }
    }

    let mut positionals = positionals.into_iter();
    let input = positionals.next().ok_or(ArgsError::MissingInput)?;
    if let Some(date) = positionals.next() {
        options.start = date.parse().map_err(ArgsError::StartDate)?;
    }
    if let Some(extra) = positionals.next() {
        return Err(ArgsError::Unexpected(extra));
    }

    Ok(Command::Convert {
        input: PathBuf::from(input),
        output,
        options,
    })
}

/// Log to STDERR, filtered by `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Converts the KML file named on the command line and reports the result.
fn main() -> ExitCode {
    init_logging();

    let (input, output, options) = match parse_args(env::args().skip(1)) {
        Ok(Command::Help) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Ok(Command::Convert {
            input,
            output,
            options,
        }) => (input, output, options),
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let output = output.unwrap_or_else(|| output_path_for(&input));
    match convert_file(&input, &output, &options) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Conversion failed: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kml_gpx_convert::StartTime;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Result<Command, ArgsError> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn input_only() {
        assert_eq!(
            parse(&["walk.kml"]).unwrap(),
            Command::Convert {
                input: PathBuf::from("walk.kml"),
                output: None,
                options: Options::default(),
            }
        );
    }

    #[test]
    fn all_arguments() {
        let command = parse(&["--first-path", "walk.kml", "-o", "out.gpx", "2024-01-01"]).unwrap();
        assert_eq!(
            command,
            Command::Convert {
                input: PathBuf::from("walk.kml"),
                output: Some(PathBuf::from("out.gpx")),
                options: Options {
                    start: "2024-01-01".parse::<StartTime>().unwrap(),
                    multiple_paths: MultiplePaths::First,
                },
            }
        );
    }

    #[rstest]
    #[case::short(&["-h"])]
    #[case::long(&["walk.kml", "--help"])]
    fn help(#[case] args: &[&str]) {
        assert_eq!(parse(args).unwrap(), Command::Help);
    }

    #[test]
    fn no_arguments_is_an_error() {
        assert!(matches!(parse(&[]), Err(ArgsError::MissingInput)));
    }

    #[rstest]
    #[case::missing_output(&["walk.kml", "-o"])]
    #[case::unknown_option(&["--verbose", "walk.kml"])]
    #[case::bad_date(&["walk.kml", "01/01/2024"])]
    #[case::too_many(&["walk.kml", "2024-01-01", "extra"])]
    fn rejects_malformed_arguments(#[case] args: &[&str]) {
        assert!(parse(args).is_err());
    }

    #[test]
    fn bad_date_mentions_the_value() {
        let err = parse(&["walk.kml", "01/01/2024"]).unwrap_err();
        assert!(err.to_string().contains("01/01/2024"));
    }
}
