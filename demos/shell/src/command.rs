//! Line parsing for the shell.

use std::time::Duration;

use facility_booking_client::{Day, HourMinutes};
use thiserror::Error;

/// Usage text printed by `help`.
pub const HELP: &str = "\
Commands:
  query <facility> [day...]          free slots; days are 0-6 (0=Monday), all if omitted
  book <facility> <day> <start> <end>
                                     book a slot; times are HHMM (0900 = 9:00 AM)
  modify <booking_id> <offset>       shift a booking by offset minutes (may be negative)
  extend <booking_id> <minutes>      extend a booking
  watch <facility> [minutes]         receive updates for a while (default from config)
  capacity <facility>                facility capacity
  list                               all facilities
  help                               this text
  quit                               exit";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Query { facility: String, days: Vec<Day> },
    Book {
        facility: String,
        day: Day,
        start: HourMinutes,
        end: HourMinutes,
    },
    Modify { booking_id: u32, offset: i32 },
    Extend { booking_id: u32, minutes: i32 },
    Watch {
        facility: String,
        duration: Option<Duration>,
    },
    Capacity { facility: String },
    List,
}

/// Input the shell could not turn into a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid day {0:?}, must be between 0 and 6")]
    InvalidDay(String),

    #[error("invalid time {0:?}, expected HHMM")]
    InvalidTime(String),

    #[error("invalid {what} {value:?}")]
    InvalidNumber { what: &'static str, value: String },

    #[error("unknown command {0:?}, type 'help' for available commands")]
    Unknown(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, UsageError> {
    let args = split_args(line);
    let Some((name, rest)) = args.split_first() else {
        return Ok(None);
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "query" => {
            let [facility, days @ ..] = rest else {
                return Err(UsageError::Usage("query <facility> [day...]"));
            };
            Command::Query {
                facility: facility.clone(),
                days: days.iter().map(|d| parse_day(d)).collect::<Result<_, _>>()?,
            }
        }
        "book" => {
            let [facility, day, start, end, ..] = rest else {
                return Err(UsageError::Usage("book <facility> <day> <start> <end>"));
            };
            Command::Book {
                facility: facility.clone(),
                day: parse_day(day)?,
                start: parse_time(start)?,
                end: parse_time(end)?,
            }
        }
        "modify" => {
            let [id, offset, ..] = rest else {
                return Err(UsageError::Usage("modify <booking_id> <offset>"));
            };
            Command::Modify {
                booking_id: parse_number("booking id", id)?,
                offset: parse_number("offset", offset)?,
            }
        }
        "extend" => {
            let [id, minutes, ..] = rest else {
                return Err(UsageError::Usage("extend <booking_id> <minutes>"));
            };
            let minutes: i32 = parse_number("duration", minutes)?;
            if minutes <= 0 {
                return Err(UsageError::InvalidNumber {
                    what: "duration",
                    value: minutes.to_string(),
                });
            }
            Command::Extend {
                booking_id: parse_number("booking id", id)?,
                minutes,
            }
        }
        "watch" => {
            let [facility, more @ ..] = rest else {
                return Err(UsageError::Usage("watch <facility> [minutes]"));
            };
            let duration = match more.first() {
                Some(raw) => Some(parse_watch_minutes(raw)?),
                None => None,
            };
            Command::Watch {
                facility: facility.clone(),
                duration,
            }
        }
        "capacity" => {
            let [facility, ..] = rest else {
                return Err(UsageError::Usage("capacity <facility>"));
            };
            Command::Capacity {
                facility: facility.clone(),
            }
        }
        "list" | "facilities" => Command::List,
        other => return Err(UsageError::Unknown(other.to_owned())),
    };

    Ok(Some(command))
}

/// Split on blanks; double quotes group words (`"Fitness Center"`).
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            ' ' | '\t' if !quoted => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn parse_day(raw: &str) -> Result<Day, UsageError> {
    raw.parse::<u8>()
        .ok()
        .and_then(Day::from_index)
        .ok_or_else(|| UsageError::InvalidDay(raw.to_owned()))
}

fn parse_time(raw: &str) -> Result<HourMinutes, UsageError> {
    raw.parse()
        .map_err(|_| UsageError::InvalidTime(raw.to_owned()))
}

/// Positive whole minutes that fit a `Duration` in seconds.
fn parse_watch_minutes(raw: &str) -> Result<Duration, UsageError> {
    parse_number::<u64>("watch duration", raw)?
        .checked_mul(60)
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| UsageError::InvalidNumber {
            what: "watch duration",
            value: raw.to_owned(),
        })
}

fn parse_number<T: std::str::FromStr>(what: &'static str, raw: &str) -> Result<T, UsageError> {
    raw.parse().map_err(|_| UsageError::InvalidNumber {
        what,
        value: raw.to_owned(),
    })
}
