//! The typed event stream produced by the simulation engine.
//!
//! Events are append-only and totally ordered by (day, minute, emission
//! order within the minute). The log file round-trips the stream: one
//! header line with the day count, then one line per event.

use crate::error::{Error, Result};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// The discriminant and payload of an [Event].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// A vehicle entered the road, carrying its speed at arrival in km/h.
    Arrival {
        /// The vehicle's speed when it entered the road, in km/h.
        speed: f64,
    },
    /// A vehicle advanced along the road for one minute.
    Move,
    /// A vehicle left the road partway along it.
    DepartSide,
    /// A vehicle reached the end of the road.
    DepartEnd,
    /// A vehicle occupied a parking space.
    ParkStart,
    /// A vehicle released its parking space.
    ParkStop,
}

/// A single record of the event stream.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Name of the vehicle's type.
    pub vehicle_type: String,
    /// The vehicle's registration plate.
    pub plate: String,
    /// Day index, starting from 1.
    pub day: u32,
    /// Minute of the day, 1 to 1440.
    pub minute: u32,
    /// The event discriminant and its payload.
    pub kind: EventKind,
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            vehicle_type: t,
            plate: p,
            day: d,
            minute: m,
            ..
        } = self;
        match self.kind {
            EventKind::Arrival { speed } => write!(f, "{t},{p},ARRIVAL,{speed},{d},{m}"),
            EventKind::Move => write!(f, "{t},{p},MOVE,{d},{m}"),
            EventKind::DepartSide => write!(f, "{t},{p},DEPART_SIDE,{d},{m}"),
            EventKind::DepartEnd => write!(f, "{t},{p},DEPART_END,{d},{m}"),
            EventKind::ParkStart => write!(f, "{t},{p},PARK,StartPark,{d},{m}"),
            EventKind::ParkStop => write!(f, "{t},{p},PARK,StopPark,{d},{m}"),
        }
    }
}

impl FromStr for Event {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let malformed = || Error::MalformedInput(format!("bad event record: {line:?}"));
        let fields: Vec<&str> = line.split(',').collect();
        let (kind, rest) = match *fields.get(2).ok_or_else(malformed)? {
            "ARRIVAL" => {
                let speed = fields
                    .get(3)
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(malformed)?;
                (EventKind::Arrival { speed }, &fields[4..])
            }
            "PARK" => match fields.get(3) {
                Some(&"StartPark") => (EventKind::ParkStart, &fields[4..]),
                Some(&"StopPark") => (EventKind::ParkStop, &fields[4..]),
                _ => return Err(malformed()),
            },
            "MOVE" => (EventKind::Move, &fields[3..]),
            "DEPART_SIDE" => (EventKind::DepartSide, &fields[3..]),
            "DEPART_END" => (EventKind::DepartEnd, &fields[3..]),
            _ => return Err(malformed()),
        };
        if rest.len() != 2 {
            return Err(malformed());
        }
        Ok(Self {
            vehicle_type: fields[0].to_string(),
            plate: fields[1].to_string(),
            day: rest[0].parse().map_err(|_| malformed())?,
            minute: rest[1].parse().map_err(|_| malformed())?,
            kind,
        })
    }
}

/// The chronological event stream of a whole run.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLog {
    /// Number of simulated days the stream covers.
    pub days: u32,
    /// Events ordered by (day, minute, emission order).
    pub events: Vec<Event>,
}

impl EventLog {
    /// Writes the log file: a day-count header, then one event per line.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(fs::File::create(path)?);
        writeln!(w, "{}", self.days)?;
        for event in &self.events {
            writeln!(w, "{event}")?;
        }
        w.flush()?;
        Ok(())
    }

    /// Reads a log file previously produced by [EventLog::write_to].
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::MalformedInput("event log is empty".to_string()))?;
        let days = header
            .trim()
            .parse()
            .map_err(|_| Error::MalformedInput(format!("bad day count: {header:?}")))?;
        let events = lines
            .filter(|l| !l.trim().is_empty())
            .map(Event::from_str)
            .collect::<Result<_>>()?;
        Ok(Self { days, events })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arrival_line_round_trips() {
        let event = Event {
            vehicle_type: "Car".to_string(),
            plate: "ABC123".to_string(),
            day: 2,
            minute: 37,
            kind: EventKind::Arrival { speed: 58.25 },
        };
        let line = event.to_string();
        assert_eq!(line, "Car,ABC123,ARRIVAL,58.25,2,37");
        assert_eq!(line.parse::<Event>().unwrap(), event);
    }

    #[test]
    fn park_lines_carry_the_direction_marker() {
        let start: Event = "Bus,123XYZ,PARK,StartPark,1,400".parse().unwrap();
        let stop: Event = "Bus,123XYZ,PARK,StopPark,1,410".parse().unwrap();
        assert_eq!(start.kind, EventKind::ParkStart);
        assert_eq!(stop.kind, EventKind::ParkStop);
        assert_eq!(start.to_string(), "Bus,123XYZ,PARK,StartPark,1,400");
    }

    #[test]
    fn payloadless_lines_have_five_fields() {
        let depart: Event = "Car,ABC123,DEPART_END,1,70".parse().unwrap();
        assert_eq!(depart.kind, EventKind::DepartEnd);
        assert_eq!(depart.day, 1);
        assert_eq!(depart.minute, 70);
        assert!("Car,ABC123,DEPART_END,oops,1,70".parse::<Event>().is_err());
        assert!("Car,ABC123,VANISH,1,70".parse::<Event>().is_err());
    }
}
